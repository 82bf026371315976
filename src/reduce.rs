//! Offline reduction of a full schedule to the records reachable from a set of
//! routes, and the snapshot file that carries the result.
//!
//! The reduction is a chain of semi-joins:
//! routes → trips → shapes, and trips → stop times → stops.
//! Every table keeps its input order, so reducing the same input twice (or
//! reducing an already reduced snapshot) gives an identical result.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::{info, warn};

use crate::gtfs::ScheduleTables;
use crate::schedule::Schedule;

/// Projects `schedule` down to the routes named in `short_names` and
/// everything they transitively reference.
///
/// A shape or stop kept for a selected route may also be used by routes that
/// were left out; only orphans are guaranteed absent.
#[tracing::instrument(skip(schedule))]
pub fn reduce<S: AsRef<str> + std::fmt::Debug>(
    schedule: &Schedule,
    short_names: &[S],
) -> ScheduleTables {
    let tables = schedule.tables();

    let route_ids: HashSet<String> = schedule.route_ids(short_names).into_iter().collect();
    if route_ids.len() < short_names.len() {
        warn!(
            requested = short_names.len(),
            found = route_ids.len(),
            "Some selected routes are not in the schedule"
        );
    }

    let trips: Vec<_> = tables
        .trips
        .iter()
        .filter(|t| route_ids.contains(&t.route_id))
        .cloned()
        .collect();
    let trip_ids: HashSet<&str> = trips.iter().map(|t| t.trip_id.as_str()).collect();
    let shape_ids: HashSet<&str> = trips.iter().map(|t| t.shape_id.as_str()).collect();

    let shapes = tables
        .shapes
        .iter()
        .filter(|p| shape_ids.contains(p.shape_id.as_str()))
        .cloned()
        .collect();

    let stop_times: Vec<_> = tables
        .stop_times
        .iter()
        .filter(|st| trip_ids.contains(st.trip_id.as_str()))
        .cloned()
        .collect();
    let stop_ids: HashSet<&str> = stop_times.iter().map(|st| st.stop_id.as_str()).collect();

    let stops = tables
        .stops
        .iter()
        .filter(|s| stop_ids.contains(s.stop_id.as_str()))
        .cloned()
        .collect();

    let routes = tables
        .routes
        .iter()
        .filter(|r| route_ids.contains(&r.route_id))
        .cloned()
        .collect();

    let reduced = ScheduleTables {
        routes,
        trips,
        shapes,
        stops,
        stop_times,
    };

    let [routes, trips, shapes, stops, stop_times] = reduced.counts().map(|(_, n)| n);
    info!(routes, trips, shapes, stops, stop_times, "Schedule reduced");

    reduced
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

/// Writes a snapshot as JSON, gzip-compressed when `path` ends in `.gz`.
pub fn write_snapshot(path: &Path, tables: &ScheduleTables) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("{}: cannot create", path.display()))?;
    let writer = BufWriter::new(file);

    if is_gzip(path) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer(&mut encoder, tables)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = writer;
        serde_json::to_writer(&mut writer, tables)?;
        writer.flush()?;
    }

    info!(path = %path.display(), "Snapshot written");
    Ok(())
}

/// Reads a snapshot written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> Result<ScheduleTables> {
    let file = File::open(path).with_context(|| format!("{}: cannot open", path.display()))?;
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    serde_json::from_reader(reader)
        .with_context(|| format!("{}: not a schedule snapshot", path.display()))
}
