//! Reads the static tables from an unpacked GTFS directory.

use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::ScheduleTables;

/// Loads `routes.txt`, `trips.txt`, `shapes.txt`, `stops.txt` and
/// `stop_times.txt` from `dir`. Only `shapes.txt` may be absent.
#[tracing::instrument(skip(dir), fields(dir = %dir.display()))]
pub fn load_tables(dir: &Path) -> Result<ScheduleTables> {
    let shapes_path = dir.join("shapes.txt");
    let shapes = if shapes_path.exists() {
        read_table(&shapes_path)?
    } else {
        warn!("No shapes.txt, routes will have no geometry");
        Vec::new()
    };

    let tables = ScheduleTables {
        routes: read_table(&dir.join("routes.txt"))?,
        trips: read_table(&dir.join("trips.txt"))?,
        shapes,
        stops: read_table(&dir.join("stops.txt"))?,
        stop_times: read_table(&dir.join("stop_times.txt"))?,
    };

    let [routes, trips, shapes, stops, stop_times] = tables.counts().map(|(_, n)| n);
    info!(routes, trips, shapes, stops, stop_times, "GTFS tables loaded");

    Ok(tables)
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("{}: cannot open", path.display()))?;

    let mut rows = Vec::new();
    for (idx, result) in rdr.deserialize().enumerate() {
        // +2: header line, 1-based numbering
        let row: T = result.with_context(|| format!("{}: bad row {}", path.display(), idx + 2))?;
        rows.push(row);
    }
    Ok(rows)
}
