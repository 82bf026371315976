//! Output of route views and vehicle snapshots.
//!
//! Supports pretty JSON logging and CSV append of vehicle positions.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::live::VehiclePosition;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends one row per vehicle to a CSV file.
///
/// Writes the header row only when the file is new or empty.
pub fn append_vehicles(path: &Path, vehicles: &[VehiclePosition]) -> Result<()> {
    let has_header = path.metadata().is_ok_and(|m| m.len() > 0);
    debug!(path = %path.display(), has_header, rows = vehicles.len(), "Appending vehicle rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!has_header) // IMPORTANT when appending
        .from_writer(file);

    for vehicle in vehicles {
        writer.serialize(vehicle)?;
    }
    writer.flush()?;

    Ok(())
}
