//! Records for the five static GTFS tables this crate joins.
//!
//! Field names follow the GTFS Schedule column names, so the same types
//! deserialize straight from `*.txt` files and from a reduced snapshot.

pub mod load;

use serde::{Deserialize, Serialize};

use crate::normalize::{normalized, normalized_opt};

pub use load::load_tables;

/// A row of `routes.txt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(deserialize_with = "normalized")]
    pub route_id: String,
    /// Public lookup key ("99", "R4"), unique within the active route set.
    #[serde(default, deserialize_with = "normalized")]
    pub route_short_name: String,
    #[serde(default, deserialize_with = "normalized")]
    pub route_long_name: String,
    /// Raw publisher color; may be empty or malformed.
    #[serde(default, deserialize_with = "normalized")]
    pub route_color: String,
    #[serde(default)]
    pub route_type: Option<u16>,
}

/// A row of `trips.txt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(deserialize_with = "normalized")]
    pub route_id: String,
    #[serde(deserialize_with = "normalized")]
    pub trip_id: String,
    #[serde(default, deserialize_with = "normalized_opt")]
    pub trip_headsign: Option<String>,
    #[serde(default)]
    pub direction_id: Option<u32>,
    /// Empty when the publisher gives the trip no geometry.
    #[serde(default, deserialize_with = "normalized")]
    pub shape_id: String,
}

/// A row of `shapes.txt`: one point of a shape's polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePoint {
    #[serde(deserialize_with = "normalized")]
    pub shape_id: String,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
}

/// A row of `stops.txt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(deserialize_with = "normalized")]
    pub stop_id: String,
    #[serde(default, deserialize_with = "normalized_opt")]
    pub stop_code: Option<String>,
    #[serde(default, deserialize_with = "normalized")]
    pub stop_name: String,
    /// Absent for generic nodes and boarding areas.
    #[serde(default)]
    pub stop_lat: Option<f64>,
    #[serde(default)]
    pub stop_lon: Option<f64>,
}

impl Stop {
    /// `(latitude, longitude)`, when both are present.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.stop_lat.zip(self.stop_lon)
    }
}

/// A row of `stop_times.txt`, the edge between a trip and a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTime {
    #[serde(deserialize_with = "normalized")]
    pub trip_id: String,
    #[serde(deserialize_with = "normalized")]
    pub stop_id: String,
    pub stop_sequence: u32,
}

/// The five tables in input order. This is both the loader's output and the
/// reduced snapshot artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTables {
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub shapes: Vec<ShapePoint>,
    pub stops: Vec<Stop>,
    #[serde(rename = "stopTimes")]
    pub stop_times: Vec<StopTime>,
}

impl ScheduleTables {
    /// Row counts per table, for logging.
    pub fn counts(&self) -> [(&'static str, usize); 5] {
        [
            ("routes", self.routes.len()),
            ("trips", self.trips.len()),
            ("shapes", self.shapes.len()),
            ("stops", self.stops.len()),
            ("stop_times", self.stop_times.len()),
        ]
    }
}
