//! Correlates a decoded GTFS Realtime vehicle-position feed with the static
//! schedule.
//!
//! Each poll is handled independently: [`correlate`] turns one
//! [`FeedMessage`] into a fresh list of [`VehiclePosition`]s and nothing is
//! carried over from earlier polls.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::gtfs_rt::{self, FeedEntity, FeedMessage};
use crate::normalize::coerce_id;
use crate::schedule::Schedule;

/// Where a vehicle is relative to its current stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleStatus {
    IncomingAt,
    StoppedAt,
    InTransitTo,
    /// A code this schema does not define, kept as reported.
    Unknown(i32),
}

impl VehicleStatus {
    /// Maps the feed's `current_status` code.
    pub fn from_code(code: i32) -> Self {
        use gtfs_rt::vehicle_position::VehicleStopStatus;

        match VehicleStopStatus::try_from(code) {
            Ok(VehicleStopStatus::IncomingAt) => Self::IncomingAt,
            Ok(VehicleStopStatus::StoppedAt) => Self::StoppedAt,
            Ok(VehicleStopStatus::InTransitTo) => Self::InTransitTo,
            Err(_) => Self::Unknown(code),
        }
    }

    /// Display label, or `None` for codes without one.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::IncomingAt => Some("Arriving"),
            Self::StoppedAt => Some("Stopped"),
            Self::InTransitTo => Some("In Transit"),
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "{code}"),
            known => f.write_str(known.label().unwrap_or_default()),
        }
    }
}

/// A vehicle report with a usable position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehiclePosition {
    /// Feed entity id.
    pub id: String,
    pub vehicle_id: Option<String>,
    /// As reported by the feed; always textual.
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub direction_id: Option<u32>,
    pub latitude: f64,
    pub longitude: f64,
    pub bearing: Option<f32>,
    /// Meters per second.
    pub speed: Option<f32>,
    /// Seconds since the Unix epoch.
    pub timestamp: Option<u64>,
    pub current_status: Option<VehicleStatus>,
    pub stop_id: Option<String>,
    /// Destination text from the matched trip, once enriched.
    pub headsign: Option<String>,
}

/// Projects every entity carrying vehicle data into a [`VehiclePosition`],
/// dropping reports without a usable latitude and longitude.
pub fn extract_vehicle_positions(entities: &[FeedEntity]) -> Vec<VehiclePosition> {
    entities
        .iter()
        .filter_map(|entity| {
            let vehicle = entity.vehicle.as_ref()?;
            let position = vehicle.position.as_ref()?;
            let latitude = usable_coordinate(position.latitude)?;
            let longitude = usable_coordinate(position.longitude)?;
            let trip = vehicle.trip.as_ref();

            Some(VehiclePosition {
                id: entity.id.clone(),
                vehicle_id: vehicle.vehicle.as_ref().and_then(|v| v.id.clone()),
                route_id: trip.and_then(|t| t.route_id.clone()),
                trip_id: trip.and_then(|t| t.trip_id.clone()),
                direction_id: trip.and_then(|t| t.direction_id),
                latitude,
                longitude,
                bearing: position.bearing,
                speed: position.speed,
                timestamp: vehicle.timestamp,
                current_status: vehicle.current_status.map(VehicleStatus::from_code),
                stop_id: vehicle.stop_id.clone(),
                headsign: None,
            })
        })
        .collect()
}

/// Zero means "not reported" in feeds that zero-fill missing positions.
fn usable_coordinate(value: f32) -> Option<f64> {
    (value != 0.0 && value.is_finite()).then_some(value as f64)
}

/// Keeps vehicles whose route id is one of `route_ids`.
///
/// The ids may be numeric (as parsed from a static schedule) or textual; both
/// sides are compared in textual form.
pub fn filter_vehicles_by_routes<T: fmt::Display>(
    vehicles: Vec<VehiclePosition>,
    route_ids: &[T],
) -> Vec<VehiclePosition> {
    let wanted: HashSet<String> = route_ids.iter().map(coerce_id).collect();
    vehicles
        .into_iter()
        .filter(|v| {
            v.route_id
                .as_deref()
                .is_some_and(|id| wanted.contains(&coerce_id(id)))
        })
        .collect()
}

/// Attaches the headsign and direction of each vehicle's scheduled trip.
///
/// The trip's direction wins; the vehicle's own direction is kept only when
/// the trip has none. Vehicles without a trip id, or whose trip is not in the
/// schedule, pass through unchanged.
pub fn enrich_with_headsigns(
    vehicles: Vec<VehiclePosition>,
    schedule: &Schedule,
) -> Vec<VehiclePosition> {
    let mut unmatched = 0;

    let enriched = vehicles
        .into_iter()
        .map(|mut vehicle| {
            let Some(trip_id) = vehicle.trip_id.as_deref() else {
                return vehicle;
            };
            match schedule.trip(trip_id) {
                Some(trip) => {
                    vehicle.headsign = trip.trip_headsign.clone();
                    vehicle.direction_id = trip.direction_id.or(vehicle.direction_id);
                }
                None => unmatched += 1,
            }
            vehicle
        })
        .collect();

    if unmatched > 0 {
        warn!(unmatched, "Vehicles reference trips missing from the schedule");
    }
    enriched
}

/// Extracts, filters and enriches one feed poll.
#[tracing::instrument(skip_all, fields(entities = feed.entity.len()))]
pub fn correlate<T: fmt::Display>(
    feed: &FeedMessage,
    schedule: &Schedule,
    route_ids: &[T],
) -> Vec<VehiclePosition> {
    let positioned = extract_vehicle_positions(&feed.entity);
    let positioned_count = positioned.len();
    let on_routes = filter_vehicles_by_routes(positioned, route_ids);

    debug!(
        positioned = positioned_count,
        on_routes = on_routes.len(),
        "Vehicle positions extracted"
    );

    enrich_with_headsigns(on_routes, schedule)
}

/// How long ago `timestamp` (epoch seconds) was, e.g. `"42s ago"`, `"3m ago"`.
pub fn time_ago(timestamp: u64, now: DateTime<Utc>) -> String {
    let now = now.timestamp().max(0) as u64;
    let secs = now.saturating_sub(timestamp);

    if secs < 60 {
        return format!("{secs}s ago");
    }
    let minutes = secs / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}
