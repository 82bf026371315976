//! Per-route display data derived from a [`Schedule`]: path geometry, stop
//! lists, and a guaranteed-valid display color.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::gtfs::{Route, Stop};
use crate::normalize::normalize_color;
use crate::schedule::Schedule;

/// A `(latitude, longitude)` pair.
pub type LatLng = (f64, f64);

/// Every `n`th stop is kept by [`major_stops_for_route`].
const MAJOR_STOP_STRIDE: usize = 3;

/// Stops whose name contains one of these are always major.
const MAJOR_STOP_KEYWORDS: &[&str] = &["STATION", "SKYTRAIN"];

/// Fallback colors for routes whose published color is missing or unusable.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    /// Route short name → `#RRGGBB`.
    pub fallbacks: HashMap<String, String>,
    pub default_color: String,
}

/// Everything needed to draw one route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteView {
    pub route_id: String,
    pub short_name: String,
    pub long_name: String,
    pub color: String,
    pub path: Vec<LatLng>,
    pub stops: Vec<Stop>,
    pub major_stops: Vec<Stop>,
}

/// Path of the route's representative trip, in ascending `shape_pt_sequence`.
///
/// A route without a trip, or whose trip has no shape, gets an empty path.
pub fn shape_for_route(schedule: &Schedule, route: &Route) -> Vec<LatLng> {
    let Some(trip) = schedule
        .representative_trip(route)
        .filter(|t| !t.shape_id.is_empty())
    else {
        warn!(route = %route.route_short_name, "No shape found for route");
        return Vec::new();
    };

    let mut points: Vec<_> = schedule.shape_points(&trip.shape_id).collect();
    points.sort_by_key(|p| p.shape_pt_sequence);
    points
        .into_iter()
        .map(|p| (p.shape_pt_lat, p.shape_pt_lon))
        .collect()
}

/// Stops visited by the route's first trip, in `stop_sequence` order.
///
/// Stop times pointing at unknown stops, or at stops without coordinates, are
/// skipped.
pub fn stops_for_route(schedule: &Schedule, route: &Route) -> Vec<Stop> {
    let Some(trip) = schedule.representative_trip(route) else {
        return Vec::new();
    };

    let mut stop_times: Vec<_> = schedule.stop_times(&trip.trip_id).collect();
    stop_times.sort_by_key(|st| st.stop_sequence);

    let mut missing = 0;
    let mut unplaced = 0;
    let stops: Vec<Stop> = stop_times
        .into_iter()
        .filter_map(|st| match schedule.stop(&st.stop_id) {
            Some(stop) if stop.position().is_some() => Some(stop.clone()),
            Some(_) => {
                unplaced += 1;
                None
            }
            None => {
                missing += 1;
                None
            }
        })
        .collect();

    if missing > 0 {
        warn!(
            route = %route.route_short_name,
            trip = %trip.trip_id,
            missing,
            "Stop times reference unknown stops"
        );
    }
    if unplaced > 0 {
        warn!(
            route = %route.route_short_name,
            trip = %trip.trip_id,
            unplaced,
            "Stop times reference stops without coordinates"
        );
    }
    stops
}

/// Decluttered stop list: every third stop (starting with the first) plus
/// any station, whatever its position.
pub fn major_stops_for_route(schedule: &Schedule, route: &Route) -> Vec<Stop> {
    major_stops(stops_for_route(schedule, route))
}

fn major_stops(stops: Vec<Stop>) -> Vec<Stop> {
    stops
        .into_iter()
        .enumerate()
        .filter(|(idx, stop)| idx % MAJOR_STOP_STRIDE == 0 || is_station(stop))
        .map(|(_, stop)| stop)
        .collect()
}

fn is_station(stop: &Stop) -> bool {
    let name = stop.stop_name.to_uppercase();
    MAJOR_STOP_KEYWORDS.iter().any(|kw| name.contains(kw))
}

/// Display color of a route, always `#RRGGBB`.
pub fn route_color(route: &Route, palette: &ColorPalette) -> String {
    normalize_color(
        &route.route_color,
        &palette.fallbacks,
        &route.route_short_name,
        &palette.default_color,
    )
}

/// Builds a [`RouteView`] for each route named in `short_names`, in table order.
#[tracing::instrument(skip(schedule, palette))]
pub fn build_route_views<S: AsRef<str> + std::fmt::Debug>(
    schedule: &Schedule,
    short_names: &[S],
    palette: &ColorPalette,
) -> Vec<RouteView> {
    schedule
        .routes_by_short_names(short_names)
        .into_iter()
        .map(|route| {
            let stops = stops_for_route(schedule, route);
            RouteView {
                route_id: route.route_id.clone(),
                short_name: route.route_short_name.clone(),
                long_name: route.route_long_name.clone(),
                color: route_color(route, palette),
                path: shape_for_route(schedule, route),
                major_stops: major_stops(stops.clone()),
                stops,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs::ScheduleTables;
    use crate::schedule::tests::{point, route, sample_tables, stop, stop_time, trip};

    fn palette() -> ColorPalette {
        ColorPalette {
            fallbacks: HashMap::from([("R4".to_string(), "#CE1126".to_string())]),
            default_color: "#F527B4".to_string(),
        }
    }

    fn ten_stop_schedule(names: &[&str]) -> Schedule {
        let mut tables = ScheduleTables {
            routes: vec![route("1", "10", "")],
            trips: vec![trip("1", "T1", "", "")],
            ..Default::default()
        };
        for (idx, name) in names.iter().enumerate() {
            let id = format!("S{idx}");
            tables.stops.push(stop(&id, name));
            tables.stop_times.push(stop_time("T1", &id, idx as u32 + 1));
        }
        Schedule::new(tables)
    }

    #[test]
    fn test_shape_is_sorted_by_sequence() {
        let schedule = Schedule::new(sample_tables());
        let route = schedule.route("6636").unwrap();
        assert_eq!(
            shape_for_route(&schedule, route),
            vec![(49.1, -123.2), (49.2, -123.1)]
        );
    }

    #[test]
    fn test_shuffled_shape_points_come_out_ascending() {
        let sequences = [7, 3, 9, 1, 5, 2, 8];
        let tables = ScheduleTables {
            routes: vec![route("1", "1", "")],
            trips: vec![trip("1", "T1", "SH", "")],
            shapes: sequences
                .iter()
                .map(|&seq| point("SH", seq, seq as f64, -(seq as f64)))
                .collect(),
            ..Default::default()
        };
        let schedule = Schedule::new(tables);
        let path = shape_for_route(&schedule, schedule.route("1").unwrap());

        let lats: Vec<f64> = path.iter().map(|(lat, _)| *lat).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0, 5.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_shape_uses_representative_trip_only() {
        let schedule = Schedule::new(sample_tables());
        let route = schedule.route("6611").unwrap();
        assert_eq!(shape_for_route(&schedule, route), vec![(49.3, -123.0)]);
    }

    #[test]
    fn test_route_without_shape_id_has_empty_path() {
        let schedule = Schedule::new(sample_tables());
        let route = schedule.route("6700").unwrap();
        assert!(shape_for_route(&schedule, route).is_empty());
    }

    #[test]
    fn test_route_without_trips_is_empty() {
        let schedule = Schedule::new(sample_tables());
        let orphan = route("0", "0", "");
        assert!(shape_for_route(&schedule, &orphan).is_empty());
        assert!(stops_for_route(&schedule, &orphan).is_empty());
    }

    #[test]
    fn test_stops_follow_stop_sequence() {
        let schedule = Schedule::new(sample_tables());
        let route = schedule.route("6636").unwrap();
        let ids: Vec<_> = stops_for_route(&schedule, route)
            .into_iter()
            .map(|s| s.stop_id)
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_unknown_stops_are_dropped() {
        let mut tables = sample_tables();
        tables.stop_times.push(stop_time("T1", "MISSING", 3));
        let schedule = Schedule::new(tables);
        let route = schedule.route("6636").unwrap();
        assert_eq!(stops_for_route(&schedule, route).len(), 2);
    }

    #[test]
    fn test_stops_without_coordinates_are_dropped() {
        let mut tables = sample_tables();
        let mut node = stop("NODE", "Generic node");
        node.stop_lat = None;
        node.stop_lon = None;
        tables.stops.push(node);
        tables.stop_times.push(stop_time("T1", "NODE", 3));
        let schedule = Schedule::new(tables);
        let route = schedule.route("6636").unwrap();

        let ids: Vec<_> = stops_for_route(&schedule, route)
            .into_iter()
            .map(|s| s.stop_id)
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_major_stops_every_third_of_ten() {
        let names: Vec<String> = (0..10).map(|i| format!("Main St at {i} Ave")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let schedule = ten_stop_schedule(&names);
        let route = schedule.route("1").unwrap();

        let ids: Vec<_> = major_stops_for_route(&schedule, route)
            .into_iter()
            .map(|s| s.stop_id)
            .collect();
        assert_eq!(ids, vec!["S0", "S3", "S6", "S9"]);
    }

    #[test]
    fn test_major_stops_always_include_stations() {
        let names = [
            "First",
            "Second",
            "Joyce-Collingwood Station",
            "Fourth",
            "Fifth",
            "Metrotown skytrain loop",
        ];
        let schedule = ten_stop_schedule(&names);
        let route = schedule.route("1").unwrap();

        let ids: Vec<_> = major_stops_for_route(&schedule, route)
            .into_iter()
            .map(|s| s.stop_id)
            .collect();
        assert_eq!(ids, vec!["S0", "S2", "S3", "S5"]);
    }

    #[test]
    fn test_route_color_fallback_chain() {
        let schedule = Schedule::new(sample_tables());
        let palette = palette();
        assert_eq!(route_color(schedule.route("6636").unwrap(), &palette), "#0761A5");
        assert_eq!(route_color(schedule.route("6611").unwrap(), &palette), "#F527B4");
        assert_eq!(route_color(schedule.route("6700").unwrap(), &palette), "#CE1126");
    }

    #[test]
    fn test_build_route_views() {
        let schedule = Schedule::new(sample_tables());
        let views = build_route_views(&schedule, &["R4", "99"], &palette());

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].short_name, "99");
        assert_eq!(views[0].path.len(), 2);
        assert_eq!(views[0].stops.len(), 2);
        assert_eq!(views[0].major_stops.len(), 1);
        assert_eq!(views[1].short_name, "R4");
        assert!(views[1].path.is_empty());
        assert_eq!(views[1].color, "#CE1126");
    }
}
