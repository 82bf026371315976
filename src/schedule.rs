//! Read-only in-memory schedule with the indices the joins need.
//!
//! A [`Schedule`] owns the five tables and a set of side tables mapping ids to
//! row positions. It is built once per load and never mutated afterwards, so it
//! can be shared freely between the route view builder and the live correlator.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::gtfs::{Route, ScheduleTables, ShapePoint, Stop, StopTime, Trip};
use crate::normalize::coerce_id;

/// Row positions, in table order, keyed by an id column.
type RowIndex = HashMap<String, Vec<usize>>;

pub struct Schedule {
    tables: ScheduleTables,
    route_by_id: HashMap<String, usize>,
    trips_by_route: RowIndex,
    trip_by_id: HashMap<String, usize>,
    shape_points_by_shape: RowIndex,
    stop_times_by_trip: RowIndex,
    stop_by_id: HashMap<String, usize>,
}

impl Schedule {
    pub fn new(tables: ScheduleTables) -> Self {
        let route_by_id = first_positions(tables.routes.iter().map(|r| r.route_id.as_str()));
        let trip_by_id = first_positions(tables.trips.iter().map(|t| t.trip_id.as_str()));
        let stop_by_id = first_positions(tables.stops.iter().map(|s| s.stop_id.as_str()));
        let trips_by_route = group_positions(tables.trips.iter().map(|t| t.route_id.as_str()));
        let shape_points_by_shape =
            group_positions(tables.shapes.iter().map(|p| p.shape_id.as_str()));
        let stop_times_by_trip =
            group_positions(tables.stop_times.iter().map(|st| st.trip_id.as_str()));

        debug!(
            routes = route_by_id.len(),
            trips = trip_by_id.len(),
            shapes = shape_points_by_shape.len(),
            stops = stop_by_id.len(),
            "Schedule indexed"
        );

        Self {
            tables,
            route_by_id,
            trips_by_route,
            trip_by_id,
            shape_points_by_shape,
            stop_times_by_trip,
            stop_by_id,
        }
    }

    pub fn tables(&self) -> &ScheduleTables {
        &self.tables
    }

    /// Routes whose short name is in `names`, in table order.
    pub fn routes_by_short_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<&Route> {
        let names: HashSet<&str> = names.iter().map(|n| n.as_ref()).collect();
        self.tables
            .routes
            .iter()
            .filter(|r| names.contains(r.route_short_name.as_str()))
            .collect()
    }

    /// Route ids for the selected short names, in table order.
    pub fn route_ids<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        self.routes_by_short_names(names)
            .into_iter()
            .map(|r| r.route_id.clone())
            .collect()
    }

    pub fn route(&self, route_id: &str) -> Option<&Route> {
        self.route_by_id
            .get(route_id)
            .map(|&idx| &self.tables.routes[idx])
    }

    /// Trips of a route, in table order.
    pub fn trips_for_route<'a>(
        &'a self,
        route: &Route,
    ) -> impl Iterator<Item = &'a Trip> + use<'a> {
        rows(&self.trips_by_route, &route.route_id, &self.tables.trips)
    }

    /// The first trip (table order) of `route`. Its shape and stop pattern stand
    /// in for the whole route; branches and express patterns are not separated.
    pub fn representative_trip(&self, route: &Route) -> Option<&Trip> {
        self.trips_for_route(route).next()
    }

    /// Looks a trip up by id, accepting numeric or textual ids.
    pub fn trip<T: std::fmt::Display + ?Sized>(&self, trip_id: &T) -> Option<&Trip> {
        self.trip_by_id
            .get(&coerce_id(trip_id))
            .map(|&idx| &self.tables.trips[idx])
    }

    /// Points of a shape in table order (not yet sorted by sequence).
    pub fn shape_points<'a>(
        &'a self,
        shape_id: &str,
    ) -> impl Iterator<Item = &'a ShapePoint> + use<'a> {
        rows(&self.shape_points_by_shape, shape_id, &self.tables.shapes)
    }

    /// Stop times of a trip in table order (not yet sorted by sequence).
    pub fn stop_times<'a>(&'a self, trip_id: &str) -> impl Iterator<Item = &'a StopTime> + use<'a> {
        rows(&self.stop_times_by_trip, trip_id, &self.tables.stop_times)
    }

    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stop_by_id
            .get(stop_id)
            .map(|&idx| &self.tables.stops[idx])
    }
}

fn rows<'a, T>(
    index: &'a RowIndex,
    key: &str,
    table: &'a [T],
) -> impl Iterator<Item = &'a T> + use<'a, T> {
    index
        .get(key)
        .into_iter()
        .flatten()
        .map(move |&idx| &table[idx])
}

/// First row position of every distinct key. Later duplicates are ignored,
/// matching a front-to-back table scan.
fn first_positions<'a>(keys: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (idx, key) in keys.enumerate() {
        index.entry(key.to_string()).or_insert(idx);
    }
    index
}

fn group_positions<'a>(keys: impl Iterator<Item = &'a str>) -> RowIndex {
    let mut index: RowIndex = HashMap::new();
    for (idx, key) in keys.enumerate() {
        index.entry(key.to_string()).or_default().push(idx);
    }
    index
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn route(id: &str, short_name: &str, color: &str) -> Route {
        Route {
            route_id: id.to_string(),
            route_short_name: short_name.to_string(),
            route_long_name: format!("Route {short_name}"),
            route_color: color.to_string(),
            route_type: Some(3),
        }
    }

    pub(crate) fn trip(route_id: &str, trip_id: &str, shape_id: &str, headsign: &str) -> Trip {
        Trip {
            route_id: route_id.to_string(),
            trip_id: trip_id.to_string(),
            trip_headsign: (!headsign.is_empty()).then(|| headsign.to_string()),
            direction_id: Some(0),
            shape_id: shape_id.to_string(),
        }
    }

    pub(crate) fn point(shape_id: &str, seq: u32, lat: f64, lon: f64) -> ShapePoint {
        ShapePoint {
            shape_id: shape_id.to_string(),
            shape_pt_lat: lat,
            shape_pt_lon: lon,
            shape_pt_sequence: seq,
        }
    }

    pub(crate) fn stop(id: &str, name: &str) -> Stop {
        Stop {
            stop_id: id.to_string(),
            stop_code: None,
            stop_name: name.to_string(),
            stop_lat: Some(49.0),
            stop_lon: Some(-123.0),
        }
    }

    pub(crate) fn stop_time(trip_id: &str, stop_id: &str, seq: u32) -> StopTime {
        StopTime {
            trip_id: trip_id.to_string(),
            stop_id: stop_id.to_string(),
            stop_sequence: seq,
        }
    }

    /// Routes 99 and 20 share stop A; route 20 has two trips on different
    /// shapes; R4 has a trip without a shape.
    pub(crate) fn sample_tables() -> ScheduleTables {
        ScheduleTables {
            routes: vec![
                route("6636", "99", "0761A5"),
                route("6611", "20", ""),
                route("6700", "R4", "000000"),
            ],
            trips: vec![
                trip("6636", "T1", "S1", "UBC"),
                trip("6611", "T2", "S2", "Downtown"),
                trip("6611", "T3", "S3", "Victoria"),
                trip("6700", "T4", "", "Joyce"),
            ],
            shapes: vec![
                point("S1", 2, 49.2, -123.1),
                point("S1", 1, 49.1, -123.2),
                point("S2", 1, 49.3, -123.0),
                point("S3", 1, 49.4, -123.0),
            ],
            stops: vec![
                stop("A", "Commercial-Broadway Station"),
                stop("B", "Broadway at Main"),
                stop("C", "Victoria at 41st"),
                stop("D", "Joyce Station"),
            ],
            stop_times: vec![
                stop_time("T1", "B", 2),
                stop_time("T1", "A", 1),
                stop_time("T2", "A", 1),
                stop_time("T2", "C", 2),
                stop_time("T3", "C", 1),
                stop_time("T4", "D", 1),
            ],
        }
    }

    #[test]
    fn test_routes_by_short_names_keeps_table_order() {
        let schedule = Schedule::new(sample_tables());
        let found: Vec<_> = schedule
            .routes_by_short_names(&["R4", "99"])
            .into_iter()
            .map(|r| r.route_short_name.as_str())
            .collect();
        assert_eq!(found, vec!["99", "R4"]);
    }

    #[test]
    fn test_routes_by_short_names_unknown_is_empty() {
        let schedule = Schedule::new(sample_tables());
        assert!(schedule.routes_by_short_names(&["404"]).is_empty());
    }

    #[test]
    fn test_representative_trip_is_first_in_table_order() {
        let schedule = Schedule::new(sample_tables());
        let route = schedule.route("6611").unwrap();
        assert_eq!(schedule.representative_trip(route).unwrap().trip_id, "T2");
    }

    #[test]
    fn test_representative_trip_missing() {
        let schedule = Schedule::new(sample_tables());
        let orphan = route("1", "1", "");
        assert!(schedule.representative_trip(&orphan).is_none());
    }

    #[test]
    fn test_trip_lookup_coerces_numeric_ids() {
        let mut tables = sample_tables();
        tables.trips.push(trip("6636", "14012", "S1", "UBC"));
        let schedule = Schedule::new(tables);
        assert_eq!(schedule.trip(&14012u64).unwrap().trip_id, "14012");
        assert_eq!(schedule.trip("T3").unwrap().trip_headsign.as_deref(), Some("Victoria"));
        assert!(schedule.trip("nope").is_none());
    }

    #[test]
    fn test_duplicate_ids_resolve_to_first_row() {
        let mut tables = sample_tables();
        tables.stops.push(stop("A", "Duplicate"));
        let schedule = Schedule::new(tables);
        assert_eq!(schedule.stop("A").unwrap().stop_name, "Commercial-Broadway Station");
    }
}
