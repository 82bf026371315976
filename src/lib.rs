pub mod config;
pub mod fetch;
pub mod gtfs;
pub mod live;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod reduce;
pub mod route_view;
pub mod schedule;
pub mod selection;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
