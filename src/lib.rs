pub mod agency;
pub mod alias;
pub mod clock;
pub mod compiler;
pub mod config;
pub mod error;
pub mod feeds;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod realtime;
pub mod requests;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
