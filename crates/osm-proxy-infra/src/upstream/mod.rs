//! Upstream service client and its rate-limit header handling.

pub mod headers;
mod osm;

pub use osm::{OsmClient, OsmConfig};
