//! # OSM Proxy Shared
//!
//! Wire types shared between the browser client and the proxy.

pub mod dto;
pub mod response;

pub use response::ErrorResponse;
