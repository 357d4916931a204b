//! Data fusion core for the wildfire situational-awareness dashboard.
//!
//! Normalizes the incident, sensor, report and satellite feeds into one
//! map-rendering model, names coordinates without a geocoder, and drives the
//! map and sidebar view state. Nothing here performs I/O.

pub mod feed;
pub mod geo;
pub mod model;
pub mod prelude;
pub mod processing;
pub mod telemetry;
pub mod view;

pub use prelude::{Coordinate, FeedAdapter, FeedBatch, FeedError, FeedResult, FeedSource};
