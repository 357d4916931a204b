pub mod backend;
pub mod feeds;
pub mod geocoder;

pub use backend::{BackendClient, Direction, RowQuery};
pub use feeds::{fetch_events_json, fetch_thermal_csv};
pub use geocoder::Geocoder;
