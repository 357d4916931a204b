pub mod events;
pub mod extract;
pub mod thermal;

pub use events::EventFeedAdapter;
pub use extract::{extract_fire_locations, parse_location_from_title};
pub use thermal::{ThermalFeedAdapter, BRIGHTNESS_FLOOR_K};
