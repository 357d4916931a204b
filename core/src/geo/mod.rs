pub mod namer;
pub mod region;

pub use namer::name_location;
pub use region::{is_in_region, normalize_longitude, BoundingBox, NORTH_AMERICA};
