pub mod controller;
pub mod marker;
pub mod page;
pub mod registry;
pub mod sidebar;
pub mod surface;

pub use controller::{ControllerState, MapController, MapData};
pub use marker::{Glyph, Marker, MarkerKind, MarkerStyle, Popup, PopupLine, Rgb};
pub use page::{DashboardPage, Notice, SourceState};
pub use registry::{MarkerRegistry, RegisteredMarker};
pub use sidebar::{frp_badge, DetectionCard, IncidentCard, SidebarModel};
pub use surface::{CameraView, MapSurface, MarkerId};
