pub mod incident;
pub mod location;
pub mod report;
pub mod satellite;
pub mod sensor;
pub mod snapshot;

pub use incident::{Incident, IncidentStatus, Severity};
pub use location::ApproximateLocation;
pub use report::{NewReport, PhotoUpload, ReportStatus, ReportSubmission, UserReport};
pub use satellite::{SatelliteEventPoint, ThermalDetectionPoint};
pub use sensor::{Sensor, SensorKind};
pub use snapshot::{DashboardSnapshot, FeedStatus, SourceSnapshot};
