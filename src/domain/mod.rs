pub mod measurement;
pub mod series;

pub use measurement::{Measurement, ProbeFailure, ProbeStatus};
pub use series::{capacity_for, HostSeries, RETENTION_WINDOW};
