use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::Measurement;

/// Registered hosts plus the series selected for them
#[derive(Debug, Clone, Default)]
pub struct LatencySnapshot {
    pub hosts: Vec<String>,
    pub data: BTreeMap<String, Vec<Measurement>>,
}

/// Per-series bookkeeping shown on the diagnostic endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SeriesStatus {
    pub data_points: usize,
    pub latest: Option<Measurement>,
}

/// Port for the host registry and its retained measurements.
///
/// Implementations guard both behind one lock so that readers never see a
/// host mid-removal or a series mid-eviction.
pub trait LatencyStore: Send + Sync {
    /// Maximum samples kept per host
    fn capacity(&self) -> usize;

    /// Register a host; false if it was already registered
    fn add_host(&self, host: &str) -> bool;

    /// Unregister a host, keeping its series; false if it was not registered
    fn remove_host(&self, host: &str) -> bool;

    /// Registered hosts in the order they were added
    fn hosts(&self) -> Vec<String>;

    /// Append one sample to a host's series
    #[cfg(test)]
    fn append(&self, host: &str, measurement: Measurement);

    /// Append the results of one tick as a single atomic step.
    ///
    /// Results for hosts unregistered while the tick was in flight are dropped.
    /// Returns the number of samples written.
    fn record_tick(&self, results: Vec<(String, Measurement)>) -> usize;

    /// Oldest-first copy of a host's series; empty for unknown hosts
    fn series(&self, host: &str) -> Vec<Measurement>;

    /// Most recent sample for a host
    #[cfg(test)]
    fn latest(&self, host: &str) -> Option<Measurement>;

    /// Registered hosts with their series, optionally including hosts whose
    /// series outlived their registration
    fn snapshot(&self, include_removed: bool) -> LatencySnapshot;

    /// Latest sample of every registered host, in registration order
    fn latest_per_host(&self) -> Vec<(String, Option<Measurement>)>;

    /// Size and tail of every retained series
    fn data_status(&self) -> BTreeMap<String, SeriesStatus>;
}
