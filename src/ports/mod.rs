pub mod host_mirror;
pub mod latency_store;
pub mod probe_method;

pub use host_mirror::{HostMirror, MirrorError};
pub use latency_store::{LatencySnapshot, LatencyStore, SeriesStatus};
pub use probe_method::ProbeMethod;
