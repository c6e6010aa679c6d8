use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ProbeFailure;

/// Port for one way of measuring reachability latency to a host
#[async_trait]
pub trait ProbeMethod: Send + Sync {
    /// Short label used in logs and diagnostics
    fn name(&self) -> &'static str;

    /// Upper bound the caller enforces around `measure`
    fn timeout(&self) -> Duration;

    /// Measure the round-trip time to `host`
    async fn measure(&self, host: &str) -> Result<Duration, ProbeFailure>;
}
