use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::{Measurement, ProbeFailure, ProbeStatus};
use crate::ports::ProbeMethod;

/// Slack on top of the summed method timeouts before the whole probe is abandoned
const DEADLINE_GRACE: Duration = Duration::from_millis(500);

/// Result of running the fallback chain against one host
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Ok {
        latency: Duration,
        method: &'static str,
    },
    Failed {
        status: ProbeStatus,
        failures: Vec<(&'static str, ProbeFailure)>,
    },
}

/// Ordered fallback chain of probe methods; the first success wins
pub struct Prober {
    methods: Vec<Arc<dyn ProbeMethod>>,
    deadline: Duration,
}

impl Prober {
    pub fn new(methods: Vec<Arc<dyn ProbeMethod>>) -> Self {
        let budget: Duration = methods.iter().map(|m| m.timeout()).sum();
        Self {
            methods,
            deadline: budget + DEADLINE_GRACE,
        }
    }

    pub fn methods(&self) -> &[Arc<dyn ProbeMethod>] {
        &self.methods
    }

    /// Run the chain; never fails, failures are part of the outcome
    pub async fn probe(&self, host: &str) -> ProbeOutcome {
        match timeout(self.deadline, self.run_chain(host)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Probe of {} exceeded {:?}", host, self.deadline);
                ProbeOutcome::Failed {
                    status: ProbeStatus::Timeout,
                    failures: Vec::new(),
                }
            }
        }
    }

    /// Probe `host` and stamp the result with the probe start time
    pub async fn measure(&self, host: &str) -> Measurement {
        let started_at = Utc::now();
        match self.probe(host).await {
            ProbeOutcome::Ok { latency, .. } => {
                Measurement::ok(started_at, latency.as_secs_f64() * 1000.0)
            }
            ProbeOutcome::Failed { status, .. } => Measurement::failed(started_at, status),
        }
    }

    async fn run_chain(&self, host: &str) -> ProbeOutcome {
        let mut failures = Vec::with_capacity(self.methods.len());

        for method in &self.methods {
            match method.measure(host).await {
                Ok(latency) => {
                    debug!(
                        "{} latency to {}: {:.2}ms",
                        method.name(),
                        host,
                        latency.as_secs_f64() * 1000.0
                    );
                    return ProbeOutcome::Ok {
                        latency,
                        method: method.name(),
                    };
                }
                Err(failure) => {
                    debug!("{} check of {} failed: {}", method.name(), host, failure);
                    failures.push((method.name(), failure));
                }
            }
        }

        warn!("All latency check methods failed for {}", host);
        let kinds: Vec<ProbeFailure> = failures.iter().map(|(_, f)| f.clone()).collect();
        ProbeOutcome::Failed {
            status: ProbeStatus::from_failures(&kinds),
            failures,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;

    /// Probe method with a canned result
    pub(crate) struct StubMethod {
        pub name: &'static str,
        pub result: Result<Duration, ProbeFailure>,
        pub delay: Duration,
        pub timeout: Duration,
    }

    impl StubMethod {
        pub fn ok(name: &'static str, latency_ms: u64) -> Arc<dyn ProbeMethod> {
            Arc::new(Self {
                name,
                result: Ok(Duration::from_millis(latency_ms)),
                delay: Duration::ZERO,
                timeout: Duration::from_secs(1),
            })
        }

        pub fn failing(name: &'static str, failure: ProbeFailure) -> Arc<dyn ProbeMethod> {
            Arc::new(Self {
                name,
                result: Err(failure),
                delay: Duration::ZERO,
                timeout: Duration::from_secs(1),
            })
        }

        /// Succeeds after sleeping for `delay`
        pub fn slow(name: &'static str, latency_ms: u64, delay: Duration) -> Arc<dyn ProbeMethod> {
            Arc::new(Self {
                name,
                result: Ok(Duration::from_millis(latency_ms)),
                delay,
                timeout: Duration::from_secs(1),
            })
        }

        /// Sleeps past its own timeout, then reports a timeout
        pub fn hanging(name: &'static str, timeout: Duration) -> Arc<dyn ProbeMethod> {
            Arc::new(Self {
                name,
                result: Err(ProbeFailure::Timeout),
                delay: timeout,
                timeout,
            })
        }
    }

    #[async_trait]
    impl ProbeMethod for StubMethod {
        fn name(&self) -> &'static str {
            self.name
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        async fn measure(&self, _host: &str) -> Result<Duration, ProbeFailure> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result.clone()
        }
    }

    /// Succeeds for hosts starting with "up", tracking peak concurrency
    #[derive(Default)]
    pub(crate) struct CountingMethod {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CountingMethod {
        pub fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProbeMethod for CountingMethod {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn measure(&self, host: &str) -> Result<Duration, ProbeFailure> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if host.starts_with("up") {
                Ok(Duration::from_millis(10))
            } else {
                Err(ProbeFailure::ConnectionRefused(host.to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let prober = Prober::new(vec![
            StubMethod::ok("http", 20),
            StubMethod::ok("tcp", 5),
        ]);

        let outcome = prober.probe("example.com").await;
        assert_eq!(
            outcome,
            ProbeOutcome::Ok {
                latency: Duration::from_millis(20),
                method: "http",
            }
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_tcp() {
        let prober = Prober::new(vec![
            StubMethod::failing("http", ProbeFailure::Protocol("HTTP status 500".into())),
            StubMethod::ok("tcp", 42),
            StubMethod::ok("icmp", 7),
        ]);

        let measurement = prober.measure("tcp-only.example").await;
        assert_eq!(measurement.status(), ProbeStatus::Ok);
        assert_eq!(measurement.latency(), Some(42.0));
    }

    #[tokio::test]
    async fn test_all_methods_fail() {
        let prober = Prober::new(vec![
            StubMethod::failing("http", ProbeFailure::ConnectionRefused("refused".into())),
            StubMethod::failing("tcp", ProbeFailure::ConnectionRefused("refused".into())),
            StubMethod::failing("icmp", ProbeFailure::Timeout),
        ]);

        match prober.probe("down.example").await {
            ProbeOutcome::Failed { status, failures } => {
                assert_eq!(status, ProbeStatus::Unreachable);
                let names: Vec<&str> = failures.iter().map(|(name, _)| *name).collect();
                assert_eq!(names, vec!["http", "tcp", "icmp"]);
            }
            other => panic!("expected failure, got {:?}", other),
        }

        let measurement = prober.measure("down.example").await;
        assert_eq!(measurement.latency(), None);
    }

    #[tokio::test]
    async fn test_all_timeouts_bounded_by_sum() {
        let per_method = Duration::from_millis(300);
        let prober = Prober::new(vec![
            StubMethod::hanging("http", per_method),
            StubMethod::hanging("tcp", per_method),
            StubMethod::hanging("icmp", per_method),
        ]);

        let started = Instant::now();
        let measurement = prober.measure("blackhole.example").await;

        assert_eq!(measurement.status(), ProbeStatus::Unreachable);
        assert_eq!(measurement.latency(), None);
        let tolerance = Duration::from_millis(150);
        assert!(started.elapsed() <= per_method * 3 + tolerance);
    }

    #[tokio::test]
    async fn test_overall_deadline_reports_timeout() {
        // Method ignores its declared timeout
        let runaway: Arc<dyn ProbeMethod> = Arc::new(StubMethod {
            name: "http",
            result: Ok(Duration::from_millis(1)),
            delay: Duration::from_secs(30),
            timeout: Duration::from_millis(100),
        });
        let prober = Prober::new(vec![runaway]);

        let measurement = prober.measure("slow.example").await;
        assert_eq!(measurement.status(), ProbeStatus::Timeout);
        assert_eq!(measurement.latency(), None);
    }
}
