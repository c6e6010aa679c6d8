use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::net::lookup_host;
use tokio::time::timeout;
use tracing::{info, warn};

use super::{MonitorLoop, Prober};
use crate::domain::Measurement;
use crate::ports::{HostMirror, LatencySnapshot, LatencyStore, SeriesStatus};

const DNS_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry size after a mutation, and whether the mutation happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostChange {
    pub changed: bool,
    pub total_hosts: usize,
}

/// Main application service: registry mutations and the read-only query interface
pub struct MonitoringService {
    store: Arc<dyn LatencyStore>,
    prober: Arc<Prober>,
    mirror: Option<Arc<dyn HostMirror>>,
    check_interval: Duration,
    max_concurrency: usize,
    // Serializes mutate-then-mirror so the file never lags behind a later change
    mutations: Mutex<()>,
}

impl MonitoringService {
    pub fn new(store: Arc<dyn LatencyStore>, prober: Arc<Prober>, check_interval: Duration) -> Self {
        Self {
            store,
            prober,
            mirror: None,
            check_interval,
            max_concurrency: 1,
            mutations: Mutex::new(()),
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn HostMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Hosts probed at once by the monitor loop and by diagnostics
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Background loop sharing this service's store and prober
    pub fn monitor_loop(&self) -> MonitorLoop {
        MonitorLoop::new(
            Arc::clone(&self.store),
            Arc::clone(&self.prober),
            self.check_interval,
            self.max_concurrency,
        )
    }

    /// Start monitoring a host; a host that is already monitored is left alone
    pub fn add_host(&self, host: &str) -> HostChange {
        let _guard = self.mutations.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = self.store.add_host(host);
        let hosts = self.store.hosts();

        if changed {
            self.mirror_hosts(&hosts);
            info!("Added new host: {}. Total hosts: {}", host, hosts.len());
        }

        HostChange {
            changed,
            total_hosts: hosts.len(),
        }
    }

    /// Stop monitoring a host; its history stays queryable
    pub fn remove_host(&self, host: &str) -> HostChange {
        let _guard = self.mutations.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = self.store.remove_host(host);
        let hosts = self.store.hosts();

        if changed {
            self.mirror_hosts(&hosts);
            info!("Removed host: {}. Remaining hosts: {}", host, hosts.len());
        }

        HostChange {
            changed,
            total_hosts: hosts.len(),
        }
    }

    fn mirror_hosts(&self, hosts: &[String]) {
        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.save(hosts) {
                warn!("Error saving hosts to mirror: {}", e);
            }
        }
    }

    pub fn hosts(&self) -> Vec<String> {
        self.store.hosts()
    }

    pub fn snapshot(&self, include_removed: bool) -> LatencySnapshot {
        self.store.snapshot(include_removed)
    }

    pub fn series(&self, host: &str) -> Vec<Measurement> {
        self.store.series(host)
    }

    pub fn latest_per_host(&self) -> Vec<(String, Option<Measurement>)> {
        self.store.latest_per_host()
    }

    pub fn data_status(&self) -> BTreeMap<String, SeriesStatus> {
        self.store.data_status()
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Run DNS plus every probe method against `host` outside the regular cadence.
    ///
    /// Keys are `dns_test` and `<method>_test`; values start with `OK` or `FAILED`.
    pub async fn diagnose(&self, host: &str) -> BTreeMap<String, String> {
        let mut results = BTreeMap::new();
        results.insert("dns_test".to_string(), dns_test(host).await);

        for method in self.prober.methods() {
            let line = match method.measure(host).await {
                Ok(rtt) => format!("OK - {:.2}ms", rtt.as_secs_f64() * 1000.0),
                Err(failure) => format!("FAILED - {}", failure),
            };
            results.insert(format!("{}_test", method.name()), line);
        }

        results
    }

    /// `diagnose` for every registered host, at most `max_concurrency` at a time
    pub async fn diagnose_all(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        stream::iter(self.hosts())
            .map(|host| async move {
                let report = self.diagnose(&host).await;
                (host, report)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await
    }
}

async fn dns_test(host: &str) -> String {
    match timeout(DNS_TEST_TIMEOUT, lookup_host((host, 0))).await {
        Ok(Ok(mut addrs)) => match addrs.next() {
            Some(addr) => format!("OK - Resolved to {}", addr.ip()),
            None => "FAILED - no addresses".to_string(),
        },
        Ok(Err(e)) => format!("FAILED - {}", e),
        Err(_) => "FAILED - timed out".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::adapters::MemoryStore;
    use crate::application::prober::tests::{CountingMethod, StubMethod};
    use crate::domain::ProbeFailure;
    use crate::ports::{MirrorError, ProbeMethod};

    #[derive(Default)]
    struct RecordingMirror {
        saved: Mutex<Vec<Vec<String>>>,
    }

    impl HostMirror for RecordingMirror {
        fn load(&self) -> Result<Vec<String>, MirrorError> {
            Ok(self.saved.lock().unwrap().last().cloned().unwrap_or_default())
        }

        fn save(&self, hosts: &[String]) -> Result<(), MirrorError> {
            self.saved.lock().unwrap().push(hosts.to_vec());
            Ok(())
        }
    }

    fn build_service(hosts: &[&str]) -> (MonitoringService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_hosts(1440, hosts.iter().copied()));
        let prober = Arc::new(Prober::new(vec![
            StubMethod::failing("http", ProbeFailure::Protocol("HTTP status 404".into())),
            StubMethod::ok("tcp", 12),
        ]));
        let service = MonitoringService::new(store.clone(), prober, Duration::from_secs(60));
        (service, store)
    }

    #[test]
    fn test_add_and_remove_scenario() {
        let (service, _) = build_service(&["google.com"]);

        let added = service.add_host("example.com");
        assert_eq!(added, HostChange { changed: true, total_hosts: 2 });

        let again = service.add_host("example.com");
        assert_eq!(again, HostChange { changed: false, total_hosts: 2 });

        let removed = service.remove_host("example.com");
        assert_eq!(removed, HostChange { changed: true, total_hosts: 1 });

        let missing = service.remove_host("example.com");
        assert_eq!(missing, HostChange { changed: false, total_hosts: 1 });
    }

    #[test]
    fn test_removed_host_history_queryable() {
        let (service, store) = build_service(&["example.com"]);
        store.append("example.com", Measurement::ok(Utc::now(), 8.0));

        service.remove_host("example.com");
        assert_eq!(service.series("example.com").len(), 1);
        assert!(service.latest_per_host().is_empty());
        assert!(service.data_status().contains_key("example.com"));
    }

    #[test]
    fn test_mirror_only_written_on_change() {
        let (service, _) = build_service(&[]);
        let mirror = Arc::new(RecordingMirror::default());
        let service = service.with_mirror(mirror.clone());

        service.add_host("b.example");
        service.add_host("a.example");
        service.add_host("a.example");
        service.remove_host("missing.example");
        service.remove_host("b.example");

        let saved = mirror.saved.lock().unwrap();
        assert_eq!(saved.len(), 3);
        assert_eq!(saved[1], vec!["b.example", "a.example"]);
        assert_eq!(saved[2], vec!["a.example"]);
    }

    #[tokio::test]
    async fn test_monitor_loop_feeds_queries() {
        let (service, store) = build_service(&["example.com"]);
        let monitor = service.monitor_loop();

        monitor.tick().await;

        let latest = store.latest("example.com").unwrap();
        assert_eq!(latest.latency(), Some(12.0));
        assert_eq!(service.snapshot(false).data["example.com"].len(), 1);
    }

    #[tokio::test]
    async fn test_diagnose_reports_each_method() {
        let (service, _) = build_service(&["127.0.0.1"]);

        let all = service.diagnose_all().await;
        let report = &all["127.0.0.1"];
        assert_eq!(report["dns_test"], "OK - Resolved to 127.0.0.1");
        assert!(report["http_test"].starts_with("FAILED - protocol error"));
        assert_eq!(report["tcp_test"], "OK - 12.00ms");
    }

    #[tokio::test]
    async fn test_diagnose_all_is_bounded() {
        let hosts = ["127.0.0.1", "127.0.0.2", "127.0.0.3", "127.0.0.4", "127.0.0.5"];
        let store = Arc::new(MemoryStore::with_hosts(1440, hosts));
        let method = Arc::new(CountingMethod::default());
        let prober = Arc::new(Prober::new(vec![method.clone() as Arc<dyn ProbeMethod>]));
        let service = MonitoringService::new(store, prober, Duration::from_secs(60)).with_max_concurrency(2);

        let all = service.diagnose_all().await;
        assert_eq!(all.len(), hosts.len());
        assert!(all["127.0.0.3"]["counting_test"].starts_with("FAILED"));
        assert!(method.peak() <= 2);
    }
}
