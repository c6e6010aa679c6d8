use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

use super::Prober;
use crate::ports::LatencyStore;

/// Summary of one pass over the registered hosts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub hosts: usize,
    pub written: usize,
    pub ok: usize,
    /// Mean latency of the ok samples, in milliseconds
    pub mean_latency: Option<f64>,
    pub elapsed: Duration,
}

/// Background task that probes every registered host once per interval
pub struct MonitorLoop {
    store: Arc<dyn LatencyStore>,
    prober: Arc<Prober>,
    interval: Duration,
    max_concurrency: usize,
}

impl MonitorLoop {
    pub fn new(
        store: Arc<dyn LatencyStore>,
        prober: Arc<Prober>,
        interval: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            prober,
            interval,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Probe a snapshot of the registry and record the results in one step.
    ///
    /// Probes run outside the store lock, at most `max_concurrency` at a time.
    pub async fn tick(&self) -> TickReport {
        let started = Instant::now();
        let hosts = self.store.hosts();

        let results: Vec<_> = stream::iter(hosts.iter().cloned())
            .map(|host| {
                let prober = Arc::clone(&self.prober);
                async move {
                    let measurement = prober.measure(&host).await;
                    (host, measurement)
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let ok = results.iter().filter(|(_, m)| m.status().is_ok()).count();
        let latencies: Vec<f64> = results.iter().filter_map(|(_, m)| m.latency()).collect();
        let mean_latency =
            (!latencies.is_empty()).then(|| latencies.iter().sum::<f64>() / latencies.len() as f64);
        let written = self.store.record_tick(results);

        TickReport {
            hosts: hosts.len(),
            written,
            ok,
            mean_latency,
            elapsed: started.elapsed(),
        }
    }

    /// Tick until `shutdown` flips to true or its sender goes away.
    ///
    /// Ticks are scheduled from the start of the previous tick. An overrunning
    /// tick is followed immediately by the next one. A tick interrupted by
    /// shutdown writes nothing.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Monitor loop running: interval {:?}, up to {} concurrent probes",
            self.interval, self.max_concurrency
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let tick_start = Instant::now();
            tokio::select! {
                report = self.tick() => {
                    let mean = report
                        .mean_latency
                        .map(|ms| format!("{:.2}ms", ms))
                        .unwrap_or_else(|| "n/a".to_string());
                    info!(
                        "Check complete: {}/{} hosts ok, mean {}, {} recorded in {:?}",
                        report.ok, report.hosts, mean, report.written, report.elapsed
                    );
                }
                _ = shutdown.changed() => {
                    info!("Shutdown requested, abandoning in-flight probes");
                    break;
                }
            }

            let Some(next_tick) = tick_start.checked_add(self.interval) else {
                warn!("Interval {:?} is beyond the clock range, no further ticks", self.interval);
                let _ = shutdown.changed().await;
                break;
            };
            if Instant::now() >= next_tick {
                warn!("Tick overran the {:?} interval, starting next tick now", self.interval);
                continue;
            }

            tokio::select! {
                _ = sleep_until(next_tick) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Monitor loop stopped");
    }
}
