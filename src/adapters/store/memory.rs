use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::domain::{HostSeries, Measurement};
use crate::ports::{LatencySnapshot, LatencyStore, SeriesStatus};

#[derive(Debug, Default)]
struct Inner {
    hosts: Vec<String>,
    series: HashMap<String, HostSeries>,
}

impl Inner {
    fn is_registered(&self, host: &str) -> bool {
        self.hosts.iter().any(|h| h == host)
    }

    fn push(&mut self, host: &str, measurement: Measurement, capacity: usize) {
        self.series
            .entry(host.to_string())
            .or_insert_with(|| HostSeries::new(capacity))
            .push(measurement);
    }
}

/// In-memory host registry and ring-buffer series behind one coarse lock
pub struct MemoryStore {
    inner: RwLock<Inner>,
    max_size: usize,
}

impl MemoryStore {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_size: max_size.max(1),
        }
    }

    /// Store seeded with an initial host list; duplicates are ignored
    pub fn with_hosts<I, S>(max_size: usize, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let store = Self::new(max_size);
        for host in hosts {
            store.add_host(host.as_ref());
        }
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LatencyStore for MemoryStore {
    fn capacity(&self) -> usize {
        self.max_size
    }

    fn add_host(&self, host: &str) -> bool {
        let mut inner = self.write();
        if inner.is_registered(host) {
            return false;
        }
        inner.hosts.push(host.to_string());
        true
    }

    fn remove_host(&self, host: &str) -> bool {
        let mut inner = self.write();
        let before = inner.hosts.len();
        inner.hosts.retain(|h| h != host);
        inner.hosts.len() != before
    }

    fn hosts(&self) -> Vec<String> {
        self.read().hosts.clone()
    }

    #[cfg(test)]
    fn append(&self, host: &str, measurement: Measurement) {
        self.write().push(host, measurement, self.max_size);
    }

    fn record_tick(&self, results: Vec<(String, Measurement)>) -> usize {
        let mut inner = self.write();
        let mut written = 0;

        for (host, measurement) in results {
            if !inner.is_registered(&host) {
                debug!("Dropping result for {}: removed during tick", host);
                continue;
            }
            inner.push(&host, measurement, self.max_size);
            written += 1;
        }

        written
    }

    fn series(&self, host: &str) -> Vec<Measurement> {
        self.read()
            .series
            .get(host)
            .map(HostSeries::to_vec)
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn latest(&self, host: &str) -> Option<Measurement> {
        self.read().series.get(host).and_then(|s| s.latest().copied())
    }

    fn snapshot(&self, include_removed: bool) -> LatencySnapshot {
        let inner = self.read();

        let mut data: BTreeMap<String, Vec<Measurement>> = inner
            .hosts
            .iter()
            .map(|host| {
                let series = inner.series.get(host).map(HostSeries::to_vec).unwrap_or_default();
                (host.clone(), series)
            })
            .collect();

        if include_removed {
            for (host, series) in &inner.series {
                data.entry(host.clone()).or_insert_with(|| series.to_vec());
            }
        }

        LatencySnapshot {
            hosts: inner.hosts.clone(),
            data,
        }
    }

    fn latest_per_host(&self) -> Vec<(String, Option<Measurement>)> {
        let inner = self.read();
        inner
            .hosts
            .iter()
            .map(|host| {
                let latest = inner.series.get(host).and_then(|s| s.latest().copied());
                (host.clone(), latest)
            })
            .collect()
    }

    fn data_status(&self) -> BTreeMap<String, SeriesStatus> {
        self.read()
            .series
            .iter()
            .map(|(host, series)| {
                (
                    host.clone(),
                    SeriesStatus {
                        data_points: series.len(),
                        latest: series.latest().copied(),
                    },
                )
            })
            .collect()
    }
}
