use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::{timeout, Instant};

use super::average_attempts;
use crate::domain::ProbeFailure;
use crate::ports::ProbeMethod;

/// Raw TCP connect to a fixed port; only the handshake is timed
pub struct TcpProbe {
    port: u16,
    attempts: usize,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(port: u16, attempts: usize, timeout: Duration) -> Self {
        Self {
            port,
            attempts,
            timeout,
        }
    }

    /// Resolve `host` to the first address for the probe port
    pub async fn resolve(&self, host: &str) -> Result<SocketAddr, ProbeFailure> {
        let mut addrs = lookup_host((host, self.port))
            .await
            .map_err(|e| ProbeFailure::UnresolvedHost(format!("{}: {}", host, e)))?;

        addrs
            .next()
            .ok_or_else(|| ProbeFailure::UnresolvedHost(format!("{}: no addresses", host)))
    }

    async fn connect_once(addr: SocketAddr) -> Result<Duration, ProbeFailure> {
        let start = Instant::now();
        let stream = TcpStream::connect(addr).await.map_err(|e| match e.kind() {
            ErrorKind::TimedOut => ProbeFailure::Timeout,
            _ => ProbeFailure::ConnectionRefused(format!("{}: {}", addr, e)),
        })?;
        let rtt = start.elapsed();
        drop(stream);
        Ok(rtt)
    }
}

#[async_trait]
impl ProbeMethod for TcpProbe {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn measure(&self, host: &str) -> Result<Duration, ProbeFailure> {
        let started = Instant::now();
        let addr = timeout(self.timeout, self.resolve(host))
            .await
            .map_err(|_| ProbeFailure::Timeout)??;

        let remaining = self.timeout.saturating_sub(started.elapsed());
        average_attempts(self.attempts, remaining, move || Self::connect_once(addr)).await
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_connect_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((_socket, _)) = listener.accept().await {}
        });

        let probe = TcpProbe::new(port, 3, Duration::from_secs(2));
        let rtt = probe.measure("127.0.0.1").await.unwrap();
        assert!(rtt < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_closed_port_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = TcpProbe::new(port, 2, Duration::from_secs(2));
        let failure = probe.measure("127.0.0.1").await.unwrap_err();
        assert!(matches!(failure, ProbeFailure::ConnectionRefused(_)));
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let probe = TcpProbe::new(443, 1, Duration::from_secs(3));
        let result = probe.measure("does-not-exist.invalid").await;
        assert!(matches!(
            result,
            Err(ProbeFailure::UnresolvedHost(_)) | Err(ProbeFailure::Timeout)
        ));
    }
}
