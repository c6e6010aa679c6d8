use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use tokio::time::Instant;

use super::{average_attempts, error_chain};
use crate::domain::ProbeFailure;
use crate::ports::ProbeMethod;

/// Application-layer reachability check using HTTP HEAD
pub struct HttpProbe {
    client: Client,
    scheme: &'static str,
    attempts: usize,
    timeout: Duration,
}

impl HttpProbe {
    /// HTTPS is used when the monitored TCP port is 443, plain HTTP otherwise
    pub fn new(tcp_port: u16, attempts: usize, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            // Self-signed endpoints still count as reachable
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            scheme: if tcp_port == 443 { "https" } else { "http" },
            attempts,
            timeout,
        })
    }

    pub fn url_for(&self, host: &str) -> String {
        format!("{}://{}", self.scheme, host)
    }

    /// Single HEAD request; any 2xx or 3xx answer counts as reachable
    pub async fn head(&self, host: &str) -> Result<(Duration, StatusCode), ProbeFailure> {
        let start = Instant::now();
        let response = self
            .client
            .head(self.url_for(host))
            .send()
            .await
            .map_err(classify)?;
        let rtt = start.elapsed();

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok((rtt, status))
        } else {
            Err(ProbeFailure::Protocol(format!("HTTP status {}", status)))
        }
    }
}

fn classify(err: reqwest::Error) -> ProbeFailure {
    if err.is_timeout() {
        return ProbeFailure::Timeout;
    }

    let detail = error_chain(&err);
    if err.is_connect() {
        if detail.contains("dns error") || detail.contains("failed to lookup address") {
            ProbeFailure::UnresolvedHost(detail)
        } else {
            ProbeFailure::ConnectionRefused(detail)
        }
    } else {
        ProbeFailure::Protocol(detail)
    }
}

#[async_trait]
impl ProbeMethod for HttpProbe {
    fn name(&self) -> &'static str {
        "http"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn measure(&self, host: &str) -> Result<Duration, ProbeFailure> {
        average_attempts(self.attempts, self.timeout, move || async move {
            self.head(host).await.map(|(rtt, _)| rtt)
        })
        .await
    }
}
