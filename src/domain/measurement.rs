use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Outcome classification of a single measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Ok,
    Timeout,
    Error,
    Unreachable,
}

impl ProbeStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Collapse the failures of an exhausted fallback chain into one status.
    ///
    /// A chain where every method failed at the protocol level is an `error`;
    /// anything that looks like the network not getting through is `unreachable`.
    pub fn from_failures(failures: &[ProbeFailure]) -> Self {
        if !failures.is_empty() && failures.iter().all(ProbeFailure::is_protocol) {
            Self::Error
        } else {
            Self::Unreachable
        }
    }
}

/// Why a single probe method failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("timed out")]
    Timeout,

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unresolved host: {0}")]
    UnresolvedHost(String),
}

impl ProbeFailure {
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

/// One latency sample for a host.
///
/// Fields are private so a latency can only exist alongside an `ok` status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    timestamp: DateTime<Utc>,
    latency: Option<f64>, // milliseconds
    status: ProbeStatus,
}

impl Measurement {
    pub fn ok(timestamp: DateTime<Utc>, latency_ms: f64) -> Self {
        Self {
            timestamp,
            latency: Some(latency_ms),
            status: ProbeStatus::Ok,
        }
    }

    /// A failed sample. Passing `ProbeStatus::Ok` is coerced to `Error`
    /// because an ok sample without a latency is meaningless.
    pub fn failed(timestamp: DateTime<Utc>, status: ProbeStatus) -> Self {
        let status = if status.is_ok() { ProbeStatus::Error } else { status };
        Self {
            timestamp,
            latency: None,
            status,
        }
    }

    #[cfg(test)]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn latency(&self) -> Option<f64> {
        self.latency
    }

    pub fn status(&self) -> ProbeStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_never_carries_latency() {
        let m = Measurement::failed(Utc::now(), ProbeStatus::Ok);
        assert_eq!(m.status(), ProbeStatus::Error);
        assert_eq!(m.latency(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let value = serde_json::to_value(Measurement::ok(ts, 12.5)).unwrap();
        assert_eq!(value["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(value["latency"], 12.5);
        assert_eq!(value["status"], "ok");

        let value = serde_json::to_value(Measurement::failed(ts, ProbeStatus::Unreachable)).unwrap();
        assert!(value["latency"].is_null());
        assert_eq!(value["status"], "unreachable");
    }

    #[test]
    fn test_status_from_failures() {
        let protocol_only = vec![
            ProbeFailure::Protocol("bad status".into()),
            ProbeFailure::Protocol("garbled".into()),
        ];
        assert_eq!(ProbeStatus::from_failures(&protocol_only), ProbeStatus::Error);

        let mixed = vec![
            ProbeFailure::Timeout,
            ProbeFailure::ConnectionRefused("port 443".into()),
            ProbeFailure::Protocol("ping output".into()),
        ];
        assert_eq!(ProbeStatus::from_failures(&mixed), ProbeStatus::Unreachable);

        let all_timeouts = vec![ProbeFailure::Timeout; 3];
        assert_eq!(ProbeStatus::from_failures(&all_timeouts), ProbeStatus::Unreachable);
    }
}
