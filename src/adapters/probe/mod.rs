mod http;
mod icmp;
mod ping_parser;
mod tcp;

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::ProbeFailure;

pub use http::HttpProbe;
pub use icmp::IcmpProbe;
pub use tcp::TcpProbe;

/// Run up to `attempts` tries within `budget` and average the successful ones.
///
/// The method succeeds if any attempt succeeds; otherwise the last failure is
/// returned. Running out of budget counts as a timeout.
async fn average_attempts<F, Fut>(
    attempts: usize,
    budget: Duration,
    mut attempt: F,
) -> Result<Duration, ProbeFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Duration, ProbeFailure>>,
{
    let deadline = Instant::now() + budget;
    let mut successes: Vec<Duration> = Vec::new();
    let mut last_failure = ProbeFailure::Timeout;

    for _ in 0..attempts.max(1) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, attempt()).await {
            Ok(Ok(rtt)) => successes.push(rtt),
            Ok(Err(failure)) => last_failure = failure,
            Err(_) => {
                last_failure = ProbeFailure::Timeout;
                break;
            }
        }
    }

    if successes.is_empty() {
        return Err(last_failure);
    }

    let total: Duration = successes.iter().sum();
    Ok(total / successes.len() as u32)
}

/// Flatten an error and its sources into one line
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
