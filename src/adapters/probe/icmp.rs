use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use super::ping_parser::parse_ping_output;
use crate::domain::ProbeFailure;
use crate::ports::ProbeMethod;

const RESOLVE_ERRORS: [&str; 5] = [
    "unknown host",
    "name or service not known",
    "cannot resolve",
    "temporary failure in name resolution",
    "no address associated",
];

/// ICMP echo through the system `ping` binary (no raw socket privileges needed)
pub struct IcmpProbe {
    count: usize,
    timeout: Duration,
}

impl IcmpProbe {
    pub fn new(count: usize, timeout: Duration) -> Self {
        Self {
            count: count.max(1),
            timeout,
        }
    }

    /// Echo requests sent per run. `ping` spaces them one second apart, so
    /// the count shrinks until the last request leaves inside the timeout.
    fn ping_count(&self) -> usize {
        let whole_secs = self.timeout.as_millis().saturating_sub(1) / 1000 + 1;
        self.count.min(whole_secs as usize).max(1)
    }

    /// Seconds `ping` waits for each reply
    fn reply_wait_secs(&self) -> u64 {
        (self.timeout.as_secs() / self.ping_count() as u64).max(1)
    }

    fn command(&self, host: &str) -> Command {
        let mut cmd = Command::new("ping");
        cmd.arg("-c")
            .arg(self.ping_count().to_string())
            .arg("-W")
            .arg(self.reply_wait_secs().to_string())
            .arg(host)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ProbeMethod for IcmpProbe {
    fn name(&self) -> &'static str {
        "icmp"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn measure(&self, host: &str) -> Result<Duration, ProbeFailure> {
        if host.starts_with('-') {
            return Err(ProbeFailure::Protocol(format!("refusing to ping {:?}", host)));
        }

        let output = timeout(self.timeout, self.command(host).output())
            .await
            .map_err(|_| ProbeFailure::Timeout)?
            .map_err(|e| ProbeFailure::Protocol(format!("failed to run ping: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let lowered = stderr.to_lowercase();
            if RESOLVE_ERRORS.iter().any(|needle| lowered.contains(needle)) {
                return Err(ProbeFailure::UnresolvedHost(stderr));
            }
            // Exit code 1 means no reply arrived in time
            return match output.status.code() {
                Some(1) => Err(ProbeFailure::Timeout),
                _ => Err(ProbeFailure::Protocol(format!("ping exited with {}: {}", output.status, stderr))),
            };
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let avg_ms = parse_ping_output(&stdout).map_err(|e| ProbeFailure::Protocol(e.to_string()))?;
        Ok(Duration::from_secs_f64(avg_ms.max(0.0) / 1000.0))
    }
}
