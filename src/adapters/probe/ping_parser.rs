use thiserror::Error;

#[derive(Debug, Error)]
pub enum PingParseError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No round-trip times in ping output")]
    NoSamples,
}

pub type PingParseResult<T> = Result<T, PingParseError>;

/// Average round-trip time in milliseconds from `ping` output.
///
/// Prefers the summary line (`rtt min/avg/max/mdev = a/b/c/d ms`), falling
/// back to the mean of the per-reply `time=` values.
pub fn parse_ping_output(content: &str) -> PingParseResult<f64> {
    if let Some(avg) = parse_summary(content)? {
        return Ok(avg);
    }

    let mut samples = Vec::new();
    for line in content.lines() {
        if let Some(rest) = line.split("time=").nth(1) {
            let value = rest
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .trim_end_matches("ms");
            let ms = value
                .parse::<f64>()
                .map_err(|e| PingParseError::Parse(format!("Invalid reply time {:?}: {}", value, e)))?;
            samples.push(ms);
        }
    }

    if samples.is_empty() {
        return Err(PingParseError::NoSamples);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

fn parse_summary(content: &str) -> PingParseResult<Option<f64>> {
    let Some(line) = content.lines().find(|l| l.contains("min/avg/max")) else {
        return Ok(None);
    };

    let values = line.rsplit('=').next().unwrap_or_default().trim();
    let parts: Vec<&str> = values.split('/').collect();
    if parts.len() < 3 {
        return Err(PingParseError::Parse(format!("Invalid summary line: {}", line)));
    }

    parts[1]
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|e| PingParseError::Parse(format!("Invalid avg: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iputils_summary() {
        let content = "\
PING example.com (93.184.216.34) 56(84) bytes of data.
64 bytes from 93.184.216.34: icmp_seq=1 ttl=56 time=11.2 ms
64 bytes from 93.184.216.34: icmp_seq=2 ttl=56 time=11.6 ms

--- example.com ping statistics ---
2 packets transmitted, 2 received, 0% packet loss, time 1001ms
rtt min/avg/max/mdev = 11.214/11.407/11.600/0.193 ms
";
        assert_eq!(parse_ping_output(content).unwrap(), 11.407);
    }

    #[test]
    fn test_parse_busybox_summary() {
        let content = "round-trip min/avg/max = 1.000/2.500/4.000 ms\n";
        assert_eq!(parse_ping_output(content).unwrap(), 2.5);
    }

    #[test]
    fn test_fallback_to_reply_times() {
        let content = "\
64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=2.0 ms
64 bytes from 10.0.0.1: icmp_seq=2 ttl=64 time=4.0 ms
";
        assert_eq!(parse_ping_output(content).unwrap(), 3.0);
    }

    #[test]
    fn test_no_replies() {
        let content = "3 packets transmitted, 0 received, 100% packet loss, time 2043ms\n";
        assert!(matches!(parse_ping_output(content), Err(PingParseError::NoSamples)));
    }
}
