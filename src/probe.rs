//! HTTP probe for verifying that the gateway blocks a known-bad URL.
//!
//! The probe issues a HEAD request through a `curl -sS -I` subprocess and
//! classifies the combined stdout/stderr. The gateway can refuse a request
//! three different ways: a 403 with its session header, a redirect to a
//! block page, or a DNS sinkhole that makes the name unresolvable. The last
//! one surfaces as a curl connection error, which is why a connection error
//! counts as blocked here. The verdict detail records which signal fired so
//! a report reader can tell a positive block from the heuristic.

use std::process::Command;
use std::time::Duration;

/// Result type for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors raised by the probe boundary
#[derive(Debug)]
pub enum ProbeError {
    /// The probe subprocess could not be started
    Spawn(std::io::Error),
    /// The response matched none of the known classification rules
    Ambiguous(String),
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Spawn(err) => write!(f, "Failed to run probe: {}", err),
            ProbeError::Ambiguous(summary) => {
                write!(f, "Ambiguous probe response, flag for manual review: {}", summary)
            }
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Spawn(err) => Some(err),
            ProbeError::Ambiguous(_) => None,
        }
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::Spawn(err)
    }
}

/// How a probe response was classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// The gateway refused the request (403, block header, or sinkholed)
    Blocked,
    /// The site answered normally; the gateway is not blocking
    Open,
    /// None of the known patterns matched
    Ambiguous,
}

/// Raw output of a probe request
#[derive(Debug, Clone)]
pub struct ProbeOutput {
    /// Response head (status line and headers)
    pub stdout: String,
    /// Transport-level errors, if any
    pub stderr: String,
}

/// Issue a HEAD request to `url`, bounded by `timeout`.
pub fn head_request(url: &str, timeout: Duration) -> ProbeResult<ProbeOutput> {
    log::info!("Probing {} (timeout: {:?})", url, timeout);
    let output = Command::new("curl")
        .args([
            "-s",
            "-S",
            "-I",
            url,
            "--max-time",
            &timeout.as_secs().max(1).to_string(),
        ])
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    log::debug!("Probe response:\n{}", stdout);
    if !stderr.trim().is_empty() {
        log::debug!("Probe stderr: {}", stderr.trim());
    }

    Ok(ProbeOutput { stdout, stderr })
}

/// Classify a probe response against the gateway's known behaviors.
///
/// Rules, in order:
/// 1. `403 Forbidden` or the blocking-proxy header present: blocked.
/// 2. `200 OK` (or an HTTP/1.1 200 status line): not blocked.
/// 3. A transport error or unresolvable host: blocked (DNS sinkhole).
/// 4. Anything else: ambiguous.
pub fn classify(stdout: &str, stderr: &str, block_header: &str) -> ProbeVerdict {
    if stdout.contains("403 Forbidden") || stdout.contains(block_header) {
        return ProbeVerdict::Blocked;
    }
    if stdout.contains("200 OK") || stdout.contains("HTTP/1.1 200") {
        return ProbeVerdict::Open;
    }
    if !stderr.trim().is_empty() || stdout.contains("Could not resolve host") {
        return ProbeVerdict::Blocked;
    }
    ProbeVerdict::Ambiguous
}

/// Probe `url` and decide whether it is blocked.
///
/// `Ok(true)` means blocked, `Ok(false)` means reachable; an ambiguous
/// response is an error so the enclosing step records it for follow-up.
pub fn verify_blocked(url: &str, block_header: &str, timeout: Duration) -> ProbeResult<bool> {
    let output = head_request(url, timeout)?;
    match classify(&output.stdout, &output.stderr, block_header) {
        ProbeVerdict::Blocked => {
            if output.stdout.contains("403 Forbidden") || output.stdout.contains(block_header) {
                log::info!("BLOCKED: gateway refused the request (403/block header)");
            } else {
                log::info!("BLOCKED: connection error (gateway likely sinkholed the host)");
            }
            Ok(true)
        }
        ProbeVerdict::Open => {
            log::warn!("NOT BLOCKED: received 200 OK, site is reachable");
            Ok(false)
        }
        ProbeVerdict::Ambiguous => {
            let summary = summarize(&output.stdout);
            log::warn!("Unexpected probe response: {}", summary);
            Err(ProbeError::Ambiguous(summary))
        }
    }
}

fn summarize(stdout: &str) -> String {
    let first_line = stdout.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        "empty response with no transport error".to_string()
    } else {
        first_line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BLOCK_HEADER;

    #[test]
    fn test_classify_403_is_blocked() {
        let verdict = classify("HTTP/1.1 403 Forbidden\r\n", "", DEFAULT_BLOCK_HEADER);
        assert_eq!(verdict, ProbeVerdict::Blocked);
    }

    #[test]
    fn test_classify_block_header_is_blocked() {
        let stdout = "HTTP/2 302\r\nFirefly-Pep-Sessionid: abc123\r\n";
        let verdict = classify(stdout, "", DEFAULT_BLOCK_HEADER);
        assert_eq!(verdict, ProbeVerdict::Blocked);
    }

    #[test]
    fn test_classify_200_is_open() {
        let verdict = classify("HTTP/1.1 200 OK\r\n", "", DEFAULT_BLOCK_HEADER);
        assert_eq!(verdict, ProbeVerdict::Open);
    }

    #[test]
    fn test_classify_connection_error_is_blocked() {
        let verdict = classify("", "curl: (6) Could not resolve host: www.888.com", DEFAULT_BLOCK_HEADER);
        assert_eq!(verdict, ProbeVerdict::Blocked);
    }

    #[test]
    fn test_classify_nothing_is_ambiguous() {
        let verdict = classify("HTTP/1.1 503 Service Unavailable\r\n", "", DEFAULT_BLOCK_HEADER);
        assert_eq!(verdict, ProbeVerdict::Ambiguous);
    }

    #[test]
    fn test_classify_empty_everything_is_ambiguous() {
        let verdict = classify("", "", DEFAULT_BLOCK_HEADER);
        assert_eq!(verdict, ProbeVerdict::Ambiguous);
    }

    #[test]
    fn test_classify_403_beats_stderr() {
        // A 403 with noise on stderr is still a positive block signal.
        let verdict = classify(
            "HTTP/1.1 403 Forbidden\r\n",
            "curl: (anything)",
            DEFAULT_BLOCK_HEADER,
        );
        assert_eq!(verdict, ProbeVerdict::Blocked);
    }
}
