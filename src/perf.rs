//! Resource-usage checks for the client's processes.
//!
//! Samples CPU and resident memory for every PID the process boundary
//! reports, via a `ps` subprocess, and compares the totals against
//! configured thresholds. The details string that threshold checks build is
//! shown verbatim in the report, pass or fail.

use crate::launcher::ProcessControl;

/// Result type for resource sampling
pub type PerfResult<T> = Result<T, PerfError>;

/// Errors raised while sampling process resources
#[derive(Debug)]
pub enum PerfError {
    /// No process with the configured name is running
    NoProcess(String),
    /// The sampling subprocess failed
    Io(std::io::Error),
    /// `ps` output did not parse
    Parse(String),
    /// Sampling is not implemented for this platform
    Unsupported,
}

impl std::fmt::Display for PerfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PerfError::NoProcess(name) => write!(f, "Process '{}' not found", name),
            PerfError::Io(err) => write!(f, "Failed to sample process: {}", err),
            PerfError::Parse(line) => write!(f, "Unparseable ps output: {}", line),
            PerfError::Unsupported => write!(f, "Resource sampling is not supported on this platform"),
        }
    }
}

impl std::error::Error for PerfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PerfError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PerfError {
    fn from(err: std::io::Error) -> Self {
        PerfError::Io(err)
    }
}

/// One process's resource usage at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSample {
    /// Process id
    pub pid: u32,
    /// CPU usage in percent
    pub cpu_percent: f64,
    /// Resident memory in MB
    pub memory_mb: f64,
}

/// Sample every running process with the given name.
pub fn measure(procs: &dyn ProcessControl, process_name: &str) -> PerfResult<Vec<ResourceSample>> {
    let pids = procs.pids_by_name(process_name);
    if pids.is_empty() {
        return Err(PerfError::NoProcess(process_name.to_string()));
    }
    pids.into_iter().map(sample).collect()
}

/// Sample a single PID.
#[cfg(unix)]
pub fn sample(pid: u32) -> PerfResult<ResourceSample> {
    let output = std::process::Command::new("ps")
        .args(["-o", "%cpu=,rss=", "-p", &pid.to_string()])
        .output()?;
    let text = String::from_utf8_lossy(&output.stdout);
    parse_ps_line(pid, text.trim())
}

/// Sample a single PID.
#[cfg(not(unix))]
pub fn sample(_pid: u32) -> PerfResult<ResourceSample> {
    Err(PerfError::Unsupported)
}

/// Parse one `ps -o %cpu=,rss=` line into a sample. RSS arrives in KB.
fn parse_ps_line(pid: u32, line: &str) -> PerfResult<ResourceSample> {
    let mut fields = line.split_whitespace();
    let cpu = fields
        .next()
        .and_then(|f| f.parse::<f64>().ok())
        .ok_or_else(|| PerfError::Parse(line.to_string()))?;
    let rss_kb = fields
        .next()
        .and_then(|f| f.parse::<f64>().ok())
        .ok_or_else(|| PerfError::Parse(line.to_string()))?;
    Ok(ResourceSample {
        pid,
        cpu_percent: cpu,
        memory_mb: rss_kb / 1024.0,
    })
}

/// Check total CPU usage against a threshold.
///
/// Returns the pass/fail flag and a details block for the report.
pub fn verify_cpu(
    procs: &dyn ProcessControl,
    process_name: &str,
    max_percent: f64,
) -> PerfResult<(bool, String)> {
    let samples = measure(procs, process_name)?;
    let total: f64 = samples.iter().map(|s| s.cpu_percent).sum();

    let mut details = String::from("CPU Usage Details:\n");
    for sample in &samples {
        details.push_str(&format!(
            "  Process ID {}: {:.2}%\n",
            sample.pid, sample.cpu_percent
        ));
    }
    details.push_str(&format!("Total CPU: {:.2}%\n", total));
    details.push_str(&format!("Threshold: {}%", max_percent));

    let passed = total <= max_percent;
    if passed {
        log::info!("CPU usage {:.2}% is below threshold of {}%", total, max_percent);
    } else {
        log::warn!("CPU usage {:.2}% exceeds threshold of {}%", total, max_percent);
    }
    Ok((passed, details))
}

/// Check total resident memory against a threshold.
pub fn verify_memory(
    procs: &dyn ProcessControl,
    process_name: &str,
    max_mb: f64,
) -> PerfResult<(bool, String)> {
    let samples = measure(procs, process_name)?;
    let total: f64 = samples.iter().map(|s| s.memory_mb).sum();

    let mut details = String::from("Memory Usage Details:\n");
    for sample in &samples {
        details.push_str(&format!(
            "  Process ID {}: {:.2} MB\n",
            sample.pid, sample.memory_mb
        ));
    }
    details.push_str(&format!("Total Memory: {:.2} MB\n", total));
    details.push_str(&format!("Threshold: {} MB", max_mb));

    let passed = total <= max_mb;
    if passed {
        log::info!("Memory usage {:.2} MB is below threshold of {} MB", total, max_mb);
    } else {
        log::warn!("Memory usage {:.2} MB exceeds threshold of {} MB", total, max_mb);
    }
    Ok((passed, details))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ps_line() {
        let sample = parse_ps_line(1234, " 2.5  51200").unwrap();
        assert_eq!(sample.pid, 1234);
        assert!((sample.cpu_percent - 2.5).abs() < f64::EPSILON);
        assert!((sample.memory_mb - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_ps_line_rejects_garbage() {
        assert!(parse_ps_line(1, "").is_err());
        assert!(parse_ps_line(1, "notanumber 123").is_err());
        assert!(parse_ps_line(1, "1.0").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_sample_own_process() {
        let sample = sample(std::process::id()).expect("own process should be sampleable");
        assert!(sample.cpu_percent >= 0.0);
        assert!(sample.memory_mb > 0.0);
    }
}
