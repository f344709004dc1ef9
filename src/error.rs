//! Top-level error type for harness operations.
//!
//! Step actions return `Result<bool, HarnessError>`: `Ok(false)` is an
//! ordinary step failure, `Err` is an unexpected one. The recorder swallows
//! both into the step record; nothing below the suite driver propagates.

use crate::automation::types::AutomationError;
use crate::launcher::LaunchError;
use crate::perf::PerfError;
use crate::probe::ProbeError;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error types for harness operations
#[derive(Debug)]
pub enum HarnessError {
    /// Accessibility tree boundary failure
    Automation(AutomationError),
    /// Application launch failure
    Launch(LaunchError),
    /// Network probe failure
    Probe(ProbeError),
    /// Resource sampling failure
    Perf(PerfError),
    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for HarnessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarnessError::Automation(err) => write!(f, "Automation error: {}", err),
            HarnessError::Launch(err) => write!(f, "Launch error: {}", err),
            HarnessError::Probe(err) => write!(f, "Probe error: {}", err),
            HarnessError::Perf(err) => write!(f, "Resource check error: {}", err),
            HarnessError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Automation(err) => Some(err),
            HarnessError::Launch(err) => Some(err),
            HarnessError::Probe(err) => Some(err),
            HarnessError::Perf(err) => Some(err),
            HarnessError::Io(err) => Some(err),
        }
    }
}

impl From<AutomationError> for HarnessError {
    fn from(err: AutomationError) -> Self {
        HarnessError::Automation(err)
    }
}

impl From<LaunchError> for HarnessError {
    fn from(err: LaunchError) -> Self {
        HarnessError::Launch(err)
    }
}

impl From<ProbeError> for HarnessError {
    fn from(err: ProbeError) -> Self {
        HarnessError::Probe(err)
    }
}

impl From<PerfError> for HarnessError {
    fn from(err: PerfError) -> Self {
        HarnessError::Perf(err)
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err)
    }
}
