//! Run, test-case and step records.
//!
//! One rule holds everything together: `passed` flags are assigned exactly
//! once. A `Step` gets its flag when `execute_step` records it, a `TestCase`
//! in `finish`, a `Run` in `finalize` (as the AND over its cases). Steps are
//! append-only and owned by exactly one case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// One recorded action inside a test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// What the step did
    pub name: String,

    /// When the action started
    pub start_time: DateTime<Utc>,

    /// When the action finished (recorded on every exit path)
    pub end_time: DateTime<Utc>,

    /// Whether the action succeeded
    pub passed: bool,

    /// Free-text detail; on error, the error message is appended
    pub detail: String,
}

impl Step {
    /// Wall-clock duration of the step
    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }
}

/// One scenario invocation's record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Scenario name
    pub name: String,

    /// When the scenario started
    pub start_time: DateTime<Utc>,

    /// When the scenario finished
    pub end_time: Option<DateTime<Utc>>,

    /// Whether every attempted step passed; assigned once in [`finish`](Self::finish)
    pub passed: bool,

    /// Ordered, append-only step log
    pub steps: Vec<Step>,

    /// Error that aborted the scenario outside any step, if any
    pub error: Option<String>,
}

impl TestCase {
    /// Start recording a scenario
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start_time: Utc::now(),
            end_time: None,
            passed: false,
            steps: Vec::new(),
            error: None,
        }
    }

    /// Execute one named action and record it, whatever happens.
    ///
    /// Exactly one step is appended per call: `Ok(true)` records a pass with
    /// `success_detail`, `Ok(false)` a failure with `failure_detail`, and
    /// `Err` a failure with the error message appended to `failure_detail`.
    /// The caller decides whether a `false` return short-circuits the rest
    /// of the scenario.
    pub fn execute_step<F>(
        &mut self,
        name: &str,
        action: F,
        success_detail: &str,
        failure_detail: &str,
    ) -> bool
    where
        F: FnOnce() -> Result<bool, HarnessError>,
    {
        let start_time = Utc::now();
        log::info!("Step: {}", name);

        let (passed, detail) = match action() {
            Ok(true) => (true, success_detail.to_string()),
            Ok(false) => (false, failure_detail.to_string()),
            Err(err) => (false, format!("{} ({})", failure_detail, err)),
        };

        if passed {
            log::info!("  PASS: {}", name);
        } else {
            log::warn!("  FAIL: {} - {}", name, detail);
        }

        self.steps.push(Step {
            name: name.to_string(),
            start_time,
            end_time: Utc::now(),
            passed,
            detail,
        });
        passed
    }

    /// Close the record; the single assignment point for `passed`.
    pub fn finish(&mut self, passed: bool) {
        self.end_time = Some(Utc::now());
        self.passed = passed;
    }

    /// Close the record with an error that occurred outside any step.
    pub fn finish_with_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.finish(false);
    }

    /// Wall-clock duration; zero until finished
    pub fn duration(&self) -> chrono::Duration {
        self.end_time.unwrap_or(self.start_time) - self.start_time
    }
}

/// A full harness run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Suite name
    pub name: String,

    /// Machine the suite ran on
    pub host: String,

    /// When the run started
    pub start_time: DateTime<Utc>,

    /// When the run finished
    pub end_time: Option<DateTime<Utc>>,

    /// AND over all case flags; assigned once in [`finalize`](Self::finalize)
    pub passed: bool,

    /// Ordered case records, one per scenario invocation
    pub test_cases: Vec<TestCase>,

    /// Fatal error that cut the run short, if any
    pub error: Option<String>,
}

impl Run {
    /// Start recording a run
    pub fn new(name: &str) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            name: name.to_string(),
            host,
            start_time: Utc::now(),
            end_time: None,
            passed: false,
            test_cases: Vec::new(),
            error: None,
        }
    }

    /// Append a finished case
    pub fn push_case(&mut self, case: TestCase) {
        self.test_cases.push(case);
    }

    /// Close the run; the single assignment point for `passed`.
    pub fn finalize(&mut self) {
        self.end_time = Some(Utc::now());
        self.passed = !self.test_cases.is_empty() && self.test_cases.iter().all(|c| c.passed);
    }

    /// Number of passed cases
    pub fn passed_count(&self) -> usize {
        self.test_cases.iter().filter(|c| c.passed).count()
    }

    /// Wall-clock duration; zero until finalized
    pub fn duration(&self) -> chrono::Duration {
        self.end_time.unwrap_or(self.start_time) - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::types::AutomationError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_execute_step_records_pass() {
        let mut case = TestCase::new("case");
        let ok = case.execute_step("step", || Ok(true), "it worked", "it did not");

        assert!(ok);
        assert_eq!(case.steps.len(), 1);
        assert!(case.steps[0].passed);
        assert_eq!(case.steps[0].detail, "it worked");
    }

    #[test]
    fn test_execute_step_records_failure() {
        let mut case = TestCase::new("case");
        let ok = case.execute_step("step", || Ok(false), "it worked", "it did not");

        assert!(!ok);
        assert_eq!(case.steps.len(), 1);
        assert!(!case.steps[0].passed);
        assert_eq!(case.steps[0].detail, "it did not");
    }

    #[test]
    fn test_execute_step_records_error_message() {
        let mut case = TestCase::new("case");
        let ok = case.execute_step(
            "step",
            || Err(HarnessError::Automation(AutomationError::Backend("boom".to_string()))),
            "it worked",
            "it did not",
        );

        assert!(!ok);
        assert_eq!(case.steps.len(), 1);
        assert!(!case.steps[0].passed);
        assert!(case.steps[0].detail.starts_with("it did not"));
        assert!(case.steps[0].detail.contains("boom"));
    }

    #[test]
    fn test_execute_step_appends_exactly_one_step_each_call() {
        let mut case = TestCase::new("case");
        case.execute_step("a", || Ok(true), "", "");
        case.execute_step("b", || Ok(false), "", "");
        case.execute_step(
            "c",
            || Err(HarnessError::Io(std::io::Error::other("io"))),
            "",
            "",
        );

        assert_eq!(case.steps.len(), 3);
        let names: Vec<&str> = case.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_step_duration_non_negative() {
        let mut case = TestCase::new("case");
        case.execute_step("step", || Ok(true), "", "");
        assert!(case.steps[0].duration() >= chrono::Duration::zero());
    }

    #[test]
    fn test_case_duration_non_negative() {
        let mut case = TestCase::new("case");
        case.finish(true);
        assert!(case.duration() >= chrono::Duration::zero());
    }

    #[test]
    fn test_run_passed_is_and_over_cases() {
        let mut run = Run::new("suite");

        let mut passing = TestCase::new("passing");
        passing.finish(true);
        run.push_case(passing);

        let mut failing = TestCase::new("failing");
        failing.finish(false);
        run.push_case(failing);

        run.finalize();
        assert!(!run.passed);
        assert_eq!(run.passed_count(), 1);

        let mut all_green = Run::new("suite");
        let mut case = TestCase::new("only");
        case.finish(true);
        all_green.push_case(case);
        all_green.finalize();
        assert!(all_green.passed);
    }

    #[test]
    fn test_empty_run_does_not_pass() {
        let mut run = Run::new("suite");
        run.finalize();
        assert!(!run.passed);
    }

    #[test]
    fn test_run_round_trips_through_json() {
        let mut run = Run::new("suite");
        let mut case = TestCase::new("case");
        case.execute_step("step", || Ok(true), "ok", "bad");
        case.finish(true);
        run.push_case(case);
        run.finalize();

        let json = serde_json::to_string(&run).unwrap();
        let back: Run = serde_json::from_str(&json).unwrap();
        assert_eq!(back.test_cases.len(), 1);
        assert_eq!(back.test_cases[0].steps[0].name, "step");
        assert!(back.passed);
    }
}
