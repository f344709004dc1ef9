//! Smoke-test harness for the Harmony SASE desktop client.
//!
//! This crate provides:
//! - Reliable application launch with exponential-backoff window polling
//! - Element location and interaction over an accessibility-tree capability
//! - Descriptor-driven scenarios with step-level recording
//! - An HTTP probe that verifies the gateway blocks a known-bad URL
//! - HTML/JSON report generation
//!
//! # Example
//!
//! ```rust,no_run
//! use sase_smoke::config::Config;
//! use sase_smoke::automation::SimulatedClient;
//! use sase_smoke::scenario::catalog;
//! use sase_smoke::suite::execute_suite;
//! use std::time::Duration;
//!
//! let cfg = Config::defaults();
//! let client = SimulatedClient::new(&cfg.app, Duration::from_secs(3));
//! let mut procs = client.processes();
//! let run = execute_suite(&cfg, &client.tree, &mut procs, &catalog::default_suite(&cfg, false));
//! println!("{}", sase_smoke::report::render(&run));
//! ```

pub mod automation;
pub mod config;
pub mod error;
pub mod interact;
pub mod launcher;
pub mod perf;
pub mod probe;
pub mod report;
pub mod scenario;
pub mod suite;

// Re-export error types
pub use error::{HarnessError, HarnessResult};

// Re-export the automation capability
pub use automation::{
    AutomationError, ControlKind, ElementQuery, ElementRef, NodeAttributes, NodeId,
    SimulatedClient, SimulatedProcesses, SimulatedTree, UiTree, WindowRef, native_tree,
};

// Re-export launch and process control
pub use launcher::{
    LaunchError, LaunchOptions, ProcessControl, SystemProcesses, WindowMatcher, ensure_closed,
    launch,
};

// Re-export report types
pub use report::{ReportWriter, Run, Step, TestCase, open_in_browser, render};

// Re-export scenario machinery
pub use scenario::{ScenarioContext, ScenarioSpec, StepAction, StepSpec, run_scenario};

// Re-export the suite driver
pub use suite::{CleanupGuard, execute_suite};
