//! Suite execution: launch, run, aggregate.
//!
//! Each scenario gets a fresh launch of the client (launching over a
//! running instance is harmless; the matcher just finds the existing
//! window). A launch timeout fails that scenario's case and the suite moves
//! on; every other scenario failure is already contained in its case.
//!
//! Process cleanup is owned by [`CleanupGuard`], which tears the client
//! down when dropped, whatever path the run took to get there.

use std::time::Duration;

use crate::automation::tree::UiTree;
use crate::config::Config;
use crate::launcher::{self, LaunchOptions, ProcessControl, WindowMatcher};
use crate::report::{Run, TestCase};
use crate::scenario::{ScenarioContext, ScenarioSpec, run_scenario};

/// Run every scenario against the given tree and process boundary.
///
/// The returned [`Run`] is finalized; its `passed` flag is the AND over all
/// case flags.
pub fn execute_suite(
    cfg: &Config,
    tree: &dyn UiTree,
    procs: &mut dyn ProcessControl,
    scenarios: &[ScenarioSpec],
) -> Run {
    let mut run = Run::new(&cfg.report.suite_name);
    let matcher = startup_matcher(cfg);
    let launch_opts = LaunchOptions {
        max_wait: cfg.timing.launch_wait,
        max_retries: cfg.timing.launch_retries,
        ..LaunchOptions::default()
    };

    for (index, spec) in scenarios.iter().enumerate() {
        log::info!("═══ Test {}: {} ═══", index + 1, spec.name);

        let case = match launcher::launch(
            procs,
            tree,
            &cfg.app.executable,
            &matcher,
            &launch_opts,
        ) {
            Ok(_window) => {
                // The handle is only proof of launch; scenarios re-resolve
                // their windows from the desktop.
                let ctx = ScenarioContext {
                    tree,
                    procs: &*procs,
                };
                run_scenario(&ctx, spec)
            }
            Err(err) => {
                log::error!("Launch failed for '{}': {}", spec.name, err);
                let mut case = TestCase::new(&spec.name);
                case.finish_with_error(&err.to_string());
                case
            }
        };

        log::info!(
            "Result: {}",
            if case.passed { "PASS ✓" } else { "FAIL ✗" }
        );
        run.push_case(case);
    }

    run.finalize();
    run
}

fn startup_matcher(cfg: &Config) -> WindowMatcher {
    if cfg.app.quick_access_window_id.is_empty() {
        WindowMatcher::by_name(&cfg.app.main_window_name)
    } else {
        WindowMatcher::by_id(&cfg.app.quick_access_window_id)
    }
}

/// Tears the client down on drop.
///
/// Owns its process-control instance so it works on every exit path,
/// including a panic unwinding past the suite.
pub struct CleanupGuard<P: ProcessControl> {
    procs: P,
    profile: crate::config::AppProfile,
    exit_wait: Duration,
}

impl<P: ProcessControl> CleanupGuard<P> {
    pub fn new(procs: P, profile: crate::config::AppProfile, exit_wait: Duration) -> Self {
        Self {
            procs,
            profile,
            exit_wait,
        }
    }
}

impl<P: ProcessControl> Drop for CleanupGuard<P> {
    fn drop(&mut self) {
        launcher::ensure_closed(&self.procs, &self.profile, self.exit_wait);

        let leftovers: usize = self
            .profile
            .process_names
            .iter()
            .map(|name| self.procs.pids_by_name(name).len())
            .sum();
        if leftovers > 0 {
            if let Some(command) = &self.profile.uninstall_command {
                launcher::uninstall_fallback(command);
            } else {
                log::error!("{} client process(es) survived cleanup", leftovers);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::sim::{SimulatedProcesses, SimulatedTree};
    use crate::scenario::{StepAction, StepSpec};

    fn fast_config() -> Config {
        let mut cfg = Config::defaults();
        cfg.timing.launch_wait = Duration::from_millis(300);
        cfg.timing.launch_retries = 1;
        cfg.timing.window_wait = Duration::from_millis(300);
        cfg
    }

    fn settle_scenario(name: &str, passes: bool) -> ScenarioSpec {
        let action = if passes {
            StepAction::Settle {
                delay: Duration::ZERO,
            }
        } else {
            StepAction::ClickButton {
                window_id: "NoSuchWindow".to_string(),
                button_id: "NoSuchButton".to_string(),
            }
        };
        ScenarioSpec {
            name: name.to_string(),
            steps: vec![StepSpec::new("only step", action, "ok", "bad")],
        }
    }

    #[test]
    fn test_suite_aggregates_mixed_results() {
        let cfg = fast_config();
        let sim = SimulatedTree::new();
        let quick_access = sim.add_hidden_window(&cfg.app.quick_access_window_id, "Quick Access");
        let mut procs = SimulatedProcesses::new(sim.clone(), quick_access);

        let scenarios = vec![settle_scenario("green", true), settle_scenario("red", false)];
        let run = execute_suite(&cfg, &sim, &mut procs, &scenarios);

        assert_eq!(run.test_cases.len(), 2);
        assert!(run.test_cases[0].passed);
        assert!(!run.test_cases[1].passed);
        assert!(!run.passed);
        assert_eq!(run.passed_count(), 1);
    }

    #[test]
    fn test_launch_failure_fails_case_but_not_suite_flow() {
        let cfg = fast_config();
        let sim = SimulatedTree::new();
        // The startup window can never appear.
        let unreachable = sim.add_hidden_window("SomethingElse", "Other");
        let mut procs =
            SimulatedProcesses::new(sim.clone(), unreachable).succeed_on_attempt(u32::MAX);

        let scenarios = vec![settle_scenario("first", true), settle_scenario("second", true)];
        let run = execute_suite(&cfg, &sim, &mut procs, &scenarios);

        // Both scenarios got a case, both failed on launch, suite completed.
        assert_eq!(run.test_cases.len(), 2);
        assert!(run.test_cases.iter().all(|c| !c.passed));
        assert!(run.test_cases.iter().all(|c| c.error.is_some()));
        assert!(!run.passed);
    }

    #[test]
    fn test_cleanup_guard_closes_processes_on_drop() {
        let cfg = Config::defaults();
        let sim = SimulatedTree::new();
        let window = sim.add_window(&cfg.app.quick_access_window_id, "Quick Access");
        let procs = SimulatedProcesses::new(sim.clone(), window);

        assert!(!procs.pids_by_name("Perimeter81").is_empty());
        {
            let _guard = CleanupGuard::new(
                procs.clone(),
                cfg.app.clone(),
                Duration::from_millis(50),
            );
        }
        assert!(procs.pids_by_name("Perimeter81").is_empty());
    }
}
