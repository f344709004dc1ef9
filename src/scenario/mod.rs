//! Scenario descriptors and the step runner.
//!
//! A scenario is data: an ordered list of named steps, each a [`StepAction`]
//! built from the application profile. The runner executes them through the
//! test-case recorder, stops at the first failing step, and returns the
//! finished [`TestCase`] with every attempted step preserved.
//!
//! Dialog steps register a compensating "dismiss if open" action when they
//! run. If the scenario aborts while any compensation is outstanding, the
//! runner executes them (newest first) before returning, so a half-open
//! confirmation dialog cannot sit on top of the next scenario's windows.

pub mod catalog;

use std::thread;
use std::time::{Duration, Instant};

use crate::automation::tree::{UiTree, find_first_descendant};
use crate::automation::types::{ControlKind, ElementQuery, ElementRef, NodeId};
use crate::error::HarnessError;
use crate::interact;
use crate::launcher::ProcessControl;
use crate::perf;
use crate::probe;
use crate::report::TestCase;

/// One UI interaction, wait or check.
///
/// Windows are always named by identifier and re-resolved from the desktop
/// at execution time; no action holds a handle across a sleep.
#[derive(Debug, Clone)]
pub enum StepAction {
    /// Find a window by id, then find and activate a button inside it
    ClickButton {
        window_id: String,
        button_id: String,
    },
    /// Wait for a window to appear on the desktop
    AwaitWindow {
        window_id: String,
        timeout: Duration,
    },
    /// Plain settle delay
    Settle { delay: Duration },
    /// Walk a control-kind path inside a window, then activate a button by id
    ClickNested {
        window_id: String,
        path: Vec<ControlKind>,
        button_id: String,
        settle: Duration,
    },
    /// Poll for a named button to appear along a control-kind path
    AwaitControl {
        window_id: String,
        path: Vec<ControlKind>,
        button_name: String,
        poll: Duration,
        timeout: Duration,
    },
    /// Verify the gateway blocks a URL
    Probe {
        url: String,
        block_header: String,
        timeout: Duration,
    },
    /// Wait for a confirmation dialog, registering a dismiss-on-abort action
    AwaitDialog {
        dialog_id: String,
        settle: Duration,
        timeout: Duration,
        cancel_button_id: Option<String>,
    },
    /// Activate the confirm button inside a dialog, clearing its compensation
    ClickDialogButton {
        dialog_id: String,
        button_id: String,
    },
    /// Find a window by display name and activate its close button
    CloseWindow {
        window_name: String,
        button_id: String,
        settle: Duration,
    },
    /// Check total CPU usage of the client's processes
    CheckCpu {
        process_name: String,
        max_percent: f64,
    },
    /// Check total resident memory of the client's processes
    CheckMemory {
        process_name: String,
        max_mb: f64,
    },
}

/// A named step with its report details
#[derive(Debug, Clone)]
pub struct StepSpec {
    /// Step name as shown in the report
    pub name: String,
    /// What to do
    pub action: StepAction,
    /// Detail recorded when the step passes
    pub success_detail: String,
    /// Detail recorded when the step fails
    pub failure_detail: String,
}

impl StepSpec {
    pub fn new(name: &str, action: StepAction, success_detail: &str, failure_detail: &str) -> Self {
        Self {
            name: name.to_string(),
            action,
            success_detail: success_detail.to_string(),
            failure_detail: failure_detail.to_string(),
        }
    }
}

/// An ordered user journey
#[derive(Debug, Clone)]
pub struct ScenarioSpec {
    /// Scenario name as shown in the report
    pub name: String,
    /// Steps, executed in order, gated on the previous step's success
    pub steps: Vec<StepSpec>,
}

/// Capabilities a scenario runs against
pub struct ScenarioContext<'a> {
    /// The accessibility tree
    pub tree: &'a dyn UiTree,
    /// The process boundary (resource checks)
    pub procs: &'a dyn ProcessControl,
}

/// A registered "dismiss this dialog if it is still open" action
#[derive(Debug, Clone)]
struct DialogDismissal {
    dialog_id: String,
    cancel_button_id: Option<String>,
}

impl DialogDismissal {
    fn dismiss(&self, tree: &dyn UiTree) {
        let Some(dialog) = interact::find_window(tree, &self.dialog_id) else {
            return;
        };
        log::warn!(
            "Dialog '{}' still open after scenario abort, dismissing",
            self.dialog_id
        );
        match &self.cancel_button_id {
            Some(cancel) => {
                if !interact::find_and_click_button(tree, dialog.0, cancel) {
                    log::warn!("Could not dismiss dialog '{}'", self.dialog_id);
                }
            }
            None => log::warn!(
                "No cancel control configured for dialog '{}', leaving it",
                self.dialog_id
            ),
        }
    }
}

/// Execute a scenario, recording every attempted step.
///
/// Stops at the first failing step. The returned case is finished: its
/// `passed` flag is set and outstanding dialog compensations have run.
pub fn run_scenario(ctx: &ScenarioContext<'_>, spec: &ScenarioSpec) -> TestCase {
    log::info!("Scenario: {}", spec.name);
    let mut case = TestCase::new(&spec.name);
    let mut dismissals: Vec<DialogDismissal> = Vec::new();
    let mut all_passed = true;

    for step in &spec.steps {
        let ok = case.execute_step(
            &step.name,
            || perform(ctx, &step.action, &mut dismissals),
            &step.success_detail,
            &step.failure_detail,
        );
        if !ok {
            all_passed = false;
            break;
        }
    }

    if !all_passed {
        for dismissal in dismissals.iter().rev() {
            dismissal.dismiss(ctx.tree);
        }
    }

    case.finish(all_passed);
    log::info!(
        "Scenario {}: {}",
        spec.name,
        if case.passed { "PASS" } else { "FAIL" }
    );
    case
}

fn perform(
    ctx: &ScenarioContext<'_>,
    action: &StepAction,
    dismissals: &mut Vec<DialogDismissal>,
) -> Result<bool, HarnessError> {
    let tree = ctx.tree;
    match action {
        StepAction::ClickButton {
            window_id,
            button_id,
        } => {
            let Some(window) = interact::find_window(tree, window_id) else {
                log::warn!("Could not find window '{}'", window_id);
                return Ok(false);
            };
            Ok(interact::find_and_click_button(tree, window.0, button_id))
        }

        StepAction::AwaitWindow { window_id, timeout } => {
            Ok(interact::wait_for_window(tree, window_id, *timeout).is_some())
        }

        StepAction::Settle { delay } => {
            thread::sleep(*delay);
            Ok(true)
        }

        StepAction::ClickNested {
            window_id,
            path,
            button_id,
            settle,
        } => {
            thread::sleep(*settle);
            let Some(window) = interact::find_window(tree, window_id) else {
                log::warn!("Could not find window '{}'", window_id);
                return Ok(false);
            };
            let Some(scope) = walk_path(tree, window.0, path) else {
                return Ok(false);
            };
            let Some(button) =
                find_first_descendant(tree, scope, &ElementQuery::button(button_id))
            else {
                log::warn!("Could not find button '{}' under nested scope", button_id);
                interact::dump_buttons(tree, scope);
                return Ok(false);
            };
            Ok(interact::try_activate(tree, ElementRef(button)))
        }

        StepAction::AwaitControl {
            window_id,
            path,
            button_name,
            poll,
            timeout,
        } => {
            let started = Instant::now();
            let deadline = started + *timeout;
            loop {
                // Fresh resolution every round: the window is rebuilt while
                // the client transitions state.
                if let Some(window) = interact::find_window(tree, window_id) {
                    if let Some(scope) = walk_path_quiet(tree, window.0, path) {
                        if find_first_descendant(
                            tree,
                            scope,
                            &ElementQuery::button_named(button_name),
                        )
                        .is_some()
                        {
                            log::info!(
                                "Control '{}' appeared after {:.1} seconds",
                                button_name,
                                started.elapsed().as_secs_f64()
                            );
                            return Ok(true);
                        }
                    }
                }
                let now = Instant::now();
                if now >= deadline {
                    log::warn!(
                        "Control '{}' did not appear within {:?}",
                        button_name,
                        timeout
                    );
                    return Ok(false);
                }
                thread::sleep((*poll).min(deadline - now));
            }
        }

        StepAction::Probe {
            url,
            block_header,
            timeout,
        } => Ok(probe::verify_blocked(url, block_header, *timeout)?),

        StepAction::AwaitDialog {
            dialog_id,
            settle,
            timeout,
            cancel_button_id,
        } => {
            // Register the compensation before waiting: a dialog that opens
            // just after the timeout still gets dismissed on abort.
            dismissals.push(DialogDismissal {
                dialog_id: dialog_id.clone(),
                cancel_button_id: cancel_button_id.clone(),
            });
            thread::sleep(*settle);
            Ok(interact::wait_for_window(tree, dialog_id, *timeout).is_some())
        }

        StepAction::ClickDialogButton {
            dialog_id,
            button_id,
        } => {
            let Some(dialog) = interact::find_window(tree, dialog_id) else {
                log::warn!("Dialog '{}' is gone", dialog_id);
                return Ok(false);
            };
            let clicked = interact::find_and_click_button(tree, dialog.0, button_id);
            if clicked {
                dismissals.retain(|d| d.dialog_id != *dialog_id);
            }
            Ok(clicked)
        }

        StepAction::CloseWindow {
            window_name,
            button_id,
            settle,
        } => {
            let Some(window) = interact::find_window_named(tree, window_name) else {
                log::warn!("Could not find window named '{}'", window_name);
                return Ok(false);
            };
            let closed = interact::find_and_click_button(tree, window.0, button_id);
            if closed {
                thread::sleep(*settle);
            }
            Ok(closed)
        }

        StepAction::CheckCpu {
            process_name,
            max_percent,
        } => {
            let (passed, details) = perf::verify_cpu(ctx.procs, process_name, *max_percent)?;
            log::info!("{}", details);
            Ok(passed)
        }

        StepAction::CheckMemory {
            process_name,
            max_mb,
        } => {
            let (passed, details) = perf::verify_memory(ctx.procs, process_name, *max_mb)?;
            log::info!("{}", details);
            Ok(passed)
        }
    }
}

fn walk_path(
    tree: &dyn UiTree,
    from: NodeId,
    path: &[ControlKind],
) -> Option<NodeId> {
    let mut node = from;
    for kind in path {
        match find_first_descendant(tree, node, &ElementQuery::of_kind(*kind)) {
            Some(next) => node = next,
            None => {
                log::warn!("Could not find {:?} element along the control path", kind);
                return None;
            }
        }
    }
    Some(node)
}

fn walk_path_quiet(
    tree: &dyn UiTree,
    from: NodeId,
    path: &[ControlKind],
) -> Option<NodeId> {
    let mut node = from;
    for kind in path {
        node = find_first_descendant(tree, node, &ElementQuery::of_kind(*kind))?;
    }
    Some(node)
}
