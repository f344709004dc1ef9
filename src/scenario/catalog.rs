//! The scenario catalog.
//!
//! The three shipped journeys plus the optional resource check, all built
//! from the [`Config`] so a client update that renames an automation id or
//! changes a timing budget touches configuration, not scenario logic.

use crate::automation::types::ControlKind;
use crate::config::Config;

use super::{ScenarioSpec, StepAction, StepSpec};

/// Scenario name: connect the VPN and verify the gateway blocks
pub const SWG_BLOCK: &str = "SWG Block";

/// Scenario name: sign out and verify the gateway still blocks
pub const SWG_ALWAYS_ON: &str = "SWG Always On";

/// Scenario name: quit through the confirmation dialog
pub const QUIT_QUICK_ACCESS: &str = "Quit From Quick Access Window";

/// Scenario name: resource-usage thresholds
pub const RESOURCE_USAGE: &str = "Resource Usage";

/// Path from the main window down to the home page content
fn home_content_path() -> Vec<ControlKind> {
    vec![ControlKind::Tab, ControlKind::Custom]
}

/// Connect the VPN from the quick-access panel, verify a known-bad site is
/// blocked, then close the application window.
pub fn swg_block(cfg: &Config) -> ScenarioSpec {
    let app = &cfg.app;
    let timing = &cfg.timing;
    ScenarioSpec {
        name: SWG_BLOCK.to_string(),
        steps: vec![
            StepSpec::new(
                "Click Support button in Quick Access",
                StepAction::ClickButton {
                    window_id: app.quick_access_window_id.clone(),
                    button_id: app.support_button_id.clone(),
                },
                "Successfully clicked Support button",
                "Failed to find or click Support button",
            ),
            StepSpec::new(
                "Wait for Support screen to load",
                StepAction::AwaitWindow {
                    window_id: app.main_window_id.clone(),
                    timeout: timing.window_wait,
                },
                "Support screen loaded successfully",
                "Timeout waiting for Support screen",
            ),
            StepSpec::new(
                "Click Home button",
                StepAction::ClickButton {
                    window_id: app.main_window_id.clone(),
                    button_id: app.home_button_id.clone(),
                },
                "Home button clicked successfully",
                "Failed to find or click Home button",
            ),
            StepSpec::new(
                "Click Connect button to establish VPN",
                StepAction::ClickNested {
                    window_id: app.main_window_id.clone(),
                    path: home_content_path(),
                    button_id: app.connect_button_id.clone(),
                    settle: timing.home_settle,
                },
                "Connect button clicked successfully",
                "Failed to find or click Connect button",
            ),
            StepSpec::new(
                "Wait for VPN connection (button changes to Disconnect)",
                StepAction::AwaitControl {
                    window_id: app.main_window_id.clone(),
                    path: home_content_path(),
                    button_name: app.disconnect_button_name.clone(),
                    poll: timing.vpn_poll,
                    timeout: timing.vpn_wait,
                },
                "VPN connected successfully",
                "Timeout: Disconnect button did not appear",
            ),
            probe_step(cfg),
            StepSpec::new(
                "Click Close button to close app",
                StepAction::CloseWindow {
                    window_name: app.main_window_name.clone(),
                    button_id: app.close_button_id.clone(),
                    settle: timing.close_settle,
                },
                "Close button clicked successfully, app closed",
                "Failed to find or click Close button",
            ),
        ],
    }
}

/// Sign out through the confirmation dialog, then verify the gateway still
/// blocks while signed out (the always-on guarantee).
pub fn swg_always_on(cfg: &Config) -> ScenarioSpec {
    let app = &cfg.app;
    let timing = &cfg.timing;
    ScenarioSpec {
        name: SWG_ALWAYS_ON.to_string(),
        steps: vec![
            StepSpec::new(
                "Click Sign Out button in Quick Access",
                StepAction::ClickButton {
                    window_id: app.quick_access_window_id.clone(),
                    button_id: app.sign_out_button_id.clone(),
                },
                "Successfully clicked Sign Out button",
                "Failed to find or click Sign Out button",
            ),
            StepSpec::new(
                "Wait for Sign Out confirmation dialog",
                StepAction::AwaitDialog {
                    dialog_id: app.sign_out_dialog_id.clone(),
                    settle: timing.dialog_settle,
                    timeout: timing.window_wait,
                    cancel_button_id: Some(app.sign_out_cancel_button_id.clone()),
                },
                "Sign Out confirmation dialog appeared",
                "Sign Out confirmation dialog did not appear within timeout",
            ),
            StepSpec::new(
                "Click Sign Out in confirmation dialog",
                StepAction::ClickDialogButton {
                    dialog_id: app.sign_out_dialog_id.clone(),
                    button_id: app.sign_out_confirm_button_id.clone(),
                },
                "Successfully clicked Sign Out in confirmation dialog",
                "Failed to find or click Sign Out button in dialog",
            ),
            StepSpec::new(
                "Wait for sign-out to process",
                StepAction::Settle {
                    delay: timing.dialog_settle,
                },
                "Sign-out processed",
                "",
            ),
            probe_step(cfg),
        ],
    }
}

/// Quit the client from the quick-access panel through its confirmation
/// dialog.
pub fn quit_quick_access(cfg: &Config) -> ScenarioSpec {
    let app = &cfg.app;
    let timing = &cfg.timing;
    ScenarioSpec {
        name: QUIT_QUICK_ACCESS.to_string(),
        steps: vec![
            StepSpec::new(
                "Click Quit button in Quick Access",
                StepAction::ClickButton {
                    window_id: app.quick_access_window_id.clone(),
                    button_id: app.quit_button_id.clone(),
                },
                "Successfully clicked Quit button",
                "Failed to find or click Quit button",
            ),
            StepSpec::new(
                "Wait for confirmation dialog",
                StepAction::AwaitDialog {
                    dialog_id: app.quit_dialog_id.clone(),
                    settle: timing.dialog_settle,
                    timeout: timing.window_wait,
                    cancel_button_id: Some(app.quit_cancel_button_id.clone()),
                },
                "Confirmation dialog appeared",
                "Confirmation dialog did not appear within timeout",
            ),
            StepSpec::new(
                "Click Quit in confirmation dialog",
                StepAction::ClickDialogButton {
                    dialog_id: app.quit_dialog_id.clone(),
                    button_id: app.quit_confirm_button_id.clone(),
                },
                "Successfully clicked Quit in confirmation dialog",
                "Failed to find or click Quit button in dialog",
            ),
        ],
    }
}

/// Verify the client's steady-state CPU and memory stay under thresholds.
pub fn resource_usage(cfg: &Config) -> ScenarioSpec {
    let process_name = cfg
        .app
        .process_names
        .first()
        .cloned()
        .unwrap_or_default();
    ScenarioSpec {
        name: RESOURCE_USAGE.to_string(),
        steps: vec![
            StepSpec::new(
                "Wait for application to stabilize",
                StepAction::Settle {
                    delay: cfg.timing.stabilize,
                },
                "Application stabilized successfully",
                "",
            ),
            StepSpec::new(
                "Verify CPU usage is within threshold",
                StepAction::CheckCpu {
                    process_name: process_name.clone(),
                    max_percent: cfg.report.max_cpu_percent,
                },
                "CPU usage is below threshold",
                "CPU usage exceeds threshold",
            ),
            StepSpec::new(
                "Verify memory usage is within threshold",
                StepAction::CheckMemory {
                    process_name,
                    max_mb: cfg.report.max_memory_mb,
                },
                "Memory usage is below threshold",
                "Memory usage exceeds threshold",
            ),
        ],
    }
}

/// The block-verification probe step shared by several scenarios.
fn probe_step(cfg: &Config) -> StepSpec {
    StepSpec::new(
        "Verify website is blocked by VPN",
        StepAction::Probe {
            url: cfg.probe.url.clone(),
            block_header: cfg.probe.block_header.clone(),
            timeout: cfg.probe.timeout,
        },
        "Website is blocked by VPN",
        "Failed to verify website blocking",
    )
}

/// The scenarios a default run executes, in order.
pub fn default_suite(cfg: &Config, with_resource_checks: bool) -> Vec<ScenarioSpec> {
    let mut suite = vec![swg_block(cfg), swg_always_on(cfg), quit_quick_access(cfg)];
    if with_resource_checks {
        suite.push(resource_usage(cfg));
    }
    suite
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_suite_has_three_scenarios() {
        let cfg = Config::defaults();
        let suite = default_suite(&cfg, false);
        let names: Vec<&str> = suite.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![SWG_BLOCK, SWG_ALWAYS_ON, QUIT_QUICK_ACCESS]);
    }

    #[test]
    fn test_resource_scenario_is_optional() {
        let cfg = Config::defaults();
        assert_eq!(default_suite(&cfg, true).len(), 4);
    }

    #[test]
    fn test_block_scenario_step_order() {
        let cfg = Config::defaults();
        let spec = swg_block(&cfg);
        assert_eq!(spec.steps.len(), 7);
        assert!(matches!(spec.steps[0].action, StepAction::ClickButton { .. }));
        assert!(matches!(spec.steps[1].action, StepAction::AwaitWindow { .. }));
        assert!(matches!(spec.steps[4].action, StepAction::AwaitControl { .. }));
        assert!(matches!(spec.steps[5].action, StepAction::Probe { .. }));
    }

    #[test]
    fn test_dialog_steps_carry_cancel_controls() {
        let cfg = Config::defaults();
        for spec in [swg_always_on(&cfg), quit_quick_access(&cfg)] {
            let has_compensated_dialog = spec.steps.iter().any(|s| {
                matches!(
                    &s.action,
                    StepAction::AwaitDialog { cancel_button_id: Some(_), .. }
                )
            });
            assert!(has_compensated_dialog, "{} lacks a compensated dialog", spec.name);
        }
    }

    #[test]
    fn test_specs_use_profile_identifiers() {
        let mut cfg = Config::defaults();
        cfg.app.connect_button_id = "RenamedConnect".to_string();
        let spec = swg_block(&cfg);
        let uses_renamed = spec.steps.iter().any(|s| {
            matches!(&s.action, StepAction::ClickNested { button_id, .. } if button_id == "RenamedConnect")
        });
        assert!(uses_renamed);
    }
}
