//! Integration tests for the full scenario flow over the simulated client.
//!
//! The probe step shells out to curl, so scenarios here run with it removed;
//! its classification rules have their own unit tests.

use std::time::Duration;

use sase_smoke::automation::SimulatedClient;
use sase_smoke::config::Config;
use sase_smoke::report::{ReportWriter, render};
use sase_smoke::scenario::{StepAction, catalog};
use sase_smoke::suite::execute_suite;

/// Config with settle delays shrunk to keep the tests quick. The VPN wait
/// keeps its production poll interval; the connection-wait test depends on
/// it.
fn test_config() -> Config {
    let mut cfg = Config::defaults();
    cfg.timing.launch_wait = Duration::from_secs(5);
    cfg.timing.window_wait = Duration::from_secs(2);
    cfg.timing.home_settle = Duration::from_millis(100);
    cfg.timing.dialog_settle = Duration::from_millis(100);
    cfg.timing.close_settle = Duration::from_millis(50);
    cfg
}

/// The scenario with its probe steps removed.
fn without_probe(mut spec: sase_smoke::ScenarioSpec) -> sase_smoke::ScenarioSpec {
    spec.steps
        .retain(|step| !matches!(step.action, StepAction::Probe { .. }));
    spec
}

#[test]
fn test_block_scenario_end_to_end_with_connection_delay() {
    let cfg = test_config();
    // The simulated VPN takes 3 s to come up after Connect is clicked.
    let client = SimulatedClient::new(&cfg.app, Duration::from_secs(3));
    let mut procs = client.processes();

    let scenarios = vec![without_probe(catalog::swg_block(&cfg))];
    let run = execute_suite(&cfg, &client.tree, &mut procs, &scenarios);

    assert!(run.passed, "run failed: {:?}", run);
    let case = &run.test_cases[0];
    assert_eq!(case.steps.len(), 6);
    assert!(case.steps.iter().all(|s| s.passed));

    // The connection wait must see the disconnect button within one poll
    // interval (2 s) of the true 3 s delay.
    let wait_step = case
        .steps
        .iter()
        .find(|s| s.name.contains("Wait for VPN connection"))
        .expect("connection wait step missing");
    let elapsed = wait_step.duration();
    assert!(
        elapsed >= chrono::Duration::seconds(3),
        "wait finished too early: {:?}",
        elapsed
    );
    assert!(
        elapsed <= chrono::Duration::seconds(5),
        "wait finished too late: {:?}",
        elapsed
    );

    // Close was the last step; the main window is gone.
    assert!(!client.tree.is_visible(client.main_window.0));
}

#[test]
fn test_vpn_never_connecting_fails_scenario_after_timeout() {
    let mut cfg = test_config();
    cfg.timing.vpn_wait = Duration::from_millis(900);
    cfg.timing.vpn_poll = Duration::from_millis(200);
    // Disconnect would appear long after the wait budget.
    let client = SimulatedClient::new(&cfg.app, Duration::from_secs(60));
    let mut procs = client.processes();

    let scenarios = vec![without_probe(catalog::swg_block(&cfg))];
    let run = execute_suite(&cfg, &client.tree, &mut procs, &scenarios);

    assert!(!run.passed);
    let case = &run.test_cases[0];
    // Steps 1-4 passed, step 5 (the wait) failed, the close step never ran.
    assert_eq!(case.steps.len(), 5);
    assert!(!case.steps[4].passed);
    assert!(case.steps[4].duration() >= chrono::Duration::milliseconds(900));
}

#[test]
fn test_sign_out_flow_confirms_dialog() {
    let cfg = test_config();
    let client = SimulatedClient::new(&cfg.app, Duration::from_millis(100));
    let mut procs = client.processes();

    let scenarios = vec![without_probe(catalog::swg_always_on(&cfg))];
    let run = execute_suite(&cfg, &client.tree, &mut procs, &scenarios);

    assert!(run.passed, "run failed: {:?}", run);
    let steps = &run.test_cases[0].steps;
    assert!(steps.iter().any(|s| s.name.contains("confirmation dialog")));
}

#[test]
fn test_quit_flow_and_relaunch_between_scenarios() {
    let cfg = test_config();
    let client = SimulatedClient::new(&cfg.app, Duration::from_millis(100));
    let mut procs = client.processes();

    // Quit twice: the second scenario only works if the launcher brings the
    // quick-access window back after the first quit took it down.
    let scenarios = vec![
        catalog::quit_quick_access(&cfg),
        catalog::quit_quick_access(&cfg),
    ];
    let run = execute_suite(&cfg, &client.tree, &mut procs, &scenarios);

    assert!(run.passed, "run failed: {:?}", run);
    assert_eq!(run.test_cases.len(), 2);
    assert!(!client.tree.is_visible(client.quick_access.0));
}

#[test]
fn test_aborted_dialog_scenario_leaves_no_dialog_behind() {
    let cfg = test_config();
    let client = SimulatedClient::new(&cfg.app, Duration::from_millis(100));
    // The scenario looks for a confirm button the dialog does not have, so
    // it aborts with the dialog open.
    let mut broken = cfg.clone();
    broken.app.quit_confirm_button_id = "RenamedQuitConfirmButton".to_string();

    let mut procs = client.processes();
    let scenarios = vec![catalog::quit_quick_access(&broken)];
    let run = execute_suite(&cfg, &client.tree, &mut procs, &scenarios);

    assert!(!run.passed);
    // The compensation dismissed the half-open quit dialog via Cancel.
    let dialog = sase_smoke::interact::find_window(&client.tree, &cfg.app.quit_dialog_id);
    assert!(dialog.is_none(), "quit dialog left open after abort");
}

#[test]
fn test_run_report_artifacts() {
    let cfg = test_config();
    let client = SimulatedClient::new(&cfg.app, Duration::from_millis(100));
    let mut procs = client.processes();

    let scenarios = vec![without_probe(catalog::swg_block(&cfg))];
    let run = execute_suite(&cfg, &client.tree, &mut procs, &scenarios);

    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path());
    let html_path = writer.save_html(&render(&run)).unwrap();
    let manifest_path = writer.save_manifest(&run, &html_path).unwrap();

    let html = std::fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("SWG Block"));
    assert!(html.contains("PASSED"));

    let manifest: sase_smoke::Run =
        serde_json::from_str(&std::fs::read_to_string(&manifest_path).unwrap()).unwrap();
    assert_eq!(manifest.test_cases.len(), run.test_cases.len());
    assert_eq!(manifest.passed, run.passed);
}
