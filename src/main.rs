use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use sase_smoke::automation::{SimulatedClient, native_tree};
use sase_smoke::config::Config;
use sase_smoke::launcher::SystemProcesses;
use sase_smoke::probe;
use sase_smoke::report::{ReportWriter, Run, open_in_browser, render};
use sase_smoke::scenario::catalog;
use sase_smoke::suite::{CleanupGuard, execute_suite};

/// Smoke tests for the Harmony SASE desktop client
#[derive(Parser, Debug)]
#[command(
    name = "sase-smoke",
    about = "End-to-end smoke tests for the Harmony SASE desktop client, driven through UI automation",
    after_help = "ENVIRONMENT VARIABLES:\n\
        SASE_SMOKE_APP_PATH            Path to the client executable\n\
        SASE_SMOKE_RESULTS_DIR         Directory for report artifacts\n\
        SASE_SMOKE_BLOCKED_URL         URL expected to be blocked by the gateway\n\
        SASE_SMOKE_BLOCK_HEADER        Proxy header that marks a blocked response\n\
        SASE_SMOKE_LAUNCH_WAIT_MS      Startup wait budget per launch attempt\n\
        SASE_SMOKE_LAUNCH_RETRIES      Whole-launch retry attempts\n\
        SASE_SMOKE_VPN_WAIT_MS         Wait budget for the VPN to connect\n\
        SASE_SMOKE_PROBE_TIMEOUT_SECS  Bound on the HTTP probe\n\
        RUST_LOG                       Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the smoke-test suite against the installed client
    Run {
        /// Path to the client executable
        #[arg(short, long, env = "SASE_SMOKE_APP_PATH")]
        app: Option<PathBuf>,

        /// Directory for report artifacts
        #[arg(short, long, env = "SASE_SMOKE_RESULTS_DIR")]
        results: Option<PathBuf>,

        /// Do not open the report in a browser
        #[arg(long)]
        no_open: bool,

        /// Also run the resource-usage scenario
        #[arg(long)]
        with_resource_checks: bool,

        /// Print the structured run as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Run the full suite against the built-in simulated client
    Selfcheck {
        /// Simulated delay before the VPN reports connected (ms)
        #[arg(long, default_value = "3000")]
        connect_delay_ms: u64,

        /// Print the structured run as JSON instead of the summary
        #[arg(long)]
        json: bool,

        /// Do not write a report file
        #[arg(long)]
        no_report: bool,
    },

    /// One-off block-verification probe of a URL
    Probe {
        /// URL to probe (default: the configured blocked URL)
        url: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Some(Commands::Run {
            app,
            results,
            no_open,
            with_resource_checks,
            json,
        }) => run_command(app, results, no_open, with_resource_checks, json),
        Some(Commands::Selfcheck {
            connect_delay_ms,
            json,
            no_report,
        }) => selfcheck_command(connect_delay_ms, json, no_report),
        Some(Commands::Probe { url }) => probe_command(url),
        None => {
            println!("sase-smoke - Smoke tests for the Harmony SASE desktop client");
            println!();
            println!("Usage: sase-smoke <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run        Run the suite against the installed client");
            println!("  selfcheck  Run the suite against the built-in simulated client");
            println!("  probe      One-off block-verification probe of a URL");
            println!();
            println!("Run with --help for more information.");
            ExitCode::SUCCESS
        }
    }
}

fn run_command(
    app: Option<PathBuf>,
    results: Option<PathBuf>,
    no_open: bool,
    with_resource_checks: bool,
    json: bool,
) -> ExitCode {
    let mut cfg = Config::from_env();
    if let Some(app) = app {
        cfg.app.executable = app;
    }
    if let Some(results) = results {
        cfg.report.results_dir = results;
    }
    if no_open {
        cfg.report.open_browser = false;
    }

    let tree = match native_tree() {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(2);
        }
    };

    // Cleanup must run on every exit path, pass, fail or panic.
    let _guard = CleanupGuard::new(
        SystemProcesses::new(),
        cfg.app.clone(),
        cfg.timing.process_exit_wait,
    );

    let scenarios = catalog::default_suite(&cfg, with_resource_checks);
    let mut procs = SystemProcesses::new();
    let run = execute_suite(&cfg, tree.as_ref(), &mut procs, &scenarios);

    finish(&cfg, &run, json, /* write_report */ true)
}

fn selfcheck_command(connect_delay_ms: u64, json: bool, no_report: bool) -> ExitCode {
    let mut cfg = Config::defaults();
    cfg.report.suite_name = "Harmony SASE Smoke Tests (simulated)".to_string();
    cfg.report.open_browser = false;
    // An RFC 2606 reserved name: resolution fails everywhere, which the
    // classifier reads as the gateway sinkholing the host.
    cfg.probe.url = "https://smoke-selfcheck.invalid/".to_string();
    cfg.probe.timeout = Duration::from_secs(5);
    // The simulated client has no splash screens to wait out.
    cfg.timing.launch_wait = Duration::from_secs(5);
    cfg.timing.window_wait = Duration::from_secs(2);
    cfg.timing.home_settle = Duration::from_millis(200);
    cfg.timing.dialog_settle = Duration::from_millis(200);
    cfg.timing.close_settle = Duration::from_millis(100);
    cfg.timing.vpn_wait = Duration::from_secs(30);
    cfg.timing.vpn_poll = Duration::from_millis(500);

    let client = SimulatedClient::new(&cfg.app, Duration::from_millis(connect_delay_ms));
    let mut procs = client.processes();
    let _guard = CleanupGuard::new(
        procs.clone(),
        cfg.app.clone(),
        cfg.timing.process_exit_wait,
    );

    let scenarios = catalog::default_suite(&cfg, false);
    let run = execute_suite(&cfg, &client.tree, &mut procs, &scenarios);

    finish(&cfg, &run, json, !no_report)
}

fn probe_command(url: Option<String>) -> ExitCode {
    let cfg = Config::from_env();
    let url = url.unwrap_or_else(|| cfg.probe.url.clone());

    match probe::verify_blocked(&url, &cfg.probe.block_header, cfg.probe.timeout) {
        Ok(true) => {
            println!("BLOCKED: {}", url);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("NOT BLOCKED: {}", url);
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("Probe failed: {}", err);
            ExitCode::from(2)
        }
    }
}

/// Print the summary, write the artifacts, map the run to an exit code.
fn finish(cfg: &Config, run: &Run, json: bool, write_report: bool) -> ExitCode {
    println!();
    println!("═══════════════════════════════════════");
    println!(
        "Overall Result: {}/{} tests passed",
        run.passed_count(),
        run.test_cases.len()
    );
    println!("═══════════════════════════════════════");

    if json {
        match serde_json::to_string_pretty(run) {
            Ok(text) => println!("{}", text),
            Err(err) => {
                eprintln!("Error serializing run: {}", err);
                return ExitCode::from(2);
            }
        }
    }

    if write_report {
        let writer = ReportWriter::new(&cfg.report.results_dir);
        let html = render(run);
        match writer.save_html(&html) {
            Ok(path) => {
                if let Err(err) = writer.save_manifest(run, &path) {
                    log::warn!("Could not write report manifest: {}", err);
                }
                println!("Report generated: {}", path.display());
                if cfg.report.open_browser {
                    open_in_browser(&path);
                }
            }
            Err(err) => {
                eprintln!("Error writing report: {}", err);
                return ExitCode::from(2);
            }
        }
    }

    if run.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
