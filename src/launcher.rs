//! Launching and tearing down the target application.
//!
//! The launcher starts the client as a detached process and watches the
//! desktop for its quick-access window, backing off exponentially between
//! scans. The window appearing is the only startup signal the client gives;
//! PID liveness means nothing while its splash/service dance is ongoing.
//!
//! Teardown enumerates the client's processes by name, asks each to close,
//! and escalates to a forced kill after a bounded wait. It must succeed in
//! spirit on every exit path, so it only ever logs.

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::automation::tree::UiTree;
use crate::automation::types::WindowRef;
use crate::config::AppProfile;
use crate::interact;

/// First desktop scan happens this long after process start
const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Backoff ceiling for desktop scans
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Fixed delay between whole-launch attempts
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Result type for launch operations
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Errors raised while launching or terminating the client
#[derive(Debug)]
pub enum LaunchError {
    /// No matching window appeared within the budget, on any attempt
    Timeout {
        /// What was being waited for
        matcher: String,
        /// Per-attempt wait budget
        waited: Duration,
        /// Launch attempts performed
        attempts: u32,
    },
    /// The executable could not be started
    Spawn(std::io::Error),
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchError::Timeout {
                matcher,
                waited,
                attempts,
            } => write!(
                f,
                "No window matching {} appeared within {:?} on any of {} launch attempts. \
                 Ensure the application is installed and can be launched.",
                matcher, waited, attempts
            ),
            LaunchError::Spawn(err) => write!(f, "Failed to start application: {}", err),
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::Timeout { .. } => None,
            LaunchError::Spawn(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for LaunchError {
    fn from(err: std::io::Error) -> Self {
        LaunchError::Spawn(err)
    }
}

/// How to recognize the application's startup window.
///
/// The stable automation id is preferred; the display name is a fallback for
/// builds that do not assign ids (names are localized and less reliable).
#[derive(Debug, Clone)]
pub struct WindowMatcher {
    /// Stable automation id to match
    pub automation_id: Option<String>,
    /// Display name to match when no id is configured
    pub name: Option<String>,
}

impl WindowMatcher {
    /// Match by automation id
    pub fn by_id(automation_id: &str) -> Self {
        Self {
            automation_id: Some(automation_id.to_string()),
            name: None,
        }
    }

    /// Match by display name
    pub fn by_name(name: &str) -> Self {
        Self {
            automation_id: None,
            name: Some(name.to_string()),
        }
    }

    fn describe(&self) -> String {
        match (&self.automation_id, &self.name) {
            (Some(id), _) => format!("automation id '{}'", id),
            (None, Some(name)) => format!("name '{}'", name),
            (None, None) => "any window".to_string(),
        }
    }

    fn find(&self, tree: &dyn UiTree) -> Option<WindowRef> {
        if let Some(id) = &self.automation_id {
            return interact::find_window(tree, id);
        }
        if let Some(name) = &self.name {
            return interact::find_window_named(tree, name);
        }
        None
    }
}

/// Knobs for [`launch`]
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Wait budget per launch attempt
    pub max_wait: Duration,
    /// Whole-launch attempts before giving up
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_millis(crate::config::DEFAULT_LAUNCH_WAIT_MS),
            max_retries: crate::config::DEFAULT_LAUNCH_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// The OS process boundary.
///
/// `SystemProcesses` is the real thing; the simulated implementation lives
/// with the simulated tree.
pub trait ProcessControl {
    /// Start an executable as a detached process
    fn start(&mut self, executable: &Path) -> LaunchResult<()>;

    /// PIDs of running processes with the given name
    fn pids_by_name(&self, name: &str) -> Vec<u32>;

    /// Ask a process to close gracefully; true if the request was delivered
    fn close_gracefully(&self, pid: u32) -> bool;

    /// Forcibly terminate a process; true if the signal was delivered
    fn kill(&self, pid: u32) -> bool;

    /// Wait up to `timeout` for a process to exit; true once gone
    fn wait_for_exit(&self, pid: u32, timeout: Duration) -> bool;
}

/// Launch the client and wait for its startup window.
///
/// Polls the desktop with exponential backoff (100 ms doubling to 2 s)
/// within `opts.max_wait`, then retries the entire launch up to
/// `opts.max_retries` times. Starting an already-running instance is fine;
/// the matcher just finds the existing window sooner.
pub fn launch(
    procs: &mut dyn ProcessControl,
    tree: &dyn UiTree,
    executable: &Path,
    matcher: &WindowMatcher,
    opts: &LaunchOptions,
) -> LaunchResult<WindowRef> {
    let attempts = opts.max_retries.max(1);

    for attempt in 1..=attempts {
        log::info!(
            "Launching {} (attempt {}/{})",
            executable.display(),
            attempt,
            attempts
        );
        procs.start(executable)?;

        let started = Instant::now();
        if let Some(window) = wait_with_backoff(tree, matcher, opts.max_wait) {
            log::info!(
                "Found startup window after {} ms",
                started.elapsed().as_millis()
            );
            return Ok(window);
        }

        log::warn!(
            "Startup window ({}) did not appear within {:?}",
            matcher.describe(),
            opts.max_wait
        );
        if attempt < attempts {
            thread::sleep(opts.retry_delay);
        }
    }

    log::warn!("Dumping top-level windows for diagnosis");
    interact::dump_tree(tree, tree.desktop(), 1);

    Err(LaunchError::Timeout {
        matcher: matcher.describe(),
        waited: opts.max_wait,
        attempts,
    })
}

fn wait_with_backoff(
    tree: &dyn UiTree,
    matcher: &WindowMatcher,
    max_wait: Duration,
) -> Option<WindowRef> {
    let deadline = Instant::now() + max_wait;
    let mut interval = INITIAL_POLL_INTERVAL;

    loop {
        if let Some(window) = matcher.find(tree) {
            return Some(window);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        thread::sleep(interval.min(deadline - now));
        interval = (interval * 2).min(MAX_POLL_INTERVAL);
    }
}

/// Terminate every configured client process, leaving the system clean.
///
/// Graceful close first, forced kill for stragglers, each exit bounded by
/// `exit_wait`. Runs on every harness exit path and therefore never fails.
pub fn ensure_closed(procs: &dyn ProcessControl, profile: &AppProfile, exit_wait: Duration) {
    log::info!("Ensuring all client processes are closed...");
    let mut any_found = false;

    for name in &profile.process_names {
        let pids = procs.pids_by_name(name);
        if pids.is_empty() {
            continue;
        }
        any_found = true;
        log::info!("Found {} instance(s) of {}", pids.len(), name);

        for pid in pids {
            log::info!("Closing {} (PID: {})...", name, pid);
            if procs.close_gracefully(pid) {
                if procs.wait_for_exit(pid, exit_wait) {
                    log::info!("Process {} closed gracefully", pid);
                    continue;
                }
                log::warn!("Process {} still running, forcing termination", pid);
            } else {
                log::warn!("Graceful close failed for {}, killing", pid);
            }
            procs.kill(pid);
            if !procs.wait_for_exit(pid, exit_wait) {
                log::error!("Process {} survived forced termination", pid);
            }
        }
    }

    if !any_found {
        log::info!("No client processes found running");
    } else {
        log::info!("All client processes have been closed");
    }
}

/// Last-resort cleanup: invoke the platform package manager to uninstall.
///
/// Only used when configured and only after `ensure_closed` could not clear
/// a wedged install; best-effort by nature.
pub fn uninstall_fallback(command_line: &str) {
    let mut parts = command_line.split_whitespace();
    let Some(program) = parts.next() else {
        log::warn!("Empty uninstall command configured, skipping");
        return;
    };
    log::warn!("Running uninstall fallback: {}", command_line);
    match Command::new(program).args(parts).status() {
        Ok(status) if status.success() => log::info!("Uninstall fallback completed"),
        Ok(status) => log::warn!("Uninstall fallback exited with {}", status),
        Err(err) => log::warn!("Uninstall fallback failed to start: {}", err),
    }
}

/// [`ProcessControl`] over the real OS.
#[derive(Debug, Default)]
pub struct SystemProcesses;

impl SystemProcesses {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessControl for SystemProcesses {
    fn start(&mut self, executable: &Path) -> LaunchResult<()> {
        // Detached: the child must outlive the harness's interest in it.
        Command::new(executable)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }

    #[cfg(unix)]
    fn pids_by_name(&self, name: &str) -> Vec<u32> {
        let output = Command::new("pgrep").arg("-x").arg(name).output();
        match output {
            Ok(output) => String::from_utf8_lossy(&output.stdout)
                .lines()
                .filter_map(|line| line.trim().parse().ok())
                .collect(),
            Err(err) => {
                log::warn!("pgrep failed: {}", err);
                Vec::new()
            }
        }
    }

    #[cfg(windows)]
    fn pids_by_name(&self, name: &str) -> Vec<u32> {
        let image = format!("IMAGENAME eq {}.exe", name);
        let output = Command::new("tasklist")
            .args(["/FI", &image, "/FO", "CSV", "/NH"])
            .output();
        match output {
            Ok(output) => String::from_utf8_lossy(&output.stdout)
                .lines()
                .filter_map(|line| {
                    // "Name","PID","Session","Session#","Mem"
                    line.split(',').nth(1).and_then(|field| {
                        field.trim_matches('"').parse().ok()
                    })
                })
                .collect(),
            Err(err) => {
                log::warn!("tasklist failed: {}", err);
                Vec::new()
            }
        }
    }

    #[cfg(unix)]
    fn close_gracefully(&self, pid: u32) -> bool {
        run_quiet("kill", &["-TERM", &pid.to_string()])
    }

    #[cfg(windows)]
    fn close_gracefully(&self, pid: u32) -> bool {
        run_quiet("taskkill", &["/PID", &pid.to_string()])
    }

    #[cfg(unix)]
    fn kill(&self, pid: u32) -> bool {
        run_quiet("kill", &["-KILL", &pid.to_string()])
    }

    #[cfg(windows)]
    fn kill(&self, pid: u32) -> bool {
        run_quiet("taskkill", &["/F", "/PID", &pid.to_string()])
    }

    fn wait_for_exit(&self, pid: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_running(pid) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(100));
        }
    }
}

impl SystemProcesses {
    #[cfg(unix)]
    fn is_running(&self, pid: u32) -> bool {
        run_quiet("kill", &["-0", &pid.to_string()])
    }

    #[cfg(windows)]
    fn is_running(&self, pid: u32) -> bool {
        !self.pids_matching_pid(pid).is_empty()
    }

    #[cfg(windows)]
    fn pids_matching_pid(&self, pid: u32) -> Vec<u32> {
        let filter = format!("PID eq {}", pid);
        Command::new("tasklist")
            .args(["/FI", &filter, "/FO", "CSV", "/NH"])
            .output()
            .map(|output| {
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .filter_map(|line| {
                        line.split(',').nth(1).and_then(|field| {
                            field.trim_matches('"').parse().ok()
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn run_quiet(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::sim::{SimulatedProcesses, SimulatedTree};

    fn fast_opts(retries: u32) -> LaunchOptions {
        LaunchOptions {
            max_wait: Duration::from_millis(250),
            max_retries: retries,
            retry_delay: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_launch_finds_window_first_attempt() {
        let sim = SimulatedTree::new();
        let window = sim.add_hidden_window("QuickAccessWindow", "Quick Access");
        let mut procs = SimulatedProcesses::new(sim.clone(), window);

        let matcher = WindowMatcher::by_id("QuickAccessWindow");
        let result = launch(
            &mut procs,
            &sim,
            Path::new("/opt/client"),
            &matcher,
            &fast_opts(3),
        );

        assert_eq!(result.unwrap(), window);
        assert_eq!(procs.start_count(), 1);
    }

    #[test]
    fn test_launch_retries_until_window_appears() {
        let sim = SimulatedTree::new();
        let window = sim.add_hidden_window("QuickAccessWindow", "Quick Access");
        let mut procs = SimulatedProcesses::new(sim.clone(), window).succeed_on_attempt(3);

        let matcher = WindowMatcher::by_id("QuickAccessWindow");
        let result = launch(
            &mut procs,
            &sim,
            Path::new("/opt/client"),
            &matcher,
            &fast_opts(3),
        );

        assert!(result.is_ok());
        assert_eq!(procs.start_count(), 3);
    }

    #[test]
    fn test_launch_exhausts_retries() {
        let sim = SimulatedTree::new();
        let window = sim.add_hidden_window("QuickAccessWindow", "Quick Access");
        // Window would only appear on attempt 5; we stop at 2.
        let mut procs = SimulatedProcesses::new(sim.clone(), window).succeed_on_attempt(5);

        let matcher = WindowMatcher::by_id("QuickAccessWindow");
        let result = launch(
            &mut procs,
            &sim,
            Path::new("/opt/client"),
            &matcher,
            &fast_opts(2),
        );

        match result {
            Err(LaunchError::Timeout { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected launch timeout, got {:?}", other.map(|w| w.0)),
        }
        assert_eq!(procs.start_count(), 2);
    }

    #[test]
    fn test_launch_tolerates_slow_startup() {
        let sim = SimulatedTree::new();
        let window = sim.add_hidden_window("QuickAccessWindow", "Quick Access");
        let mut procs = SimulatedProcesses::new(sim.clone(), window)
            .startup_delay(Duration::from_millis(120));

        let matcher = WindowMatcher::by_id("QuickAccessWindow");
        let result = launch(
            &mut procs,
            &sim,
            Path::new("/opt/client"),
            &matcher,
            &fast_opts(1),
        );

        assert!(result.is_ok());
    }

    #[test]
    fn test_matcher_by_name_fallback() {
        let sim = SimulatedTree::new();
        // A window with a name but no automation id.
        let window = sim.add_window("", "Quick Access");

        let matcher = WindowMatcher::by_name("Quick Access");
        assert_eq!(matcher.find(&sim), Some(window));
    }

    #[test]
    fn test_ensure_closed_terminates_running_processes() {
        let sim = SimulatedTree::new();
        let window = sim.add_window("QuickAccessWindow", "Quick Access");
        let procs = SimulatedProcesses::new(sim.clone(), window);
        let profile = AppProfile::defaults();

        assert!(!procs.pids_by_name("Perimeter81").is_empty());
        ensure_closed(&procs, &profile, Duration::from_millis(100));
        assert!(procs.pids_by_name("Perimeter81").is_empty());
    }
}
