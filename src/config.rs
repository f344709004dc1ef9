//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for the smoke-test harness:
//! - Environment variables for all configurable values
//! - Sensible defaults matching the shipped Harmony SASE client
//! - An explicit `Config` structure that scenario builders take by reference
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SASE_SMOKE_APP_PATH` | Path to the client executable | `C:\Program Files\Perimeter 81\Perimeter81.exe` |
//! | `SASE_SMOKE_RESULTS_DIR` | Directory for report artifacts | `test-results` |
//! | `SASE_SMOKE_BLOCKED_URL` | URL expected to be blocked by the gateway | `https://www.888.com/` |
//! | `SASE_SMOKE_BLOCK_HEADER` | Proxy header that marks a blocked response | `Firefly-Pep-Sessionid` |
//! | `SASE_SMOKE_LAUNCH_WAIT_MS` | Startup wait budget per launch attempt | `120000` |
//! | `SASE_SMOKE_LAUNCH_RETRIES` | Whole-launch retry attempts | `3` |
//! | `SASE_SMOKE_VPN_WAIT_MS` | Wait budget for the VPN to connect | `120000` |
//! | `SASE_SMOKE_PROBE_TIMEOUT_SECS` | Bound on the HTTP probe | `15` |

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default path of the client executable
pub const DEFAULT_APP_PATH: &str = "C:\\Program Files\\Perimeter 81\\Perimeter81.exe";

/// Process names the client runs under, used for cleanup
pub const DEFAULT_PROCESS_NAMES: [&str; 3] = [
    "Perimeter81",
    "Perimeter81.Service",
    "Perimeter81.HelperService",
];

/// Default suite name shown in the report header
pub const DEFAULT_SUITE_NAME: &str = "Harmony SASE Smoke Tests Suite";

/// Default directory for report artifacts
pub const DEFAULT_RESULTS_DIR: &str = "test-results";

/// URL expected to be blocked when the gateway is active
pub const DEFAULT_BLOCKED_URL: &str = "https://www.888.com/";

/// Response header injected by the blocking proxy
pub const DEFAULT_BLOCK_HEADER: &str = "Firefly-Pep-Sessionid";

/// Startup wait budget per launch attempt (milliseconds)
pub const DEFAULT_LAUNCH_WAIT_MS: u64 = 120_000;

/// Whole-launch retry attempts
pub const DEFAULT_LAUNCH_RETRIES: u32 = 3;

/// Bounded wait for secondary windows and dialogs (seconds)
pub const DEFAULT_WINDOW_WAIT_SECS: u64 = 6;

/// Wait budget for the VPN connection to establish (milliseconds)
pub const DEFAULT_VPN_WAIT_MS: u64 = 120_000;

/// Poll interval while waiting for the VPN connection (milliseconds)
pub const DEFAULT_VPN_POLL_MS: u64 = 2_000;

/// Settle delay after navigating to the home page (milliseconds)
pub const DEFAULT_HOME_SETTLE_MS: u64 = 2_000;

/// Settle delay before scanning for a confirmation dialog (milliseconds)
pub const DEFAULT_DIALOG_SETTLE_MS: u64 = 2_000;

/// Settle delay after asking the application window to close (milliseconds)
pub const DEFAULT_CLOSE_SETTLE_MS: u64 = 1_000;

/// Bounded wait for a terminated process to exit (milliseconds)
pub const DEFAULT_PROCESS_EXIT_WAIT_MS: u64 = 5_000;

/// Bound on the HTTP probe subprocess (seconds)
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 15;

/// CPU threshold for the resource-usage scenario (percent)
pub const DEFAULT_MAX_CPU_PERCENT: f64 = 10.0;

/// Memory threshold for the resource-usage scenario (MB)
pub const DEFAULT_MAX_MEMORY_MB: f64 = 200.0;

/// Stabilization delay before sampling resources (milliseconds)
pub const DEFAULT_STABILIZE_MS: u64 = 5_000;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the client executable path
pub const ENV_APP_PATH: &str = "SASE_SMOKE_APP_PATH";

/// Environment variable for the results directory
pub const ENV_RESULTS_DIR: &str = "SASE_SMOKE_RESULTS_DIR";

/// Environment variable for the blocked test URL
pub const ENV_BLOCKED_URL: &str = "SASE_SMOKE_BLOCKED_URL";

/// Environment variable for the blocking-proxy header
pub const ENV_BLOCK_HEADER: &str = "SASE_SMOKE_BLOCK_HEADER";

/// Environment variable for the per-attempt launch wait
pub const ENV_LAUNCH_WAIT_MS: &str = "SASE_SMOKE_LAUNCH_WAIT_MS";

/// Environment variable for the launch retry count
pub const ENV_LAUNCH_RETRIES: &str = "SASE_SMOKE_LAUNCH_RETRIES";

/// Environment variable for the VPN connection wait
pub const ENV_VPN_WAIT_MS: &str = "SASE_SMOKE_VPN_WAIT_MS";

/// Environment variable for the probe timeout
pub const ENV_PROBE_TIMEOUT_SECS: &str = "SASE_SMOKE_PROBE_TIMEOUT_SECS";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for the smoke-test harness
#[derive(Debug, Clone)]
pub struct Config {
    /// Target application profile (paths and automation identifiers)
    pub app: AppProfile,
    /// Polling intervals, settle delays and wait budgets
    pub timing: TimingSettings,
    /// HTTP block-verification probe settings
    pub probe: ProbeSettings,
    /// Report output settings
    pub report: ReportSettings,
}

/// Identifiers of one target application version.
///
/// Every window and control the scenarios touch is named here so a client
/// update that renames automation identifiers is a one-struct change.
#[derive(Debug, Clone)]
pub struct AppProfile {
    /// Path to the client executable
    pub executable: PathBuf,
    /// Process names to enumerate and terminate during cleanup
    pub process_names: Vec<String>,
    /// Automation id of the always-on-top quick-access panel
    pub quick_access_window_id: String,
    /// Automation id of the full main window
    pub main_window_id: String,
    /// Display name of the main window (fallback lookup, less reliable)
    pub main_window_name: String,
    /// Support button on the quick-access panel
    pub support_button_id: String,
    /// Home navigation button in the main window
    pub home_button_id: String,
    /// Connect button on the home page
    pub connect_button_id: String,
    /// Display name of the control that signals the connected state
    pub disconnect_button_name: String,
    /// Close button of the main window
    pub close_button_id: String,
    /// Sign-out button on the quick-access panel
    pub sign_out_button_id: String,
    /// Sign-out confirmation dialog
    pub sign_out_dialog_id: String,
    /// Confirm button inside the sign-out dialog
    pub sign_out_confirm_button_id: String,
    /// Cancel button inside the sign-out dialog, used to dismiss on abort
    pub sign_out_cancel_button_id: String,
    /// Quit button on the quick-access panel
    pub quit_button_id: String,
    /// Quit confirmation dialog
    pub quit_dialog_id: String,
    /// Confirm button inside the quit dialog
    pub quit_confirm_button_id: String,
    /// Cancel button inside the quit dialog, used to dismiss on abort
    pub quit_cancel_button_id: String,
    /// Optional package-manager command line used as an uninstall fallback
    pub uninstall_command: Option<String>,
}

/// Polling intervals, settle delays and wait budgets
#[derive(Debug, Clone)]
pub struct TimingSettings {
    /// Startup wait budget per launch attempt
    pub launch_wait: Duration,
    /// Whole-launch retry attempts
    pub launch_retries: u32,
    /// Bounded wait for secondary windows and dialogs
    pub window_wait: Duration,
    /// Wait budget for the VPN connection to establish
    pub vpn_wait: Duration,
    /// Poll interval while waiting for the VPN connection
    pub vpn_poll: Duration,
    /// Settle delay after navigating to the home page
    pub home_settle: Duration,
    /// Settle delay before scanning for a confirmation dialog
    pub dialog_settle: Duration,
    /// Settle delay after asking the application window to close
    pub close_settle: Duration,
    /// Bounded wait for a terminated process to exit
    pub process_exit_wait: Duration,
    /// Stabilization delay before sampling resources
    pub stabilize: Duration,
}

/// HTTP block-verification probe settings
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// URL expected to be blocked when the gateway is active
    pub url: String,
    /// Response header injected by the blocking proxy
    pub block_header: String,
    /// Bound on the probe subprocess
    pub timeout: Duration,
}

/// Report output settings
#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Suite name shown in the report header
    pub suite_name: String,
    /// Directory for report artifacts
    pub results_dir: PathBuf,
    /// Open the generated report in the default browser
    pub open_browser: bool,
    /// CPU threshold for the resource-usage scenario (percent)
    pub max_cpu_percent: f64,
    /// Memory threshold for the resource-usage scenario (MB)
    pub max_memory_mb: f64,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            app: AppProfile::from_env(),
            timing: TimingSettings::from_env(),
            probe: ProbeSettings::from_env(),
            report: ReportSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            app: AppProfile::defaults(),
            timing: TimingSettings::defaults(),
            probe: ProbeSettings::defaults(),
            report: ReportSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AppProfile {
    /// Create the application profile from environment variables
    pub fn from_env() -> Self {
        Self {
            executable: env::var(ENV_APP_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_APP_PATH)),
            ..Self::defaults()
        }
    }

    /// Profile for the shipped Harmony SASE client
    pub fn defaults() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_APP_PATH),
            process_names: DEFAULT_PROCESS_NAMES.iter().map(|s| s.to_string()).collect(),
            quick_access_window_id: "QuickAccessWindow".to_string(),
            main_window_id: "HarmonySASEMainWindow".to_string(),
            main_window_name: "Harmony SASE".to_string(),
            support_button_id: "QuickAccessSupportButton".to_string(),
            home_button_id: "MainWindowHomeButton".to_string(),
            connect_button_id: "HomeConnectButton".to_string(),
            disconnect_button_name: "Disconnect".to_string(),
            close_button_id: "CloseButton".to_string(),
            sign_out_button_id: "QuickAccessSignOutButton".to_string(),
            sign_out_dialog_id: "SignOutConfirmationDialog".to_string(),
            sign_out_confirm_button_id: "SignOutConfirmButton".to_string(),
            sign_out_cancel_button_id: "SignOutCancelButton".to_string(),
            quit_button_id: "QuickAccessQuitButton".to_string(),
            quit_dialog_id: "QuitConfirmationDialog".to_string(),
            quit_confirm_button_id: "QuitConfirmButton".to_string(),
            quit_cancel_button_id: "QuitCancelButton".to_string(),
            uninstall_command: None,
        }
    }
}

impl TimingSettings {
    /// Create timing settings from environment variables
    pub fn from_env() -> Self {
        Self {
            launch_wait: Duration::from_millis(env_u64(ENV_LAUNCH_WAIT_MS, DEFAULT_LAUNCH_WAIT_MS)),
            launch_retries: env::var(ENV_LAUNCH_RETRIES)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LAUNCH_RETRIES),
            vpn_wait: Duration::from_millis(env_u64(ENV_VPN_WAIT_MS, DEFAULT_VPN_WAIT_MS)),
            ..Self::defaults()
        }
    }

    /// Create timing settings with defaults
    pub fn defaults() -> Self {
        Self {
            launch_wait: Duration::from_millis(DEFAULT_LAUNCH_WAIT_MS),
            launch_retries: DEFAULT_LAUNCH_RETRIES,
            window_wait: Duration::from_secs(DEFAULT_WINDOW_WAIT_SECS),
            vpn_wait: Duration::from_millis(DEFAULT_VPN_WAIT_MS),
            vpn_poll: Duration::from_millis(DEFAULT_VPN_POLL_MS),
            home_settle: Duration::from_millis(DEFAULT_HOME_SETTLE_MS),
            dialog_settle: Duration::from_millis(DEFAULT_DIALOG_SETTLE_MS),
            close_settle: Duration::from_millis(DEFAULT_CLOSE_SETTLE_MS),
            process_exit_wait: Duration::from_millis(DEFAULT_PROCESS_EXIT_WAIT_MS),
            stabilize: Duration::from_millis(DEFAULT_STABILIZE_MS),
        }
    }
}

impl ProbeSettings {
    /// Create probe settings from environment variables
    pub fn from_env() -> Self {
        Self {
            url: env::var(ENV_BLOCKED_URL).unwrap_or_else(|_| DEFAULT_BLOCKED_URL.to_string()),
            block_header: env::var(ENV_BLOCK_HEADER)
                .unwrap_or_else(|_| DEFAULT_BLOCK_HEADER.to_string()),
            timeout: Duration::from_secs(env_u64(ENV_PROBE_TIMEOUT_SECS, DEFAULT_PROBE_TIMEOUT_SECS)),
        }
    }

    /// Create probe settings with defaults
    pub fn defaults() -> Self {
        Self {
            url: DEFAULT_BLOCKED_URL.to_string(),
            block_header: DEFAULT_BLOCK_HEADER.to_string(),
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

impl ReportSettings {
    /// Create report settings from environment variables
    pub fn from_env() -> Self {
        Self {
            results_dir: env::var(ENV_RESULTS_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_RESULTS_DIR)),
            ..Self::defaults()
        }
    }

    /// Create report settings with defaults
    pub fn defaults() -> Self {
        Self {
            suite_name: DEFAULT_SUITE_NAME.to_string(),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            open_browser: true,
            max_cpu_percent: DEFAULT_MAX_CPU_PERCENT,
            max_memory_mb: DEFAULT_MAX_MEMORY_MB,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Get the blocked test URL (convenience function)
pub fn blocked_url() -> String {
    get().probe.url.clone()
}

/// Get the results directory (convenience function)
pub fn results_dir() -> PathBuf {
    get().report.results_dir.clone()
}
