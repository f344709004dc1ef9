//! Report persistence and browser handoff.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;

use super::types::Run;

/// Writes report artifacts into a results directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    results_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// Save the rendered HTML under a timestamped name; returns its path.
    pub fn save_html(&self, html: &str) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.results_dir)?;
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self.results_dir.join(format!("TestReport_{}.html", timestamp));
        fs::write(&path, html)?;
        Ok(path)
    }

    /// Write the structured run next to the HTML report.
    pub fn save_manifest(&self, run: &Run, html_path: &Path) -> std::io::Result<PathBuf> {
        let path = html_path.with_extension("json");
        fs::write(&path, serde_json::to_string_pretty(run)?)?;
        Ok(path)
    }
}

/// Best-effort open of the report in the default browser.
pub fn open_in_browser(path: &Path) -> bool {
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]).arg(path);
        c
    };

    #[cfg(target_os = "macos")]
    let mut command = {
        let mut c = Command::new("open");
        c.arg(path);
        c
    };

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut command = {
        let mut c = Command::new("xdg-open");
        c.arg(path);
        c
    };

    match command.spawn() {
        Ok(_) => {
            log::info!("Report opened in browser");
            true
        }
        Err(err) => {
            log::warn!("Could not open report automatically: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::TestCase;

    #[test]
    fn test_save_html_creates_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let path = writer.save_html("<html></html>").unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("TestReport_"));
        assert!(name.ends_with(".html"));
    }

    #[test]
    fn test_save_manifest_next_to_html() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let mut run = Run::new("suite");
        let mut case = TestCase::new("case");
        case.finish(true);
        run.push_case(case);
        run.finalize();

        let html_path = writer.save_html("<html></html>").unwrap();
        let manifest_path = writer.save_manifest(&run, &html_path).unwrap();

        assert_eq!(manifest_path.extension().unwrap(), "json");
        let text = fs::read_to_string(manifest_path).unwrap();
        let parsed: Run = serde_json::from_str(&text).unwrap();
        assert!(parsed.passed);
    }

    #[test]
    fn test_save_creates_missing_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deeper").join("still");
        let writer = ReportWriter::new(&nested);

        let path = writer.save_html("x").unwrap();
        assert!(path.starts_with(&nested));
    }
}
