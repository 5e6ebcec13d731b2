//! Derived artifacts written wholesale after a CI run

pub mod coverage;
pub mod junit;

pub use coverage::{color_band, CoverageReport};

use crate::orchestrator::RunSummary;
use crate::models::Statistics;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const COVERAGE_FILE: &str = "coverage.json";
pub const JUNIT_FILE: &str = "junit.xml";

/// Write coverage.json into `dir`, returning its path
pub fn write_coverage(dir: &Path, statistics: &Statistics, summary: &RunSummary) -> Result<PathBuf> {
    let report = CoverageReport::new(statistics, summary);
    let content = report.to_json().context("Failed to serialize coverage report")?;
    write_artifact(dir, COVERAGE_FILE, &content)
}

/// Write junit.xml into `dir`, returning its path
pub fn write_junit(dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    write_artifact(dir, JUNIT_FILE, &junit::render(summary))
}

fn write_artifact(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
    let path = dir.join(name);
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
