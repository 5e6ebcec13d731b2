//! Coverage summary consumed by badge publishing

use crate::models::{Depth, Statistics};
use crate::orchestrator::RunSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Badge color for a coverage percentage
pub fn color_band(percent: f64) -> &'static str {
    if percent >= 90.0 {
        "brightgreen"
    } else if percent >= 75.0 {
        "green"
    } else if percent >= 50.0 {
        "yellow"
    } else if percent >= 25.0 {
        "orange"
    } else {
        "red"
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CoverageBlock {
    pub verified: usize,
    pub total: usize,
    pub percent: f64,
    pub color: &'static str,
}

impl CoverageBlock {
    fn new(verified: usize, total: usize, percent: f64) -> Self {
        Self {
            verified,
            total,
            percent,
            color: color_band(percent),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunBlock {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pass_rate: f64,
}

/// Contents of coverage.json
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CoverageReport {
    pub generated_at: DateTime<Utc>,
    pub depth: Depth,
    pub machine: CoverageBlock,
    pub human: CoverageBlock,
    pub full: CoverageBlock,
    pub run: RunBlock,
}

impl CoverageReport {
    pub fn new(statistics: &Statistics, summary: &RunSummary) -> Self {
        let total = statistics.total_items;
        Self {
            generated_at: Utc::now(),
            depth: summary.depth,
            machine: CoverageBlock::new(
                statistics.machine.verified,
                total,
                statistics.machine.coverage_percent,
            ),
            human: CoverageBlock::new(
                statistics.human.verified,
                total,
                statistics.human.coverage_percent,
            ),
            full: CoverageBlock::new(
                statistics.fully_verified.verified,
                total,
                statistics.fully_verified.coverage_percent,
            ),
            run: RunBlock {
                passed: summary.passed,
                failed: summary.failed,
                skipped: summary.skipped,
                pass_rate: summary.pass_rate(),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
