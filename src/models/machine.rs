//! Machine-check specifications attached to checklist items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Placeholder substituted with the fixture id in command templates
pub const SITE_PLACEHOLDER: &str = "{site}";

/// Rigor level selecting which command set runs for an item
///
/// Depths are independent buckets: running `thorough` executes only the
/// `thorough` commands, never the `basic` ones.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    #[default]
    Basic,
    Standard,
    Thorough,
    Paranoid,
}

impl Depth {
    pub const ALL: [Depth; 4] = [Depth::Basic, Depth::Standard, Depth::Thorough, Depth::Paranoid];

    pub fn name(&self) -> &'static str {
        match self {
            Depth::Basic => "basic",
            Depth::Standard => "standard",
            Depth::Thorough => "thorough",
            Depth::Paranoid => "paranoid",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Depth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Depth::Basic),
            "standard" => Ok(Depth::Standard),
            "thorough" => Ok(Depth::Thorough),
            "paranoid" => Ok(Depth::Paranoid),
            other => anyhow::bail!(
                "Unknown depth '{}'. Use basic, standard, thorough or paranoid.",
                other
            ),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    60
}

/// One shell command with its success contract
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineCommand {
    /// Command template; `{site}` is replaced with the fixture id
    pub cmd: String,

    #[serde(default)]
    pub expect_exit: i32,

    /// Hard wall-clock limit; exceeding it counts as a failure
    #[serde(default = "default_timeout_seconds", alias = "timeout")]
    pub timeout_seconds: u64,

    /// Regex that must match somewhere in combined stdout+stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_output: Option<String>,
}

impl MachineCommand {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            expect_exit: 0,
            timeout_seconds: default_timeout_seconds(),
            expect_output: None,
        }
    }

    pub fn expect_exit(mut self, code: i32) -> Self {
        self.expect_exit = code;
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn expect_output(mut self, pattern: impl Into<String>) -> Self {
        self.expect_output = Some(pattern.into());
        self
    }

    /// Command line with the fixture id substituted
    pub fn render(&self, fixture_id: &str) -> String {
        self.cmd.replace(SITE_PLACEHOLDER, fixture_id)
    }
}

/// Result of the last successful machine run for an item
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MachineState {
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub depth: Option<Depth>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// Depth-scoped command lists plus persisted state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MachineSpec {
    #[serde(default)]
    pub checks: BTreeMap<Depth, Vec<MachineCommand>>,
    #[serde(default)]
    pub state: MachineState,
}

impl MachineSpec {
    pub fn with_checks(mut self, depth: Depth, commands: Vec<MachineCommand>) -> Self {
        self.checks.insert(depth, commands);
        self
    }

    /// Commands declared for exactly this depth; `None` or empty means skip
    pub fn commands(&self, depth: Depth) -> Option<&[MachineCommand]> {
        self.checks
            .get(&depth)
            .map(Vec::as_slice)
            .filter(|commands| !commands.is_empty())
    }
}
