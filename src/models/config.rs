use super::machine::Depth;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name, looked up at the project root
pub const CONFIG_FILE: &str = "featverify.toml";

/// Commands used to create and destroy the shared test fixture
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FixtureConfig {
    /// Shell command that creates a fixture and prints its id on the last stdout line
    #[serde(default)]
    pub create: Option<String>,

    /// Shell command template that destroys the fixture named by `{site}`
    #[serde(default)]
    pub destroy: Option<String>,
}

/// Project configuration loaded from `featverify.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatverifyConfig {
    /// Backing document, relative to the project root
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    #[serde(default)]
    pub default_depth: Depth,

    /// Actor recorded by `verify` when none is given on the command line
    #[serde(default)]
    pub default_actor: Option<String>,

    /// Minimum pass rate (percent) for `ci` to succeed
    #[serde(default = "default_ci_pass_threshold")]
    pub ci_pass_threshold: f64,

    /// Where `ci` writes coverage.json and junit.xml
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// Category order for runs, listings and the console
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub fixture: FixtureConfig,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".verification.yml")
}

fn default_ci_pass_threshold() -> f64 {
    98.0
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(".verification-reports")
}

impl Default for FeatverifyConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            default_depth: Depth::default(),
            default_actor: None,
            ci_pass_threshold: default_ci_pass_threshold(),
            report_dir: default_report_dir(),
            categories: Vec::new(),
            fixture: FixtureConfig::default(),
        }
    }
}

impl FeatverifyConfig {
    /// Load config from featverify.toml, falling back to defaults when absent
    pub fn load(project_root: &Path) -> anyhow::Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: FeatverifyConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the actor name for manual verification
    pub fn actor(&self) -> String {
        match &self.default_actor {
            Some(actor) if !actor.trim().is_empty() => actor.clone(),
            _ => get_actor_name(),
        }
    }
}

/// Best-effort name of the person running the tool
pub fn get_actor_name() -> String {
    // Try git config first
    if let Ok(repo) = git2::Repository::discover(".") {
        if let Ok(config) = repo.config() {
            if let Ok(name) = config.get_string("user.name") {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }
    if let Ok(user) = std::env::var("USERNAME") {
        return user;
    }

    "unknown".to_string()
}
