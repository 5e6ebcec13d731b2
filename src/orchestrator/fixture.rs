//! Fixture ("site") provisioning collaborators
//!
//! The orchestrator only knows a fixture by its opaque id. Creating and
//! destroying it is delegated to a [`FixtureProvisioner`].

use super::command_runner::CommandRunner;
use crate::models::{machine::SITE_PLACEHOLDER, FixtureConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Provisioning commands may take a while (site installs)
const PROVISION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Opaque handle to a provisioned fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub id: String,
}

#[async_trait]
pub trait FixtureProvisioner: Send + Sync {
    /// Create a fixture for a run
    async fn provision(&self) -> Result<Fixture>;

    /// Destroy a fixture after a clean run
    async fn teardown(&self, fixture: &Fixture) -> Result<()>;

    /// Keep a fixture around for inspection after failures
    async fn preserve(&self, fixture: &Fixture) -> Result<()> {
        tracing::warn!(fixture = %fixture.id, "preserving fixture for inspection");
        Ok(())
    }
}

/// Provisioner driven by the `[fixture]` shell commands in featverify.toml
pub struct CommandProvisioner {
    create: String,
    destroy: Option<String>,
    runner: CommandRunner,
}

impl CommandProvisioner {
    pub fn new(create: impl Into<String>, destroy: Option<String>) -> Self {
        Self {
            create: create.into(),
            destroy,
            runner: CommandRunner::new(),
        }
    }

    /// Build from config; `None` when no create command is configured
    pub fn from_config(config: &FixtureConfig) -> Option<Self> {
        let create = config.create.as_ref().filter(|c| !c.trim().is_empty())?;
        Some(Self::new(create.clone(), config.destroy.clone()))
    }
}

#[async_trait]
impl FixtureProvisioner for CommandProvisioner {
    async fn provision(&self) -> Result<Fixture> {
        tracing::info!(command = %self.create, "provisioning fixture");
        let result = self
            .runner
            .run(&self.create, PROVISION_TIMEOUT)
            .await
            .context("Failed to run fixture create command")?;

        if result.timed_out || result.exit_code != Some(0) {
            anyhow::bail!(
                "Fixture create command failed (exit {:?}):\n{}",
                result.exit_code,
                result.output
            );
        }

        let id = result
            .last_line()
            .context("Fixture create command printed no fixture id")?
            .to_string();
        Ok(Fixture { id })
    }

    async fn teardown(&self, fixture: &Fixture) -> Result<()> {
        let Some(destroy) = &self.destroy else {
            tracing::info!(fixture = %fixture.id, "no destroy command configured; leaving fixture");
            return Ok(());
        };

        let command_line = destroy.replace(SITE_PLACEHOLDER, &fixture.id);
        tracing::info!(command = %command_line, "tearing down fixture");
        let result = self.runner.run(&command_line, PROVISION_TIMEOUT).await?;
        if result.timed_out || result.exit_code != Some(0) {
            anyhow::bail!(
                "Fixture destroy command failed (exit {:?}):\n{}",
                result.exit_code,
                result.output
            );
        }
        Ok(())
    }
}

/// A fixture that already exists (`--site`); never torn down
pub struct ExistingFixture {
    id: String,
}

impl ExistingFixture {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl FixtureProvisioner for ExistingFixture {
    async fn provision(&self) -> Result<Fixture> {
        Ok(Fixture {
            id: self.id.clone(),
        })
    }

    async fn teardown(&self, fixture: &Fixture) -> Result<()> {
        tracing::debug!(fixture = %fixture.id, "existing fixture is not torn down");
        Ok(())
    }

    async fn preserve(&self, _fixture: &Fixture) -> Result<()> {
        Ok(())
    }
}
