//! Machine checks for a single checklist item

use super::command_runner::CommandRunner;
use crate::models::{Depth, MachineState};
use crate::state::{Store, TransitionError};
use anyhow::Result;
use chrono::Utc;
use regex::RegexBuilder;
use std::time::{Duration, Instant};

/// Outcome of running one item's machine checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    Pass,
    Fail,
    /// No commands declared for the requested depth
    Skip,
}

impl CheckStatus {
    pub fn name(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Skip => "skip",
        }
    }
}

/// Status plus a human-readable explanation
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub status: CheckStatus,
    pub detail: String,
    /// Captured output of the failing command; empty otherwise
    pub output: String,
    pub duration: Duration,
}

impl ItemOutcome {
    fn skip(detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Skip,
            detail: detail.into(),
            output: String::new(),
            duration: Duration::ZERO,
        }
    }

    fn fail(detail: impl Into<String>, output: String, duration: Duration) -> Self {
        Self {
            status: CheckStatus::Fail,
            detail: detail.into(),
            output,
            duration,
        }
    }
}

/// Executes depth-scoped command lists and records passes in the store
#[derive(Debug, Default)]
pub struct CheckRunner {
    commands: CommandRunner,
}

impl CheckRunner {
    pub fn new() -> Self {
        Self {
            commands: CommandRunner::new(),
        }
    }

    /// Run item `item_index` of `feature_id` at `depth` against `fixture_id`
    ///
    /// Commands run in order and the first failure stops the item. A pass
    /// overwrites the item's machine state and persists the store; fail and
    /// skip leave the previous state untouched.
    pub async fn run_item(
        &self,
        store: &mut Store,
        feature_id: &str,
        item_index: usize,
        depth: Depth,
        fixture_id: &str,
    ) -> Result<ItemOutcome> {
        let feature = store
            .document()
            .feature(feature_id)
            .ok_or_else(|| TransitionError::FeatureNotFound(feature_id.to_string()))?;
        let item = feature.checklist.get(item_index).ok_or_else(|| {
            TransitionError::ChecklistItemOutOfRange {
                feature: feature_id.to_string(),
                index: item_index,
                len: feature.checklist.len(),
            }
        })?;

        let Some(commands) = item
            .machine
            .as_ref()
            .and_then(|machine| machine.commands(depth))
        else {
            return Ok(ItemOutcome::skip(format!("no {} checks", depth)));
        };
        let commands = commands.to_vec();

        let started = Instant::now();
        for (position, command) in commands.iter().enumerate() {
            let step = position + 1;
            let command_line = command.render(fixture_id);
            let result = match self
                .commands
                .run(&command_line, Duration::from_secs(command.timeout_seconds))
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    return Ok(ItemOutcome::fail(
                        format!("command {} could not run: {}", step, e),
                        String::new(),
                        started.elapsed(),
                    ))
                }
            };

            if result.timed_out {
                return Ok(ItemOutcome::fail(
                    format!(
                        "command {} timed out after {}s: {}",
                        step, command.timeout_seconds, command_line
                    ),
                    result.output,
                    started.elapsed(),
                ));
            }

            if result.exit_code != Some(command.expect_exit) {
                let got = result
                    .exit_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                return Ok(ItemOutcome::fail(
                    format!(
                        "command {} exited {} (expected {}): {}",
                        step, got, command.expect_exit, command_line
                    ),
                    result.output,
                    started.elapsed(),
                ));
            }

            if let Some(pattern) = &command.expect_output {
                // `^`/`$` anchor at line boundaries, as grep does
                let matched = match RegexBuilder::new(pattern).multi_line(true).build() {
                    Ok(re) => re.is_match(&result.output),
                    Err(e) => {
                        return Ok(ItemOutcome::fail(
                            format!("command {} has invalid expect_output: {}", step, e),
                            result.output,
                            started.elapsed(),
                        ))
                    }
                };
                if !matched {
                    return Ok(ItemOutcome::fail(
                        format!(
                            "command {} output did not match /{}/: {}",
                            step, pattern, command_line
                        ),
                        result.output,
                        started.elapsed(),
                    ));
                }
            }
        }

        let duration = started.elapsed();
        if let Some(machine) = store
            .document_mut()
            .feature_mut(feature_id)
            .and_then(|f| f.checklist.get_mut(item_index))
            .and_then(|item| item.machine.as_mut())
        {
            machine.state = MachineState {
                verified: true,
                verified_at: Some(Utc::now()),
                depth: Some(depth),
                duration_seconds: Some((duration.as_secs_f64() * 100.0).round() / 100.0),
            };
        }
        store.save()?;

        Ok(ItemOutcome {
            status: CheckStatus::Pass,
            detail: format!("{} command(s) passed", commands.len()),
            output: String::new(),
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChecklistItem, Feature, MachineCommand, MachineSpec, VerificationDocument};
    use std::path::Path;
    use tempfile::TempDir;

    fn store_with(temp: &TempDir, machine: MachineSpec) -> Store {
        let mut feature = Feature::new("Backup");
        feature
            .checklist
            .push(ChecklistItem::new("Creates .sql file").with_machine(machine));
        feature.checklist.push(ChecklistItem::new("Manual only"));

        let mut doc = VerificationDocument::default();
        doc.features.insert("backup".into(), feature);
        let store = Store::new(temp.path(), Path::new(".verification.yml"), doc);
        store.save().unwrap();
        store
    }

    fn machine_state(store: &Store) -> MachineState {
        store.document().feature("backup").unwrap().checklist[0]
            .machine
            .as_ref()
            .unwrap()
            .state
            .clone()
    }

    #[tokio::test]
    async fn test_pass_persists_state() {
        let temp = TempDir::new().unwrap();
        let site = temp.path().join("site");
        std::fs::create_dir_all(&site).unwrap();
        std::fs::write(site.join("output.sql"), "CREATE TABLE t;").unwrap();

        let machine = MachineSpec::default().with_checks(
            Depth::Basic,
            vec![
                MachineCommand::new("test -f {site}/output.sql"),
                MachineCommand::new("cat {site}/output.sql").expect_output("CREATE\\s+TABLE"),
            ],
        );
        let mut store = store_with(&temp, machine);

        let outcome = CheckRunner::new()
            .run_item(&mut store, "backup", 0, Depth::Basic, site.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(outcome.status, CheckStatus::Pass);

        let state = machine_state(&store);
        assert!(state.verified);
        assert_eq!(state.depth, Some(Depth::Basic));
        assert!(state.verified_at.is_some());

        let reloaded = Store::open(temp.path(), Path::new(".verification.yml")).unwrap();
        assert!(machine_state(&reloaded).verified);
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let machine = MachineSpec::default()
            .with_checks(Depth::Basic, vec![MachineCommand::new("test -f {site}/output.sql")]);
        let mut store = store_with(&temp, machine);

        let outcome = CheckRunner::new()
            .run_item(&mut store, "backup", 0, Depth::Basic, "/nonexistent-fixture")
            .await
            .unwrap();
        assert_eq!(outcome.status, CheckStatus::Fail);
        assert!(!machine_state(&store).verified);
    }

    #[tokio::test]
    async fn test_short_circuit_on_wrong_exit() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("third-ran");
        let machine = MachineSpec::default().with_checks(
            Depth::Basic,
            vec![
                MachineCommand::new("true"),
                MachineCommand::new("exit 2"),
                MachineCommand::new(format!("touch {}", marker.display())),
            ],
        );
        let mut store = store_with(&temp, machine);

        let outcome = CheckRunner::new()
            .run_item(&mut store, "backup", 0, Depth::Basic, "site")
            .await
            .unwrap();

        assert_eq!(outcome.status, CheckStatus::Fail);
        assert!(outcome.detail.contains("command 2"));
        assert!(!marker.exists());
        assert!(!machine_state(&store).verified);
    }

    #[tokio::test]
    async fn test_expected_nonzero_exit_passes() {
        let temp = TempDir::new().unwrap();
        let machine = MachineSpec::default()
            .with_checks(Depth::Standard, vec![MachineCommand::new("exit 1").expect_exit(1)]);
        let mut store = store_with(&temp, machine);

        let outcome = CheckRunner::new()
            .run_item(&mut store, "backup", 0, Depth::Standard, "site")
            .await
            .unwrap();
        assert_eq!(outcome.status, CheckStatus::Pass);
        assert_eq!(machine_state(&store).depth, Some(Depth::Standard));
    }

    #[tokio::test]
    async fn test_output_mismatch_fails() {
        let temp = TempDir::new().unwrap();
        let machine = MachineSpec::default().with_checks(
            Depth::Basic,
            vec![MachineCommand::new("echo done").expect_output("^success$")],
        );
        let mut store = store_with(&temp, machine);

        let outcome = CheckRunner::new()
            .run_item(&mut store, "backup", 0, Depth::Basic, "site")
            .await
            .unwrap();
        assert_eq!(outcome.status, CheckStatus::Fail);
        assert!(outcome.detail.contains("did not match"));
    }

    #[tokio::test]
    async fn test_line_anchored_output_matches() {
        let temp = TempDir::new().unwrap();
        let machine = MachineSpec::default().with_checks(
            Depth::Basic,
            vec![MachineCommand::new("echo starting; echo ok").expect_output("^ok$")],
        );
        let mut store = store_with(&temp, machine);

        let outcome = CheckRunner::new()
            .run_item(&mut store, "backup", 0, Depth::Basic, "site")
            .await
            .unwrap();
        assert_eq!(outcome.status, CheckStatus::Pass, "{}", outcome.detail);
    }

    #[tokio::test]
    async fn test_binary_output_with_expected_exit_passes() {
        let temp = TempDir::new().unwrap();
        let machine = MachineSpec::default().with_checks(
            Depth::Basic,
            vec![MachineCommand::new("printf '\\377\\376\\n'; exit 0")],
        );
        let mut store = store_with(&temp, machine);

        let outcome = CheckRunner::new()
            .run_item(&mut store, "backup", 0, Depth::Basic, "site")
            .await
            .unwrap();
        assert_eq!(outcome.status, CheckStatus::Pass, "{}", outcome.detail);
        assert!(machine_state(&store).verified);
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let temp = TempDir::new().unwrap();
        let machine = MachineSpec::default().with_checks(
            Depth::Basic,
            vec![MachineCommand::new("sleep 5").timeout_seconds(1)],
        );
        let mut store = store_with(&temp, machine);

        let outcome = CheckRunner::new()
            .run_item(&mut store, "backup", 0, Depth::Basic, "site")
            .await
            .unwrap();
        assert_eq!(outcome.status, CheckStatus::Fail);
        assert!(outcome.detail.contains("timed out"));
    }

    #[tokio::test]
    async fn test_depths_are_independent() {
        let temp = TempDir::new().unwrap();
        let machine = MachineSpec::default()
            .with_checks(Depth::Basic, vec![MachineCommand::new("false")])
            .with_checks(Depth::Thorough, vec![MachineCommand::new("true")]);
        let mut store = store_with(&temp, machine);
        let runner = CheckRunner::new();

        let thorough = runner
            .run_item(&mut store, "backup", 0, Depth::Thorough, "site")
            .await
            .unwrap();
        assert_eq!(thorough.status, CheckStatus::Pass);

        let standard = runner
            .run_item(&mut store, "backup", 0, Depth::Standard, "site")
            .await
            .unwrap();
        assert_eq!(standard.status, CheckStatus::Skip);

        // fail leaves the earlier pass in place
        let basic = runner
            .run_item(&mut store, "backup", 0, Depth::Basic, "site")
            .await
            .unwrap();
        assert_eq!(basic.status, CheckStatus::Fail);
        assert_eq!(machine_state(&store).depth, Some(Depth::Thorough));
    }

    #[tokio::test]
    async fn test_item_without_machine_is_skip() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, MachineSpec::default());

        let outcome = CheckRunner::new()
            .run_item(&mut store, "backup", 1, Depth::Basic, "site")
            .await
            .unwrap();
        assert_eq!(outcome.status, CheckStatus::Skip);
    }

    #[tokio::test]
    async fn test_unknown_feature_is_error() {
        let temp = TempDir::new().unwrap();
        let mut store = store_with(&temp, MachineSpec::default());

        let result = CheckRunner::new()
            .run_item(&mut store, "nope", 0, Depth::Basic, "site")
            .await;
        assert!(result.is_err());
    }
}
