//! Machine-check runs across features

use super::check_runner::{CheckRunner, CheckStatus, ItemOutcome};
use super::fixture::{Fixture, FixtureProvisioner};
use crate::models::Depth;
use crate::state::{is_affected, Store, TransitionError};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::time::Duration;

/// Which features a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    Single(String),
    /// Features whose current fingerprint differs from the stored one
    Affected,
    All,
}

/// Knobs for a run that do not change its semantics
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Category order used to sequence features
    pub categories: Vec<String>,
    pub show_progress: bool,
}

/// Result for one checklist item in a run
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResult {
    pub feature_id: String,
    pub feature_name: String,
    pub item_index: usize,
    pub text: String,
    pub status: CheckStatus,
    pub detail: String,
    /// Captured output of a failing command
    pub output: String,
    pub duration: Duration,
}

/// Aggregated outcome of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub depth: Depth,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<ItemResult>,
    pub fixture: Option<Fixture>,
    /// Whether the fixture was kept because something failed
    pub fixture_preserved: bool,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// Percentage of executed (non-skipped) items that passed; 100 when nothing ran
    pub fn pass_rate(&self) -> f64 {
        let executed = self.passed + self.failed;
        if executed == 0 {
            return 100.0;
        }
        ((self.passed as f64 * 1000.0) / executed as f64).round() / 10.0
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, result: ItemResult) {
        match result.status {
            CheckStatus::Pass => self.passed += 1,
            CheckStatus::Fail => self.failed += 1,
            CheckStatus::Skip => self.skipped += 1,
        }
        self.results.push(result);
    }
}

/// Drives the check runner over a set of features sharing one fixture
pub struct Orchestrator<'a> {
    provisioner: &'a dyn FixtureProvisioner,
    runner: CheckRunner,
    options: RunOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(provisioner: &'a dyn FixtureProvisioner, options: RunOptions) -> Self {
        Self {
            provisioner,
            runner: CheckRunner::new(),
            options,
        }
    }

    /// Feature ids covered by `target`, in grouping order
    pub fn resolve_targets(&self, store: &Store, target: &RunTarget) -> Result<Vec<String>> {
        let document = store.document();
        let selected: BTreeSet<&str> = match target {
            RunTarget::Single(id) => {
                if document.feature(id).is_none() {
                    return Err(TransitionError::FeatureNotFound(id.clone()).into());
                }
                BTreeSet::from([id.as_str()])
            }
            RunTarget::Affected => document
                .features
                .iter()
                .filter(|(_, feature)| is_affected(feature, store.project_root()))
                .map(|(id, _)| id.as_str())
                .collect(),
            RunTarget::All => document.features.keys().map(String::as_str).collect(),
        };

        Ok(document
            .grouped(&self.options.categories)
            .into_iter()
            .flat_map(|group| group.feature_ids)
            .filter(|id| selected.contains(id.as_str()))
            .collect())
    }

    /// Run every checklist item of the targeted features at `depth`
    pub async fn run(&self, store: &mut Store, target: &RunTarget, depth: Depth) -> Result<RunSummary> {
        let feature_ids = self.resolve_targets(store, target)?;

        let mut work: Vec<(String, String, usize, String)> = Vec::new();
        let mut needs_fixture = false;
        for id in &feature_ids {
            if let Some(feature) = store.document().feature(id) {
                for (index, item) in feature.checklist.iter().enumerate() {
                    if item
                        .machine
                        .as_ref()
                        .is_some_and(|machine| machine.commands(depth).is_some())
                    {
                        needs_fixture = true;
                    }
                    work.push((id.clone(), feature.name.clone(), index, item.text.clone()));
                }
            }
        }

        let mut summary = RunSummary {
            depth,
            ..Default::default()
        };

        let fixture = if needs_fixture {
            let fixture = self.provisioner.provision().await?;
            tracing::info!(fixture = %fixture.id, "fixture ready");
            Some(fixture)
        } else {
            None
        };
        let fixture_id = fixture.as_ref().map(|f| f.id.clone()).unwrap_or_default();

        let progress = self.progress_bar(work.len() as u64);
        let mut aborted: Option<anyhow::Error> = None;

        for (feature_id, feature_name, item_index, text) in work {
            progress.set_message(format!("{} #{}", feature_id, item_index + 1));

            let outcome: ItemOutcome = match self
                .runner
                .run_item(store, &feature_id, item_index, depth, &fixture_id)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(
                        feature = %feature_id,
                        item = item_index + 1,
                        error = %e,
                        "run aborted"
                    );
                    aborted = Some(e);
                    break;
                }
            };

            tracing::debug!(
                feature = %feature_id,
                item = item_index + 1,
                status = outcome.status.name(),
                detail = %outcome.detail,
                "item finished"
            );

            summary.record(ItemResult {
                feature_id,
                feature_name,
                item_index,
                text,
                status: outcome.status,
                detail: outcome.detail,
                output: outcome.output,
                duration: outcome.duration,
            });
            progress.inc(1);
        }
        progress.finish_and_clear();

        // The fixture decision is made even when the run aborted
        if let Some(fixture) = &fixture {
            let result = if summary.failed == 0 && aborted.is_none() {
                self.provisioner.teardown(fixture).await
            } else {
                summary.fixture_preserved = true;
                self.provisioner.preserve(fixture).await
            };
            if let Err(e) = result {
                tracing::warn!(fixture = %fixture.id, error = %e, "fixture lifecycle step failed");
            }
        }
        summary.fixture = fixture;

        store.document_mut().refresh_statistics();
        if let Some(e) = aborted {
            return Err(e);
        }
        store.save()?;

        Ok(summary)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{bar:30.cyan/blue} {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("█▓░"),
        );
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChecklistItem, Feature, MachineCommand, MachineSpec, VerificationDocument,
    };
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingProvisioner {
        events: Mutex<Vec<String>>,
    }

    impl RecordingProvisioner {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FixtureProvisioner for RecordingProvisioner {
        async fn provision(&self) -> Result<Fixture> {
            self.events.lock().unwrap().push("provision".into());
            Ok(Fixture {
                id: "test-site".into(),
            })
        }

        async fn teardown(&self, _fixture: &Fixture) -> Result<()> {
            self.events.lock().unwrap().push("teardown".into());
            Ok(())
        }

        async fn preserve(&self, _fixture: &Fixture) -> Result<()> {
            self.events.lock().unwrap().push("preserve".into());
            Ok(())
        }
    }

    fn item(text: &str, cmd: Option<&str>) -> ChecklistItem {
        let item = ChecklistItem::new(text);
        match cmd {
            Some(cmd) => item.with_machine(
                MachineSpec::default().with_checks(Depth::Basic, vec![MachineCommand::new(cmd)]),
            ),
            None => item,
        }
    }

    fn setup(temp: &TempDir) -> Store {
        std::fs::write(temp.path().join("backup.sh"), "backup").unwrap();
        std::fs::write(temp.path().join("deploy.sh"), "deploy").unwrap();

        let mut backup = Feature::new("Backup");
        backup.category = Some("core".into());
        backup.files = vec!["backup.sh".into()];
        backup.checklist = vec![item("sql", Some("true")), item("manual", None)];

        let mut deploy = Feature::new("Deploy");
        deploy.category = Some("release".into());
        deploy.files = vec!["deploy.sh".into()];
        deploy.checklist = vec![item("deploys", Some("test {site} = test-site"))];

        let mut doc = VerificationDocument::default();
        doc.features.insert("backup".into(), backup);
        doc.features.insert("deploy".into(), deploy);
        Store::new(temp.path(), Path::new(".verification.yml"), doc)
    }

    fn options(categories: &[&str]) -> RunOptions {
        RunOptions {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            show_progress: false,
        }
    }

    #[tokio::test]
    async fn test_run_all_passes_and_tears_down() {
        let temp = TempDir::new().unwrap();
        let mut store = setup(&temp);
        let provisioner = RecordingProvisioner::default();
        let orchestrator = Orchestrator::new(&provisioner, options(&["release", "core"]));

        let summary = orchestrator
            .run(&mut store, &RunTarget::All, Depth::Basic)
            .await
            .unwrap();

        assert_eq!((summary.passed, summary.failed, summary.skipped), (2, 0, 1));
        assert!(summary.success());
        assert_eq!(provisioner.events(), vec!["provision", "teardown"]);
        assert!(!summary.fixture_preserved);

        // release group runs first
        assert_eq!(summary.results[0].feature_id, "deploy");

        let stats = &store.document().statistics;
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.machine.verified, 2);
    }

    #[tokio::test]
    async fn test_persist_error_still_preserves_fixture() {
        let temp = TempDir::new().unwrap();
        let mut store = setup(&temp);
        // A directory in the document's place makes the rename in save fail
        std::fs::create_dir(temp.path().join(".verification.yml")).unwrap();
        let provisioner = RecordingProvisioner::default();
        let orchestrator = Orchestrator::new(&provisioner, options(&[]));

        let result = orchestrator.run(&mut store, &RunTarget::All, Depth::Basic).await;

        assert!(result.is_err());
        assert_eq!(provisioner.events(), vec!["provision", "preserve"]);
        assert_eq!(store.document().statistics.total_items, 3);
    }

    #[tokio::test]
    async fn test_failure_preserves_fixture() {
        let temp = TempDir::new().unwrap();
        let mut store = setup(&temp);
        store.document_mut().features.get_mut("backup").unwrap().checklist[0] =
            item("sql", Some("false"));
        let provisioner = RecordingProvisioner::default();
        let orchestrator = Orchestrator::new(&provisioner, options(&[]));

        let summary = orchestrator
            .run(&mut store, &RunTarget::All, Depth::Basic)
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert!(!summary.success());
        assert!(summary.fixture_preserved);
        assert_eq!(provisioner.events(), vec!["provision", "preserve"]);
        assert_eq!(summary.pass_rate(), 50.0);
    }

    #[tokio::test]
    async fn test_no_checks_at_depth_skips_provisioning() {
        let temp = TempDir::new().unwrap();
        let mut store = setup(&temp);
        let provisioner = RecordingProvisioner::default();
        let orchestrator = Orchestrator::new(&provisioner, options(&[]));

        let summary = orchestrator
            .run(&mut store, &RunTarget::All, Depth::Paranoid)
            .await
            .unwrap();

        assert_eq!((summary.passed, summary.failed, summary.skipped), (0, 0, 3));
        assert!(provisioner.events().is_empty());
        assert!(summary.fixture.is_none());
        assert_eq!(summary.pass_rate(), 100.0);
    }

    #[tokio::test]
    async fn test_single_target_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let mut store = setup(&temp);
        let provisioner = RecordingProvisioner::default();
        let orchestrator = Orchestrator::new(&provisioner, options(&[]));
        let target = RunTarget::Single("backup".into());

        let first = orchestrator.run(&mut store, &target, Depth::Basic).await.unwrap();
        let second = orchestrator.run(&mut store, &target, Depth::Basic).await.unwrap();

        assert_eq!(
            (first.passed, first.failed, first.skipped),
            (second.passed, second.failed, second.skipped)
        );
        assert_eq!((first.passed, first.skipped), (1, 1));
    }

    #[tokio::test]
    async fn test_unknown_single_target() {
        let temp = TempDir::new().unwrap();
        let mut store = setup(&temp);
        let provisioner = RecordingProvisioner::default();
        let orchestrator = Orchestrator::new(&provisioner, options(&[]));

        let result = orchestrator
            .run(&mut store, &RunTarget::Single("nope".into()), Depth::Basic)
            .await;
        assert!(result.is_err());
        assert!(provisioner.events().is_empty());
    }

    #[test]
    fn test_affected_targets() {
        let temp = TempDir::new().unwrap();
        let mut store = setup(&temp);
        store.state_machine().verify("backup", "alice").unwrap();
        store.state_machine().verify("deploy", "alice").unwrap();

        let provisioner = RecordingProvisioner::default();
        let orchestrator = Orchestrator::new(&provisioner, options(&[]));
        assert!(orchestrator
            .resolve_targets(&store, &RunTarget::Affected)
            .unwrap()
            .is_empty());

        std::fs::write(temp.path().join("deploy.sh"), "deploy v2").unwrap();
        assert_eq!(
            orchestrator
                .resolve_targets(&store, &RunTarget::Affected)
                .unwrap(),
            vec!["deploy".to_string()]
        );
    }
}
