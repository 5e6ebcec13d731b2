//! Verification state transitions
//!
//! All mutations of feature verification state go through [`StateMachine`]:
//! - manual verify / unverify
//! - checklist toggles with auto-verify and auto-unverify
//! - drift sweep (the only drift-driven mutation)
//! - notes and reset

use super::error::TransitionError;
use super::fingerprint::fingerprint;
use crate::models::{Feature, HistoryAction, VerificationDocument, CHECKLIST_ACTOR};
use chrono::Utc;
use std::path::Path;

/// Notes written onto a feature demoted by a sweep
pub const INVALIDATED_NOTE: &str = "Auto-invalidated: files changed";

/// History context for an auto-unverify caused by un-completing an item
pub const UNCOMPLETED_CONTEXT: &str = "checklist item uncompleted";

/// Actor recorded on entries written by a sweep
pub const SWEEP_ACTOR: &str = "check";

/// Read-only comparison of stored vs current fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftStatus {
    /// Feature is not verified; drift does not apply
    Unverified,
    /// Verified and files unchanged
    Fresh,
    /// Verified but files changed since verification (a sweep would demote it)
    Modified,
    /// Verified, and no declared file existed then or now
    Untracked,
}

impl DriftStatus {
    pub fn name(&self) -> &'static str {
        match self {
            DriftStatus::Unverified => "unverified",
            DriftStatus::Fresh => "verified",
            DriftStatus::Modified => "modified",
            DriftStatus::Untracked => "untracked",
        }
    }
}

/// What a checklist toggle caused beyond the item itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChecklistOutcome {
    pub auto_verified: bool,
    pub auto_unverified: bool,
}

/// Mutating view over a verification document
pub struct StateMachine<'a> {
    document: &'a mut VerificationDocument,
    project_root: &'a Path,
}

impl<'a> StateMachine<'a> {
    pub fn new(document: &'a mut VerificationDocument, project_root: &'a Path) -> Self {
        Self {
            document,
            project_root,
        }
    }

    fn feature_mut(&mut self, id: &str) -> Result<&mut Feature, TransitionError> {
        self.document
            .feature_mut(id)
            .ok_or_else(|| TransitionError::FeatureNotFound(id.to_string()))
    }

    /// Mark a feature verified against the current content of its files
    pub fn verify(&mut self, id: &str, actor: &str) -> Result<(), TransitionError> {
        let root = self.project_root;
        let feature = self.feature_mut(id)?;
        apply_verify(feature, root, actor);
        tracing::info!(feature = id, actor, "verified");
        Ok(())
    }

    /// Clear verification fields
    pub fn unverify(
        &mut self,
        id: &str,
        actor: &str,
        context: Option<&str>,
    ) -> Result<(), TransitionError> {
        let feature = self.feature_mut(id)?;
        apply_unverify(feature, actor, context.map(str::to_string));
        tracing::info!(feature = id, actor, "unverified");
        Ok(())
    }

    /// Complete or un-complete checklist item `index` (0-based)
    ///
    /// Completing the last open item verifies the feature as `"checklist"`
    /// unless it is already verified. Un-completing any item of a feature
    /// verified by `"checklist"` unverifies it.
    pub fn set_checklist_item(
        &mut self,
        id: &str,
        index: usize,
        completed: bool,
        actor: &str,
    ) -> Result<ChecklistOutcome, TransitionError> {
        let root = self.project_root;
        let feature = self.feature_mut(id)?;
        let len = feature.checklist.len();
        let Some(item) = feature.checklist.get_mut(index) else {
            return Err(TransitionError::ChecklistItemOutOfRange {
                feature: id.to_string(),
                index,
                len,
            });
        };

        let mut outcome = ChecklistOutcome::default();
        let context = Some(format!("item {}: {}", index + 1, item.text));

        if completed {
            item.completed = true;
            item.completed_by = Some(actor.to_string());
            item.completed_at = Some(Utc::now());
            feature.record(HistoryAction::ChecklistItemCompleted, actor, context);

            if feature.checklist_complete() && !feature.verified {
                apply_verify(feature, root, CHECKLIST_ACTOR);
                outcome.auto_verified = true;
                tracing::info!(feature = id, "auto-verified by checklist completion");
            }
        } else {
            item.completed = false;
            item.completed_by = None;
            item.completed_at = None;
            feature.record(HistoryAction::ChecklistItemUncompleted, actor, context);

            if feature.verified_by_checklist() {
                apply_unverify(feature, actor, Some(UNCOMPLETED_CONTEXT.to_string()));
                outcome.auto_unverified = true;
                tracing::info!(feature = id, "auto-unverified after item uncompleted");
            }
        }

        Ok(outcome)
    }

    /// Demote every verified feature whose files changed; returns demoted ids
    pub fn sweep(&mut self) -> Vec<String> {
        let root = self.project_root;
        let mut demoted = Vec::new();

        for (id, feature) in self.document.features.iter_mut() {
            if !feature.verified {
                continue;
            }

            let current = fingerprint(root, &feature.files);
            if current == feature.file_hash {
                continue;
            }

            feature.verified = false;
            feature.verified_by = None;
            feature.verified_at = None;
            feature.notes = Some(INVALIDATED_NOTE.to_string());
            feature.record(HistoryAction::Invalidated, SWEEP_ACTOR, None);

            tracing::info!(feature = %id, "invalidated: files changed");
            demoted.push(id.clone());
        }

        demoted
    }

    /// Replace a feature's notes
    pub fn set_notes(
        &mut self,
        id: &str,
        notes: Option<String>,
        actor: &str,
    ) -> Result<(), TransitionError> {
        let feature = self.feature_mut(id)?;
        feature.notes = notes.filter(|n| !n.trim().is_empty());
        feature.record(HistoryAction::NotesUpdated, actor, None);
        Ok(())
    }

    /// Clear verification and checklist progress for one feature or all of them
    ///
    /// Feature entries, files and checklist text are kept. Returns the reset ids.
    pub fn reset(&mut self, id: Option<&str>, actor: &str) -> Result<Vec<String>, TransitionError> {
        let ids: Vec<String> = match id {
            Some(id) => {
                self.feature_mut(id)?;
                vec![id.to_string()]
            }
            None => self.document.features.keys().cloned().collect(),
        };

        for id in &ids {
            let feature = self.feature_mut(id)?;
            let was_verified = feature.verified;

            feature.verified = false;
            feature.verified_by = None;
            feature.verified_at = None;
            feature.file_hash = None;
            feature.notes = None;

            for item in &mut feature.checklist {
                item.completed = false;
                item.completed_by = None;
                item.completed_at = None;
                if let Some(machine) = item.machine.as_mut() {
                    machine.state = Default::default();
                }
            }

            if was_verified {
                feature.record(HistoryAction::Unverified, actor, Some("reset".to_string()));
            }
        }

        Ok(ids)
    }
}

/// Read-only drift check for a feature; never mutates
pub fn drift(feature: &Feature, project_root: &Path) -> DriftStatus {
    if !feature.verified {
        return DriftStatus::Unverified;
    }

    let current = fingerprint(project_root, &feature.files);
    match (&feature.file_hash, &current) {
        (None, None) => DriftStatus::Untracked,
        (stored, current) if stored == current => DriftStatus::Fresh,
        _ => DriftStatus::Modified,
    }
}

/// Whether the feature's current fingerprint differs from the stored one
pub fn is_affected(feature: &Feature, project_root: &Path) -> bool {
    fingerprint(project_root, &feature.files) != feature.file_hash
}

fn apply_verify(feature: &mut Feature, root: &Path, actor: &str) {
    feature.verified = true;
    feature.verified_by = Some(actor.to_string());
    feature.verified_at = Some(Utc::now());
    feature.file_hash = fingerprint(root, &feature.files);
    feature.notes = None;
    feature.record(HistoryAction::Verified, actor, None);
}

fn apply_unverify(feature: &mut Feature, actor: &str, context: Option<String>) {
    feature.verified = false;
    feature.verified_by = None;
    feature.verified_at = None;
    feature.file_hash = None;
    feature.record(HistoryAction::Unverified, actor, context);
}
