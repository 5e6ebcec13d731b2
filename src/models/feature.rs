//! Feature, checklist and history types for the verification document

use super::machine::MachineSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `verified_by` value recorded when a feature is verified by completing its checklist
pub const CHECKLIST_ACTOR: &str = "checklist";

/// A named, independently verifiable unit of system capability
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Human-readable name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Grouping key used for run order and console navigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Files implementing the feature, relative to the project root (order matters)
    #[serde(default)]
    pub files: Vec<String>,

    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,

    #[serde(default)]
    pub verified: bool,

    /// Person who verified, or `"checklist"` when derived from checklist completion
    #[serde(default)]
    pub verified_by: Option<String>,

    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,

    /// Fingerprint of `files` at verification time
    #[serde(default)]
    pub file_hash: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    /// Append-only audit trail
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl Feature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether every checklist item is completed (false for an empty checklist)
    pub fn checklist_complete(&self) -> bool {
        !self.checklist.is_empty() && self.checklist.iter().all(|item| item.completed)
    }

    /// Number of completed checklist items
    pub fn completed_items(&self) -> usize {
        self.checklist.iter().filter(|item| item.completed).count()
    }

    /// Whether the verification came from checklist completion rather than a person
    pub fn verified_by_checklist(&self) -> bool {
        self.verified_by.as_deref() == Some(CHECKLIST_ACTOR)
    }

    /// Whether any checklist item carries machine checks
    pub fn has_machine_checks(&self) -> bool {
        self.checklist.iter().any(|item| item.machine.is_some())
    }

    pub fn record(&mut self, action: HistoryAction, by: impl Into<String>, context: Option<String>) {
        self.history.push(HistoryEntry {
            action,
            by: by.into(),
            at: Utc::now(),
            context,
        });
    }
}

/// One human- or machine-checkable assertion belonging to a feature
///
/// Authored documents may list items as bare strings; they load as
/// uncompleted items without machine checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawChecklistItem")]
pub struct ChecklistItem {
    pub text: String,
    pub completed: bool,
    pub completed_by: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachineSpec>,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_machine(mut self, machine: MachineSpec) -> Self {
        self.machine = Some(machine);
        self
    }

    /// Whether the machine track has a recorded pass for this item
    pub fn machine_verified(&self) -> bool {
        self.machine
            .as_ref()
            .is_some_and(|machine| machine.state.verified)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChecklistItem {
    Text(String),
    Full {
        text: String,
        #[serde(default)]
        completed: bool,
        #[serde(default)]
        completed_by: Option<String>,
        #[serde(default)]
        completed_at: Option<DateTime<Utc>>,
        #[serde(default)]
        machine: Option<MachineSpec>,
    },
}

impl From<RawChecklistItem> for ChecklistItem {
    fn from(raw: RawChecklistItem) -> Self {
        match raw {
            RawChecklistItem::Text(text) => ChecklistItem::new(text),
            RawChecklistItem::Full {
                text,
                completed,
                completed_by,
                completed_at,
                machine,
            } => ChecklistItem {
                text,
                completed,
                completed_by,
                completed_at,
                machine,
            },
        }
    }
}

/// Kinds of history entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Verified,
    Unverified,
    Invalidated,
    ChecklistItemCompleted,
    ChecklistItemUncompleted,
    NotesUpdated,
}

impl HistoryAction {
    pub fn name(&self) -> &'static str {
        match self {
            HistoryAction::Verified => "verified",
            HistoryAction::Unverified => "unverified",
            HistoryAction::Invalidated => "invalidated",
            HistoryAction::ChecklistItemCompleted => "checklist_item_completed",
            HistoryAction::ChecklistItemUncompleted => "checklist_item_uncompleted",
            HistoryAction::NotesUpdated => "notes_updated",
        }
    }
}

/// Audit record for one state change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub by: String,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}
