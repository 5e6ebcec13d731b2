//! Interactive console view
//!
//! Navigation state is an explicit [`Cursor`] and rendering is a pure
//! function of (document, groups, cursor); the read loop lives in
//! `cli::console`.

use crate::models::{FeatureGroup, Statistics, VerificationDocument};
use crate::state::{drift, DriftStatus};
use colored::Colorize;
use std::fmt::Write;
use std::path::Path;

/// Current selection: which category, and which feature within it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub category_index: usize,
    pub feature_index: usize,
}

impl Cursor {
    /// Clamp into the bounds of `groups`
    pub fn clamp(self, groups: &[FeatureGroup]) -> Self {
        if groups.is_empty() {
            return Self::default();
        }
        let category_index = self.category_index.min(groups.len() - 1);
        let len = groups[category_index].feature_ids.len();
        Self {
            category_index,
            feature_index: self.feature_index.min(len.saturating_sub(1)),
        }
    }

    pub fn next_feature(self, groups: &[FeatureGroup]) -> Self {
        let cursor = self.clamp(groups);
        let Some(group) = groups.get(cursor.category_index) else {
            return cursor;
        };
        if cursor.feature_index + 1 < group.feature_ids.len() {
            Self {
                feature_index: cursor.feature_index + 1,
                ..cursor
            }
        } else if cursor.category_index + 1 < groups.len() {
            Self {
                category_index: cursor.category_index + 1,
                feature_index: 0,
            }
        } else {
            cursor
        }
    }

    pub fn prev_feature(self, groups: &[FeatureGroup]) -> Self {
        let cursor = self.clamp(groups);
        if cursor.feature_index > 0 {
            Self {
                feature_index: cursor.feature_index - 1,
                ..cursor
            }
        } else if cursor.category_index > 0 {
            let category_index = cursor.category_index - 1;
            Self {
                category_index,
                feature_index: groups[category_index].feature_ids.len().saturating_sub(1),
            }
        } else {
            cursor
        }
    }

    pub fn next_category(self, groups: &[FeatureGroup]) -> Self {
        let cursor = self.clamp(groups);
        if cursor.category_index + 1 < groups.len() {
            Self {
                category_index: cursor.category_index + 1,
                feature_index: 0,
            }
        } else {
            cursor
        }
    }

    pub fn prev_category(self, groups: &[FeatureGroup]) -> Self {
        let cursor = self.clamp(groups);
        Self {
            category_index: cursor.category_index.saturating_sub(1),
            feature_index: 0,
        }
    }

    /// Id of the selected feature, if any
    pub fn selected<'g>(&self, groups: &'g [FeatureGroup]) -> Option<&'g str> {
        groups
            .get(self.category_index)?
            .feature_ids
            .get(self.feature_index)
            .map(String::as_str)
    }
}

/// Status marker for a feature in listings
pub fn status_marker(status: DriftStatus) -> String {
    match status {
        DriftStatus::Fresh => "✓".green().to_string(),
        DriftStatus::Untracked => "✓".green().to_string(),
        DriftStatus::Modified => "!".yellow().to_string(),
        DriftStatus::Unverified => "·".dimmed().to_string(),
    }
}

/// Render the console screen
pub fn render(
    document: &VerificationDocument,
    groups: &[FeatureGroup],
    cursor: Cursor,
    project_root: &Path,
) -> String {
    let mut out = String::new();
    // Live figures; the persisted statistics only change after a run
    let stats = Statistics::from_features(document.features.values());

    let _ = writeln!(out, "{}", "Feature verification".cyan().bold());
    let _ = writeln!(
        out,
        "   human {:.1}%   machine {:.1}%   full {:.1}%",
        stats.human.coverage_percent,
        stats.machine.coverage_percent,
        stats.fully_verified.coverage_percent
    );
    let _ = writeln!(out);

    if groups.is_empty() {
        let _ = writeln!(out, "{}", "No features defined.".yellow());
        return out;
    }

    let cursor = cursor.clamp(groups);

    for (category_index, group) in groups.iter().enumerate() {
        let heading = format!("{} ({})", group.name, group.feature_ids.len());
        if category_index == cursor.category_index {
            let _ = writeln!(out, "{}", heading.bold());
        } else {
            let _ = writeln!(out, "{}", heading.dimmed());
            continue;
        }

        for (feature_index, id) in group.feature_ids.iter().enumerate() {
            let Some(feature) = document.feature(id) else {
                continue;
            };
            let pointer = if feature_index == cursor.feature_index { ">" } else { " " };
            let _ = writeln!(
                out,
                " {} {} {:<24} {}/{}",
                pointer,
                status_marker(drift(feature, project_root)),
                id,
                feature.completed_items(),
                feature.checklist.len()
            );
        }
    }

    if let Some(id) = cursor.selected(groups) {
        if let Some(feature) = document.feature(id) {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", format!("{} ({})", feature.name, id).cyan().bold());
            if !feature.description.is_empty() {
                let _ = writeln!(out, "   {}", feature.description);
            }

            let status = drift(feature, project_root);
            let by = feature.verified_by.as_deref().unwrap_or("-");
            let _ = writeln!(out, "   Status: {} (by {})", status.name(), by);
            if let Some(notes) = &feature.notes {
                let _ = writeln!(out, "   Notes:  {}", notes);
            }

            for (index, item) in feature.checklist.iter().enumerate() {
                let human = if item.completed { "[x]" } else { "[ ]" };
                let machine = match &item.machine {
                    Some(m) if m.state.verified => "M".green().to_string(),
                    Some(_) => "m".dimmed().to_string(),
                    None => " ".to_string(),
                };
                let _ = writeln!(out, "   {:>2}. {} {} {}", index + 1, human, machine, item.text);
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        "n/p feature  ]/[ category  v verify  u unverify  t <n> toggle  c check  r refresh  q quit"
            .dimmed()
    );
    out
}
