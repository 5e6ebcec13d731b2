use super::Workspace;
use crate::models::{Statistics, VerificationDocument};
use crate::state::{drift, DriftStatus};
use crate::ui::console::status_marker;
use crate::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;

/// `list`: every feature grouped by category with its drift status
pub fn run(workspace: &Workspace) -> Result<()> {
    let store = workspace.open_store()?;
    let document = store.document();

    println!("{}", "📋 Features".cyan());

    if document.features.is_empty() {
        println!("{}", "No features defined.".yellow());
        return Ok(());
    }

    for group in document.grouped(&workspace.config.categories) {
        println!("\n{}", format!("{}:", group.name).green().bold());
        for id in &group.feature_ids {
            let Some(feature) = document.feature(id) else {
                continue;
            };
            let status = drift(feature, store.project_root());
            let suffix = match status {
                DriftStatus::Modified => format!(" ({})", status.name()).yellow().to_string(),
                _ => String::new(),
            };
            println!(
                "   {} {:<28} {}/{}{}",
                status_marker(status),
                id,
                feature.completed_items(),
                feature.checklist.len(),
                suffix
            );
        }
    }

    Ok(())
}

/// Counts of features in each drift state
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FeatureCounts {
    pub total: usize,
    pub verified: usize,
    pub modified: usize,
    pub unverified: usize,
}

impl FeatureCounts {
    pub fn from_document(document: &VerificationDocument, project_root: &Path) -> Self {
        let mut counts = Self::default();
        for feature in document.features.values() {
            counts.total += 1;
            match drift(feature, project_root) {
                DriftStatus::Fresh | DriftStatus::Untracked => counts.verified += 1,
                DriftStatus::Modified => counts.modified += 1,
                DriftStatus::Unverified => counts.unverified += 1,
            }
        }
        counts
    }
}

/// `summary`: aggregate counts and coverage, recomputed from the live document
pub fn run_summary(workspace: &Workspace) -> Result<()> {
    let store = workspace.open_store()?;
    let document = store.document();
    let counts = FeatureCounts::from_document(document, store.project_root());
    let stats = Statistics::from_features(document.features.values());

    println!("{}", "📊 Verification summary".cyan().bold());
    println!();
    println!("   Features:        {}", counts.total);
    println!("   Verified:        {}", counts.verified.to_string().green());
    if counts.modified > 0 {
        println!("   Modified:        {}", counts.modified.to_string().yellow());
    }
    println!("   Unverified:      {}", counts.unverified);
    println!();
    println!("   Checklist items: {}", stats.total_items);
    println!(
        "   Human:           {} ({:.1}%)",
        stats.human.verified, stats.human.coverage_percent
    );
    println!(
        "   Machine:         {} ({:.1}%)",
        stats.machine.verified, stats.machine.coverage_percent
    );
    println!(
        "   Both:            {} ({:.1}%)",
        stats.fully_verified.verified, stats.fully_verified.coverage_percent
    );

    let by_category = category_counts(document);
    if by_category.len() > 1 {
        println!("\n{}", "By category:".bold());
        for (category, (verified, total)) in by_category {
            println!("   {:<20} {}/{}", category, verified, total);
        }
    }

    Ok(())
}

fn category_counts(document: &VerificationDocument) -> BTreeMap<&str, (usize, usize)> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for feature in document.features.values() {
        let category = feature
            .category
            .as_deref()
            .unwrap_or(crate::models::UNCATEGORIZED);
        let entry = counts.entry(category).or_default();
        entry.1 += 1;
        if feature.verified {
            entry.0 += 1;
        }
    }
    counts
}
