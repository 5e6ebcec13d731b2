use super::Workspace;
use crate::models::{Depth, Feature};
use crate::state::{drift, DriftStatus, TransitionError};
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// `status <id>`: read-only detail for one feature
pub fn run(workspace: &Workspace, feature_id: &str, json: bool) -> Result<()> {
    let store = workspace.open_store()?;
    let feature = store
        .document()
        .feature(feature_id)
        .ok_or_else(|| TransitionError::FeatureNotFound(feature_id.to_string()))?;
    let status = drift(feature, store.project_root());

    if json {
        let value = serde_json::json!({
            "id": feature_id,
            "name": feature.name,
            "status": status.name(),
            "verified": feature.verified,
            "verified_by": feature.verified_by,
            "verified_at": feature.verified_at,
            "completed_items": feature.completed_items(),
            "total_items": feature.checklist.len(),
            "missing_files": missing_files(feature, store.project_root()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", format!("Status for: {} ({})", feature.name, feature_id).cyan().bold());
    println!();

    let status_text = match status {
        DriftStatus::Fresh | DriftStatus::Untracked => format!("✅ {}", status.name()).green(),
        DriftStatus::Modified => format!("⚠️  {} since verification", status.name()).yellow(),
        DriftStatus::Unverified => format!("⬜ {}", status.name()).bright_black(),
    };
    println!("   Status:    {}", status_text);

    if let Some(by) = &feature.verified_by {
        println!("   By:        {}", by);
    }
    if let Some(at) = &feature.verified_at {
        println!("   At:        {}", at.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(notes) = &feature.notes {
        println!("   Notes:     {}", notes);
    }
    if !feature.description.is_empty() {
        println!("   About:     {}", feature.description);
    }

    if !feature.files.is_empty() {
        println!("\n{}", "Files:".bold());
        let missing = missing_files(feature, store.project_root());
        for file in &feature.files {
            if missing.contains(&file.as_str()) {
                println!("   • {} {}", file, "(missing)".red());
            } else {
                println!("   • {}", file);
            }
        }
    }

    if !feature.checklist.is_empty() {
        println!(
            "\n{}",
            format!(
                "Checklist ({}/{}):",
                feature.completed_items(),
                feature.checklist.len()
            )
            .bold()
        );
        for (index, item) in feature.checklist.iter().enumerate() {
            let human = if item.completed { "[x]".green() } else { "[ ]".normal() };
            println!("   {:>2}. {} {}", index + 1, human, item.text);

            if let Some(machine) = &item.machine {
                let depths: Vec<&str> = Depth::ALL
                    .iter()
                    .filter(|d| machine.commands(**d).is_some())
                    .map(|d| d.name())
                    .collect();
                let state = if machine.state.verified {
                    format!(
                        "machine ✓ {} ({:.1}s)",
                        machine.state.depth.map(|d| d.name()).unwrap_or("?"),
                        machine.state.duration_seconds.unwrap_or_default()
                    )
                    .green()
                } else {
                    "machine –".dimmed()
                };
                println!("         {} [{}]", state, depths.join(", "));
            }
        }
    }

    Ok(())
}

fn missing_files<'a>(feature: &'a Feature, project_root: &Path) -> Vec<&'a str> {
    feature
        .files
        .iter()
        .filter(|file| !project_root.join(file.as_str()).exists())
        .map(String::as_str)
        .collect()
}
