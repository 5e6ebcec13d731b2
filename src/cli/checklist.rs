use super::Workspace;
use crate::Result;
use colored::Colorize;

/// `checklist <id> <n> [--undo] [--by NAME]`; `n` is 1-based
pub fn run(
    workspace: &Workspace,
    feature_id: &str,
    number: usize,
    undo: bool,
    by: Option<&str>,
) -> Result<()> {
    if number == 0 {
        anyhow::bail!("Checklist items are numbered from 1");
    }

    let mut store = workspace.open_store()?;
    let actor = by
        .map(str::to_string)
        .unwrap_or_else(|| workspace.config.actor());

    let outcome = store
        .state_machine()
        .set_checklist_item(feature_id, number - 1, !undo, &actor)?;
    store.save()?;

    if undo {
        println!(
            "{}",
            format!("☐ Item {} of '{}' marked incomplete", number, feature_id).yellow()
        );
    } else {
        println!(
            "{}",
            format!("☑ Item {} of '{}' completed", number, feature_id).green()
        );
    }

    if outcome.auto_verified {
        println!(
            "{}",
            format!("✅ All items complete: '{}' verified by checklist", feature_id)
                .green()
                .bold()
        );
    }
    if outcome.auto_unverified {
        println!(
            "{}",
            format!("↩️  '{}' is no longer verified", feature_id).yellow()
        );
    }

    Ok(())
}
