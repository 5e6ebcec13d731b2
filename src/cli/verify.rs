use super::Workspace;
use crate::Result;
use colored::Colorize;

/// `verify <id> [actor]`
pub fn run(workspace: &Workspace, feature_id: &str, actor: Option<&str>) -> Result<()> {
    let mut store = workspace.open_store()?;
    let actor = actor
        .map(str::to_string)
        .unwrap_or_else(|| workspace.config.actor());

    store.state_machine().verify(feature_id, &actor)?;
    store.save()?;

    println!(
        "{}",
        format!("✅ Verified '{}' (by {})", feature_id, actor).green()
    );
    Ok(())
}

/// `unverify <id>`
pub fn run_unverify(workspace: &Workspace, feature_id: &str) -> Result<()> {
    let mut store = workspace.open_store()?;
    let actor = workspace.config.actor();

    store.state_machine().unverify(feature_id, &actor, None)?;
    store.save()?;

    println!("{}", format!("↩️  Unverified '{}'", feature_id).yellow());
    Ok(())
}

/// `notes <id> <text>`; an empty text clears the notes
pub fn run_notes(workspace: &Workspace, feature_id: &str, notes: &str) -> Result<()> {
    let mut store = workspace.open_store()?;
    let actor = workspace.config.actor();

    store
        .state_machine()
        .set_notes(feature_id, Some(notes.to_string()), &actor)?;
    store.save()?;

    println!("{}", format!("📝 Updated notes for '{}'", feature_id).cyan());
    Ok(())
}

/// `reset [--feature ID] [--yes]`
pub fn run_reset(workspace: &Workspace, feature_id: Option<&str>, yes: bool) -> Result<()> {
    let mut store = workspace.open_store()?;

    if !yes {
        use dialoguer::Confirm;
        let scope = match feature_id {
            Some(id) => format!("feature '{}'", id),
            None => "ALL features".to_string(),
        };
        let proceed = Confirm::new()
            .with_prompt(format!("Clear verification and checklist progress for {}?", scope))
            .default(false)
            .interact()?;

        if !proceed {
            println!("   Reset cancelled");
            return Ok(());
        }
    }

    let actor = workspace.config.actor();
    let reset = store.state_machine().reset(feature_id, &actor)?;
    store.save()?;

    println!(
        "{}",
        format!("🔄 Reset {} feature(s)", reset.len()).yellow()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryAction, FeatverifyConfig};
    use crate::state::Store;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn workspace(temp: &TempDir) -> Workspace {
        std::fs::write(temp.path().join("backup.sh"), "#!/bin/sh\n").unwrap();
        std::fs::write(
            temp.path().join(".verification.yml"),
            "features:\n  backup:\n    name: Backup\n    files: [backup.sh]\n    checklist: [one, two]\n",
        )
        .unwrap();
        Workspace {
            project_root: temp.path().to_path_buf(),
            config: FeatverifyConfig {
                default_actor: Some("tester".into()),
                ..Default::default()
            },
            store_path: PathBuf::from(".verification.yml"),
        }
    }

    fn reload(temp: &TempDir) -> Store {
        Store::open(temp.path(), Path::new(".verification.yml")).unwrap()
    }

    #[test]
    fn test_verify_persists() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);

        run(&ws, "backup", Some("ci-bot")).unwrap();

        let store = reload(&temp);
        let feature = store.document().feature("backup").unwrap();
        assert!(feature.verified);
        assert_eq!(feature.verified_by.as_deref(), Some("ci-bot"));
    }

    #[test]
    fn test_verify_unknown_feature_fails_without_writing() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        let before = std::fs::read_to_string(temp.path().join(".verification.yml")).unwrap();

        let err = run(&ws, "nope", None).unwrap_err();
        assert!(err.to_string().contains("Feature not found"));

        let after = std::fs::read_to_string(temp.path().join(".verification.yml")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unverify_uses_configured_actor() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        run(&ws, "backup", None).unwrap();
        run_unverify(&ws, "backup").unwrap();

        let store = reload(&temp);
        let feature = store.document().feature("backup").unwrap();
        assert!(!feature.verified);
        let last = feature.history.last().unwrap();
        assert_eq!(last.action, HistoryAction::Unverified);
        assert_eq!(last.by, "tester");
    }

    #[test]
    fn test_reset_with_yes() {
        let temp = TempDir::new().unwrap();
        let ws = workspace(&temp);
        run(&ws, "backup", None).unwrap();
        run_notes(&ws, "backup", "flaky on CI").unwrap();

        run_reset(&ws, None, true).unwrap();

        let store = reload(&temp);
        let feature = store.document().feature("backup").unwrap();
        assert!(!feature.verified);
        assert!(feature.notes.is_none());
        assert_eq!(feature.checklist.len(), 2);
    }
}
