use super::Workspace;
use crate::Result;
use colored::Colorize;

/// `check`: sweep all verified features and demote those whose files changed
///
/// Returns the demoted feature ids.
pub fn run(workspace: &Workspace) -> Result<Vec<String>> {
    let mut store = workspace.open_store()?;

    println!("{}", "🔍 Checking verified features for file changes...".cyan());

    let demoted = store.state_machine().sweep();
    if demoted.is_empty() {
        println!("{}", "✅ No verified features have changed.".green());
        return Ok(demoted);
    }

    store.save()?;

    println!(
        "\n{}",
        format!("⚠️  {} feature(s) invalidated:", demoted.len())
            .yellow()
            .bold()
    );
    for id in &demoted {
        println!("   • {}", id);
    }

    Ok(demoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatverifyConfig, HistoryAction};
    use crate::state::Store;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    #[test]
    fn test_check_demotes_changed_feature() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("backup.sh"), "#!/bin/sh\necho backup\n").unwrap();
        std::fs::write(
            temp.path().join(".verification.yml"),
            "features:\n  backup:\n    name: Backup\n    files: [backup.sh]\n",
        )
        .unwrap();
        let ws = Workspace {
            project_root: temp.path().to_path_buf(),
            config: FeatverifyConfig::default(),
            store_path: PathBuf::from(".verification.yml"),
        };

        crate::cli::verify::run(&ws, "backup", Some("ci-bot")).unwrap();
        assert!(run(&ws).unwrap().is_empty());

        std::fs::write(temp.path().join("backup.sh"), "#!/bin/sh\necho backup\n# tweak\n").unwrap();
        assert_eq!(run(&ws).unwrap(), vec!["backup".to_string()]);

        let store = Store::open(temp.path(), Path::new(".verification.yml")).unwrap();
        let feature = store.document().feature("backup").unwrap();
        assert!(!feature.verified);
        assert_eq!(
            feature
                .history
                .iter()
                .filter(|h| h.action == HistoryAction::Invalidated)
                .count(),
            1
        );
    }
}
