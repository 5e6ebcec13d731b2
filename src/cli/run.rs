use super::Workspace;
use crate::models::{Depth, Statistics};
use crate::orchestrator::{
    CheckStatus, CommandProvisioner, ExistingFixture, Fixture, FixtureProvisioner, Orchestrator,
    RunOptions, RunSummary, RunTarget,
};
use crate::report;
use crate::Result;
use async_trait::async_trait;
use colored::Colorize;
use std::io::IsTerminal;

/// Stand-in used when neither `--site` nor `[fixture] create` is available
struct UnconfiguredFixture;

#[async_trait]
impl FixtureProvisioner for UnconfiguredFixture {
    async fn provision(&self) -> Result<Fixture> {
        anyhow::bail!(
            "Machine checks need a fixture: pass --site <id> or set [fixture] create in featverify.toml"
        )
    }

    async fn teardown(&self, _fixture: &Fixture) -> Result<()> {
        Ok(())
    }
}

fn provisioner(workspace: &Workspace, site: Option<&str>) -> Box<dyn FixtureProvisioner> {
    if let Some(site) = site {
        return Box::new(ExistingFixture::new(site));
    }
    match CommandProvisioner::from_config(&workspace.config.fixture) {
        Some(provisioner) => Box::new(provisioner),
        None => Box::new(UnconfiguredFixture),
    }
}

async fn execute(
    workspace: &Workspace,
    target: &RunTarget,
    depth: Depth,
    site: Option<&str>,
) -> Result<(RunSummary, Statistics)> {
    let mut store = workspace.open_store()?;
    let provisioner = provisioner(workspace, site);
    let options = RunOptions {
        categories: workspace.config.categories.clone(),
        show_progress: std::io::stdout().is_terminal(),
    };

    println!(
        "{}",
        format!("🤖 Running machine checks at depth '{}'...", depth).cyan()
    );

    let orchestrator = Orchestrator::new(provisioner.as_ref(), options);
    let summary = orchestrator.run(&mut store, target, depth).await?;
    Ok((summary, store.document().statistics.clone()))
}

fn print_summary(summary: &RunSummary) {
    let failures: Vec<_> = summary
        .results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .collect();

    if !failures.is_empty() {
        println!("\n{}", "❌ Failed items:".red().bold());
        for result in failures {
            println!(
                "   • {} #{} {}",
                result.feature_id,
                result.item_index + 1,
                result.text
            );
            println!("     {}", result.detail.dimmed());
        }
    }

    println!();
    println!(
        "   {} passed, {} failed, {} skipped ({} items, {:.1}% pass rate)",
        summary.passed.to_string().green(),
        summary.failed.to_string().red(),
        summary.skipped,
        summary.total(),
        summary.pass_rate()
    );

    if let Some(fixture) = &summary.fixture {
        if summary.fixture_preserved {
            println!(
                "{}",
                format!("   Fixture '{}' preserved for inspection", fixture.id).yellow()
            );
        }
    }
}

/// `run`: returns whether every executed item passed
pub async fn run(
    workspace: &Workspace,
    target: RunTarget,
    depth: Option<Depth>,
    site: Option<&str>,
) -> Result<bool> {
    let depth = depth.unwrap_or(workspace.config.default_depth);
    let (summary, _) = execute(workspace, &target, depth, site).await?;

    print_summary(&summary);
    if summary.success() {
        println!("{}", "✅ All machine checks passed".green().bold());
    }
    Ok(summary.success())
}

/// `ci`: run everything and emit artifacts; returns whether the pass rate
/// meets the configured threshold
pub async fn run_ci(
    workspace: &Workspace,
    depth: Option<Depth>,
    export_json: bool,
    junit: bool,
    site: Option<&str>,
) -> Result<bool> {
    let depth = depth.unwrap_or(workspace.config.default_depth);
    let (summary, statistics) = execute(workspace, &RunTarget::All, depth, site).await?;

    print_summary(&summary);

    let report_dir = workspace.project_root.join(&workspace.config.report_dir);
    if export_json {
        let path = report::write_coverage(&report_dir, &statistics, &summary)?;
        println!("   📄 {}", path.display());
    }
    if junit {
        let path = report::write_junit(&report_dir, &summary)?;
        println!("   📄 {}", path.display());
    }

    let threshold = workspace.config.ci_pass_threshold;
    let passed = summary.pass_rate() >= threshold;
    if passed {
        println!(
            "{}",
            format!("✅ Pass rate {:.1}% meets threshold {:.1}%", summary.pass_rate(), threshold)
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            format!("❌ Pass rate {:.1}% is below threshold {:.1}%", summary.pass_rate(), threshold)
                .red()
                .bold()
        );
    }
    Ok(passed)
}
