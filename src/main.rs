use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use featverify::cli::Workspace;
use featverify::models::Depth;
use featverify::orchestrator::RunTarget;
use featverify::Result;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Env var holding the tracing filter directive
const LOG_ENV: &str = "FEATVERIFY_LOG";

#[derive(Parser)]
#[command(name = "featverify")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Feature verification tracking: checklists, drift detection and machine checks", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Verification document, relative to the project root
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mark a feature verified against its current files
    Verify {
        /// Feature ID
        id: String,

        /// Who verified it (defaults to config, git user, then $USER)
        actor: Option<String>,
    },

    /// Clear a feature's verification
    Unverify {
        /// Feature ID
        id: String,
    },

    /// Complete (or undo) a checklist item
    Checklist {
        /// Feature ID
        id: String,

        /// Item number, starting at 1
        number: usize,

        /// Mark the item incomplete instead
        #[arg(long)]
        undo: bool,

        /// Who completed it
        #[arg(long)]
        by: Option<String>,
    },

    /// Set or clear (empty text) a feature's notes
    Notes {
        /// Feature ID
        id: String,

        /// Note text
        text: String,
    },

    /// Clear verification and checklist progress
    Reset {
        /// Only reset this feature
        #[arg(long)]
        feature: Option<String>,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Invalidate verified features whose files changed
    Check,

    /// Show one feature in detail
    Status {
        /// Feature ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List features by category
    List,

    /// Aggregate verification report
    Summary,

    /// Run machine checks
    Run(RunArgs),

    /// Run all machine checks and emit CI artifacts
    Ci {
        /// Check depth (defaults to config)
        #[arg(long, value_enum)]
        depth: Option<Depth>,

        /// Write coverage.json to the report directory
        #[arg(long)]
        export_json: bool,

        /// Write junit.xml to the report directory
        #[arg(long)]
        junit: bool,

        /// Use an existing fixture instead of provisioning one
        #[arg(long)]
        site: Option<String>,
    },

    /// Interactive console
    Console,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Check depth (defaults to config)
    #[arg(long, value_enum)]
    depth: Option<Depth>,

    /// Only this feature
    #[arg(long, conflicts_with_all = ["all", "affected"])]
    feature: Option<String>,

    /// Every feature (default)
    #[arg(long, conflicts_with = "affected")]
    all: bool,

    /// Only features whose files changed since verification
    #[arg(long)]
    affected: bool,

    /// Use an existing fixture instead of provisioning one
    #[arg(long)]
    site: Option<String>,
}

impl RunArgs {
    fn target(&self) -> RunTarget {
        match (&self.feature, self.affected) {
            (Some(id), _) => RunTarget::Single(id.clone()),
            (None, true) => RunTarget::Affected,
            (None, false) => RunTarget::All,
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}", format!("Error: Failed to create tokio runtime: {}", e).red());
            std::process::exit(1);
        }
    };

    match runtime.block_on(run_async(cli)) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}", format!("Error: {:#}", e).red());
            std::process::exit(1);
        }
    }
}

/// Dispatch a command; `Ok(false)` means a failing verdict
async fn run_async(cli: Cli) -> Result<bool> {
    if let Commands::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "featverify", &mut io::stdout());
        return Ok(true);
    }

    let workspace = Workspace::resolve(cli.project_root.as_deref(), cli.store.as_deref())?;
    tracing::debug!(
        root = %workspace.project_root.display(),
        store = %workspace.store_path.display(),
        "workspace resolved"
    );

    match cli.command {
        Commands::Verify { id, actor } => {
            featverify::cli::verify::run(&workspace, &id, actor.as_deref())?;
        }

        Commands::Unverify { id } => {
            featverify::cli::verify::run_unverify(&workspace, &id)?;
        }

        Commands::Checklist {
            id,
            number,
            undo,
            by,
        } => {
            featverify::cli::checklist::run(&workspace, &id, number, undo, by.as_deref())?;
        }

        Commands::Notes { id, text } => {
            featverify::cli::verify::run_notes(&workspace, &id, &text)?;
        }

        Commands::Reset { feature, yes } => {
            featverify::cli::verify::run_reset(&workspace, feature.as_deref(), yes)?;
        }

        Commands::Check => {
            featverify::cli::check::run(&workspace)?;
        }

        Commands::Status { id, json } => {
            featverify::cli::status::run(&workspace, &id, json)?;
        }

        Commands::List => {
            featverify::cli::list::run(&workspace)?;
        }

        Commands::Summary => {
            featverify::cli::list::run_summary(&workspace)?;
        }

        Commands::Run(args) => {
            let target = args.target();
            return featverify::cli::run::run(&workspace, target, args.depth, args.site.as_deref())
                .await;
        }

        Commands::Ci {
            depth,
            export_json,
            junit,
            site,
        } => {
            return featverify::cli::run::run_ci(
                &workspace,
                depth,
                export_json,
                junit,
                site.as_deref(),
            )
            .await;
        }

        Commands::Console => {
            featverify::cli::console::run(&workspace)?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(true)
}
