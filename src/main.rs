use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use browser_matrix::capability::unique_platforms;
use browser_matrix::config;
use browser_matrix::{
    CapabilitySource, DriverFactory, MockDriverFactory, PlatformMatrix, RemoteDriverFactory,
    RemoteInventory, RunPlan, StaticInventory, TaskRegistry, run_matrix,
};

/// Browser Matrix - run browser tasks across a remote device grid
#[derive(Parser, Debug)]
#[command(
    name = "browser-matrix",
    about = "Run browser tasks against every supported platform of a remote WebDriver grid",
    after_help = "ENVIRONMENT VARIABLES:\n\
        BROWSERSTACK_USERNAME             Grid user name\n\
        BROWSERSTACK_ACCESS_KEY           Grid access key\n\
        BROWSERSTACK_LOCAL_IDENTIFIER     Local tunnel identifier\n\
        BROWSERSTACK_PROJECT_NAME         Project label for sessions\n\
        BROWSERSTACK_BUILD_NAME           Build label for sessions\n\
        BROWSER_MATRIX_HUB_URL            WebDriver hub URL\n\
        BROWSER_MATRIX_INVENTORY_URL      Browser inventory URL\n\
        BROWSER_MATRIX_TARGET             Base URL the tasks navigate to\n\
        BROWSER_MATRIX_REPORT             Report output path\n\
        BROWSER_MATRIX_CONCURRENCY        Sessions in flight at once\n\
        BROWSER_MATRIX_INTERVAL_MS        Minimum gap between dispatch bursts (ms)\n\
        BROWSER_MATRIX_TASK_TIMEOUT_MS    Per-task deadline (ms)\n\
        RUST_LOG                          Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the selected tasks on every supported platform
    Run {
        /// Read platforms from a JSON file instead of the grid inventory
        #[arg(short, long)]
        platforms: Option<PathBuf>,

        /// Resolution and minimum-version tables (JSON); built-in tables if omitted
        #[arg(short, long)]
        matrix: Option<PathBuf>,

        /// Task id to run (repeatable); all built-in tasks if omitted
        #[arg(short, long = "task")]
        tasks: Vec<String>,

        /// Use the in-process mock driver instead of the grid
        #[arg(long)]
        dry_run: bool,

        /// Report output path
        #[arg(short, long, env = "BROWSER_MATRIX_REPORT")]
        report: Option<PathBuf>,

        /// Also write results grouped by platform to this path
        #[arg(long)]
        grouped_report: Option<PathBuf>,

        /// Base URL the tasks navigate to
        #[arg(long, env = "BROWSER_MATRIX_TARGET")]
        target: Option<String>,

        /// Sessions in flight at once
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Minimum gap between dispatch bursts in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Per-task deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List the built-in tasks
    Tasks,

    /// List the distinct platforms the inventory offers
    Platforms {
        /// Read platforms from a JSON file instead of the grid inventory
        #[arg(short, long)]
        platforms: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = config::get();

    match args.command {
        Commands::Run {
            platforms,
            matrix,
            tasks,
            dry_run,
            report,
            grouped_report,
            target,
            concurrency,
            interval_ms,
            timeout_ms,
        } => {
            let mut settings = cfg.run.clone();
            if let Some(report) = report {
                settings.report_path = report;
            }
            if let Some(target) = target {
                settings.target = target;
            }
            if let Some(n) = concurrency.filter(|n| *n > 0) {
                settings.concurrency = n;
            }
            if let Some(ms) = interval_ms {
                settings.interval = Duration::from_millis(ms);
            }
            if let Some(ms) = timeout_ms {
                settings.task_timeout = Duration::from_millis(ms);
            }

            let matrix = match matrix {
                Some(path) => PlatformMatrix::load(&path)?,
                None => PlatformMatrix::builtin(),
            };
            let registry = TaskRegistry::builtin().select(&tasks)?;

            let factory: Arc<dyn DriverFactory> = if dry_run {
                Arc::new(MockDriverFactory::dry_run())
            } else {
                Arc::new(RemoteDriverFactory::from_settings(&cfg.grid)?)
            };
            tracing::info!(driver = factory.kind(), target = %settings.target, "starting run");

            let run = run_matrix(RunPlan {
                source: capability_source(platforms, &cfg.grid)?,
                matrix,
                registry,
                factory,
                grid: cfg.grid.clone(),
                settings,
                grouped_report,
            })
            .await?;

            println!("Run completed: {}", run.summary);
            println!("Report: {}", run.report_path.display());
        }

        Commands::Tasks => {
            for line in TaskRegistry::builtin().listing() {
                println!("{}", line);
            }
        }

        Commands::Platforms { platforms } => {
            let source = capability_source(platforms, &cfg.grid)?;
            let descriptors = source.platforms().await?;
            let unique = unique_platforms(&descriptors);
            for platform in &unique {
                println!("{}", platform);
            }
            println!("\n{} platforms ({} inventory entries)", unique.len(), descriptors.len());
        }
    }

    Ok(())
}

fn capability_source(
    platforms: Option<PathBuf>,
    grid: &config::GridSettings,
) -> Result<Arc<dyn CapabilitySource>, Box<dyn Error>> {
    match platforms {
        Some(path) => Ok(Arc::new(StaticInventory::new(path))),
        None => {
            if !grid.has_credentials() {
                return Err(format!(
                    "no platform file given and {} / {} are not set",
                    config::ENV_USERNAME,
                    config::ENV_ACCESS_KEY
                )
                .into());
            }
            Ok(Arc::new(RemoteInventory::from_settings(grid)?))
        }
    }
}
