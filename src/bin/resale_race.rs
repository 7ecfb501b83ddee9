use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use resale_race::api::DataGovHttpClient;
use resale_race::catalog::Catalog;
use resale_race::error::PipelineError;
use resale_race::pipeline::{Pipeline, RunOptions};
use resale_race::store::DataDirectory;
use resale_race::sync::SyncOptions;

#[derive(Parser)]
#[command(name = "resale-race")]
#[command(about = "Sync HDB resale extracts and build the bar-chart-race data artifact")]
#[command(version, author)]
struct Cli {
    /// Root for cached metadata, raw extracts and the primary artifact.
    #[arg(long, global = true, default_value = "data")]
    data_dir: Utf8PathBuf,

    /// Publish location consumed by the visualization front-end.
    #[arg(long, global = true, default_value = "public")]
    public_dir: Utf8PathBuf,

    /// Catalog JSON overriding the built-in dataset list.
    #[arg(long, global = true)]
    catalog: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Re-download datasets whose remote version token moved")]
    Sync(SyncArgs),
    #[command(about = "Aggregate cached extracts and publish the artifact")]
    Build,
    #[command(about = "Sync, then build (default)")]
    Run(RunArgs),
}

#[derive(Args, Clone, Copy)]
struct SyncArgs {
    /// Ignore cached version tokens and re-download everything.
    #[arg(long)]
    force: bool,
}

#[derive(Args, Clone, Copy)]
struct RunArgs {
    #[arg(long)]
    force: bool,

    /// Skip synchronization and build from cached content only.
    #[arg(long)]
    skip_sync: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PipelineError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PipelineError) -> u8 {
    match error {
        PipelineError::MissingDatasets(_)
        | PipelineError::CatalogRead(_)
        | PipelineError::CatalogParse(_) => 2,
        PipelineError::ApiHttp(_)
        | PipelineError::ApiStatus { .. }
        | PipelineError::ApiPayload(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = match cli.catalog.as_deref() {
        Some(path) => Catalog::load(path).into_diagnostic()?,
        None => Catalog::hdb_resale(),
    };
    let store = DataDirectory::new(cli.data_dir, cli.public_dir);
    let client = DataGovHttpClient::new().into_diagnostic()?;
    let pipeline = Pipeline::new(store, catalog, client);

    match cli.command {
        Some(Commands::Sync(args)) => {
            let report = pipeline
                .sync(SyncOptions { force: args.force })
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).into_diagnostic()?
            );
        }
        Some(Commands::Build) => {
            let report = pipeline.build().into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).into_diagnostic()?
            );
        }
        Some(Commands::Run(args)) => {
            let report = pipeline
                .run(RunOptions {
                    skip_sync: args.skip_sync,
                    force: args.force,
                })
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).into_diagnostic()?
            );
        }
        None => {
            let report = pipeline.run(RunOptions::default()).into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).into_diagnostic()?
            );
        }
    }

    Ok(())
}
