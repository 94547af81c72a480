//! LeafGuard CLI: diagnose leaf photos and manage diagnosis history.
//!
//! Configuration comes from LEAFGUARD_* environment variables (or `.env`). Results go to
//! stdout; notices and logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use leafguard_api_client::ApiClient;
use leafguard_cli::{
    init_tracing, print_json, render_history_table, render_stats, truncate_string,
    StderrNotifier,
};
use leafguard_core::models::SelectedFile;
use leafguard_core::LeafguardConfig;
use leafguard_services::{initialize_state, AppState, Notifier, SubmissionOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "leafguard", about = "Plant disease diagnosis from leaf photos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose a leaf photo (JPEG, PNG or WEBP)
    Diagnose {
        /// Path to the image
        file: PathBuf,
        /// Do not record the result in history
        #[arg(long)]
        no_save: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate an image and print its preview data URI
    Preview {
        /// Path to the image
        file: PathBuf,
        /// Print the whole URI instead of a truncated one
        #[arg(long)]
        full: bool,
    },
    /// Diagnosis history
    History {
        #[command(subcommand)]
        sub: HistoryCommands,
    },
    /// Download a PDF report produced by the diagnosis endpoint
    Report {
        /// Report file name, e.g. 20240501_101500.pdf
        filename: String,
        /// Where to write the report
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List recorded diagnoses
    List {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Summary counters by treatment status
    Stats,
    /// Remove one entry by ID
    Remove {
        /// History entry ID
        id: String,
    },
    /// Remove all entries
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

const PREVIEW_DISPLAY_LEN: usize = 96;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = LeafguardConfig::from_env().context("Failed to load configuration")?;
    let notifier: Arc<dyn Notifier> = Arc::new(StderrNotifier);
    let state = initialize_state(config, notifier).await?;
    tracing::debug!(
        provider = %state.provider.name(),
        history = %state.history.backend_type().await,
        "LeafGuard initialized"
    );

    match cli.command {
        Commands::Diagnose {
            file,
            no_save,
            json,
        } => diagnose(&state, &file, no_save, json).await?,
        Commands::Preview { file, full } => {
            let session = state.new_session();
            session.select(read_image(&file)?).await?;
            let preview = session
                .preview()
                .await
                .context("No preview was produced")?;
            if full {
                println!("{}", preview.as_str());
            } else {
                println!("{}", truncate_string(preview.as_str(), PREVIEW_DISPLAY_LEN));
            }
        }
        Commands::History { sub } => match sub {
            HistoryCommands::List { format } => {
                let entries = state.history.list().await;
                match format {
                    OutputFormat::Table => print!("{}", render_history_table(&entries)),
                    OutputFormat::Json => print_json(&entries)?,
                }
            }
            HistoryCommands::Stats => {
                print!("{}", render_stats(&state.history.stats().await));
            }
            HistoryCommands::Remove { id } => {
                if state.history.remove(&id).await {
                    println!("Removed {}", id);
                } else {
                    eprintln!("No history entry with ID {}", id);
                }
            }
            HistoryCommands::Clear => {
                let outcome = state.history.clear().await?;
                println!("Removed {} entries", outcome.removed);
            }
        },
        Commands::Report { filename, output } => {
            let client = ApiClient::from_config(&state.config)?;
            let bytes = client.download_report(&filename).await?;
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Saved report to {} ({} bytes)", output.display(), bytes.len());
        }
    }

    Ok(())
}

async fn diagnose(state: &AppState, path: &Path, no_save: bool, json: bool) -> anyhow::Result<()> {
    let session = state.new_session();
    session.select(read_image(path)?).await?;

    let handle = session
        .submit()
        .await?
        .context("A diagnosis is already in progress")?;

    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(session_id = %session.id(), "Interrupted, cancelling diagnosis");
            session.reset().await;
            anyhow::bail!("Diagnosis cancelled");
        }
    };

    let result = match outcome {
        SubmissionOutcome::Completed(result) => result,
        SubmissionOutcome::Failed(e) => return Err(e.into()),
        SubmissionOutcome::Cancelled => anyhow::bail!("Diagnosis cancelled"),
    };

    let view = state.presenter.present(&result);
    if json {
        print_json(&view)?;
    } else {
        print!("{}", state.presenter.render_text(&view));
    }

    if !no_save {
        let entry = session.record(&state.history).await?;
        eprintln!("Saved to history as {}", entry.id);
    }
    Ok(())
}

fn read_image(path: &Path) -> anyhow::Result<SelectedFile> {
    SelectedFile::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
}
