//! scrubr - command-line front end for the sanitization service
//!
//! Drives the same orchestration layer a graphical client would: the
//! directory navigator, the wizard session and the progress monitor.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scrubr_common::api::{JobId, JobStatus, MappingId};
use scrubr_common::config::{load_toml_config, resolve_log_level};
use scrubr_common::events::WizardStep;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scrubr_client::api::{HttpApi, LocalFile, SanitizerApi, SseProgressChannel};
use scrubr_client::config::ClientSettings;
use scrubr_client::services::{DirectoryNavigator, MonitorView, ScanProgressMonitor};
use scrubr_client::store::FileStore;
use scrubr_client::wizard::{Dashboard, WizardContext};

/// Command-line arguments for scrubr
#[derive(Parser, Debug)]
#[command(name = "scrubr")]
#[command(about = "Client for the scrubr data sanitization service")]
#[command(version)]
struct Args {
    /// Base URL of the sanitization service
    #[arg(long, global = true)]
    server: Option<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory on the service host
    Browse {
        /// Directory to list (defaults to the last one visited)
        path: Option<String>,

        /// Include unsupported file types
        #[arg(long)]
        all: bool,

        /// Display page (100 entries per page)
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// List saved field mappings
    Mappings,

    /// Upload files and run a sanitization job to completion
    Run {
        /// Source file (repeatable)
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Field mapping id
        #[arg(long)]
        mapping: String,

        /// Output directory on the service host
        #[arg(long)]
        output: String,
    },

    /// Follow the progress of an existing job
    Watch { job_id: String },

    /// Request cancellation of a job
    Cancel { job_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_toml_config(args.config.as_deref());

    // RUST_LOG wins over the config file
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(resolve_log_level(&toml_config))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = ClientSettings::resolve(args.server.as_deref(), &toml_config);
    info!(server = %settings.server_url, "scrubr {}", env!("CARGO_PKG_VERSION"));

    let api: Arc<dyn SanitizerApi> = Arc::new(
        HttpApi::new(settings.server_url.clone(), settings.request_timeout)
            .context("Failed to build HTTP client")?,
    );
    let channel = Arc::new(
        SseProgressChannel::new(settings.server_url.clone())
            .context("Failed to build progress channel")?,
    );

    match args.command {
        Command::Browse { path, all, page } => {
            let store = Arc::new(FileStore::new(settings.state_file.clone()));
            let mut navigator = DirectoryNavigator::new(api, store, path).with_show_all(all);
            navigator.load().await;

            if let Some(error) = navigator.error() {
                bail!("{}", error);
            }

            println!("{}", navigator.current_path().unwrap_or("?"));
            let listing = navigator.page(page);
            for entry in &listing.entries {
                if entry.is_directory {
                    println!("  {}/", entry.name);
                } else {
                    let size = entry.size.map(|s| s.to_string()).unwrap_or_default();
                    println!("  {:<40} {:>12}", entry.name, size);
                }
            }
            println!(
                "page {}/{}",
                listing.pagination.page, listing.pagination.total_pages
            );
        }

        Command::Mappings => {
            let mappings = api.list_mappings().await.map_err(user_error)?;
            for mapping in mappings {
                println!("{:<24} {:<32} {} fields", mapping.id, mapping.name, mapping.field_count);
            }
        }

        Command::Run {
            files,
            mapping,
            output,
        } => {
            let context = WizardContext::new(api, channel).with_settings(settings.wizard_settings());
            let mut dashboard = Dashboard::new(context);
            let session = dashboard.start_new_job();

            session
                .upload(files.into_iter().map(LocalFile::new).collect())
                .await
                .map_err(user_error)?;
            if let Some(message) = session.message() {
                eprintln!("warning: {}", message);
            }
            if session.step() != WizardStep::Review {
                bail!("No files were accepted");
            }

            session.submit_review().map_err(|e| anyhow::anyhow!("{}", e))?;
            session.set_mapping(MappingId::from(mapping.as_str()));
            session.set_output_dir(output);
            session.start_processing().await.map_err(user_error)?;

            let mut updates = session.monitor_updates();
            let printer = tokio::spawn(async move {
                while updates.changed().await.is_ok() {
                    let view = updates.borrow_and_update().clone();
                    print_progress(&view);
                }
            });

            let finished = tokio::select! {
                step = session.wait_for_outcome() => Some(step),
                _ = tokio::signal::ctrl_c() => None,
            };
            printer.abort();

            match finished {
                None => {
                    session.stop().await.map_err(|e| anyhow::anyhow!("{}", e))?;
                    bail!("Job stopped");
                }
                Some(WizardStep::Complete) => {
                    if let Some(result) = session.result() {
                        println!(
                            "Done: {} records processed, {} sanitized -> {}",
                            result.records_processed, result.records_sanitized, result.output_path
                        );
                    }
                }
                Some(_) => {
                    bail!(
                        "{}",
                        session.processing_error().unwrap_or("The sanitization job did not finish.")
                    );
                }
            }
        }

        Command::Watch { job_id } => {
            let mut monitor = ScanProgressMonitor::new(api, channel)
                .with_poll_failure_threshold(settings.poll_failure_threshold);
            let mut updates = monitor.subscribe();
            monitor.activate(Some(JobId::from(job_id.as_str())));

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }

                let view = updates.borrow_and_update().clone();
                print_progress(&view);
                if view.is_terminal() {
                    break;
                }
            }
            monitor.deactivate();
        }

        Command::Cancel { job_id } => {
            api.cancel_job(&JobId::from(job_id.as_str()))
                .await
                .map_err(user_error)?;
            println!("Cancellation requested for {}", job_id);
        }
    }

    Ok(())
}

fn print_progress(view: &MonitorView) {
    let Some(snapshot) = &view.snapshot else {
        return;
    };

    let percent = snapshot
        .percent_complete
        .map(|p| format!("{:5.1}%", p))
        .unwrap_or_else(|| "  ?  ".to_string());
    let total = snapshot
        .total_records
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());
    let mode = if view.is_live { "live" } else { "poll" };

    println!(
        "[{}] {} {} {}/{} records",
        mode, snapshot.status, percent, snapshot.records_processed, total
    );

    if let Some(error) = &view.error {
        eprintln!("warning: {}", error);
    }
    if snapshot.status == JobStatus::Failed {
        if let Some(kind) = snapshot.error_kind {
            eprintln!("error: {}", kind.user_message());
        }
    }
}

fn user_error(e: scrubr_client::ClientError) -> anyhow::Error {
    anyhow::anyhow!("{}", e.user_message())
}
