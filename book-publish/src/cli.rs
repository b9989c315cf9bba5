//! CLI glue for book-publish: command parsing and the async entrypoint.
//!
//! The binary plays the host: it loads the project config, picks scratch storage,
//! owns the progress sink and hands a run context to the doc cloud publisher plugin.
//! All pipeline logic lives in `book_publish_core`.

use crate::load_config::load_config;
use anyhow::{Context, Result};
use book_publish_core::manifest::build_manifest;
use book_publish_core::plugin::{DocCloudPublisher, HostPlugin, RunContext, PUBLISH_TASK};
use book_publish_core::progress::AtomicProgress;
use book_publish_core::uploader::HttpUploader;
use book_publish_core::validate::validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for book-publish: package compiled books and push them to the doc cloud.
#[derive(Parser)]
#[clap(
    name = "book-publish",
    version,
    about = "Package compiled documentation books into one archive and publish it to a doc cloud"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate, package and upload every book in the config
    Publish {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Scratch directory for docs.json and the archive (wiped on every run)
        #[clap(long)]
        storage: Option<PathBuf>,
        /// Doc cloud upload URL, overriding config and environment
        #[clap(long)]
        endpoint: Option<String>,
        /// Current pipeline task; publishing only happens for "publish"
        #[clap(long, default_value = PUBLISH_TASK)]
        task: String,
    },
    /// Validate the config and print the manifest that would be published
    Validate {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Publish {
            config,
            storage,
            endpoint,
            task,
        } => {
            let config = load_config(config)?;
            config.project.trace_loaded();
            let ctx = RunContext {
                task,
                storage: storage.unwrap_or_else(|| config.publish.storage_dir.clone()),
                config: config.project.clone(),
            };
            // Other tasks need neither an endpoint nor an uploader.
            if !ctx.is_publish() {
                tracing::info!(task = %ctx.task, "Task is not a publish task, skipping");
                return Ok(());
            }

            let endpoint = match endpoint {
                Some(endpoint) => endpoint,
                None => config.endpoint()?.to_string(),
            };
            let uploader = HttpUploader::new(endpoint, config.timeout())
                .context("Failed to construct uploader")?;
            let plugin = DocCloudPublisher::new(uploader);
            tracing::info!(kind = ?plugin.install(), "Publisher plugin installed");
            if !plugin.check(&ctx) {
                tracing::info!(task = %ctx.task, "Publisher declined the run, skipping");
                return Ok(());
            }

            let progress = Arc::new(AtomicProgress::new());
            match plugin.handle(&ctx, progress.clone()).await {
                Ok(report) => {
                    tracing::info!(command = "publish", ?report, "Publish complete");
                    println!(
                        "Published {} ({} books, {} bytes)",
                        report.archive.display(),
                        report.books,
                        report.archive_size
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "publish", error = %e, "Publish failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::Validate { config } => {
            let config = load_config(config)?;
            config.project.trace_loaded();
            validate(&config.project)?;
            println!("{}", build_manifest(&config.project).to_json()?);
            Ok(())
        }
    }
}
