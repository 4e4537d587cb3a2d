/// This module implements the full CLI interface for pagesync: command
/// parsing, argument validation and the async entrypoint.
///
/// All publishing logic (scan, plan, execution) lives in the
/// `pagesync-core` crate. This module is strictly CLI glue: it loads the
/// config, wires the AWS clients to the core contracts and reports the
/// outcome.
///
/// ## How To Use
/// - For command-line users: use the installed `pagesync` binary with
///   `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed
///   [`Cli`].
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pagesync_core::contract::CdnInvalidator;
use pagesync_core::publish::publish;

use crate::load_config::load_config;
use crate::store::{aws_sdk_config, CloudFrontInvalidator, S3Store};

/// CLI for pagesync: publish a rendered static site to a bucket behind a CDN.
#[derive(Parser)]
#[clap(
    name = "pagesync",
    version,
    about = "Sync a rendered static site to an object-storage bucket and invalidate the CDN"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Diff the local site against the bucket and apply the changes
    Publish {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Compute and report the transfer plan without mutating anything
        #[clap(long)]
        dry_run: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Publish { config, dry_run } => {
            let config = load_config(config)?;
            tracing::info!(command = "publish", dry_run, "Starting publish run");

            let sdk_config = aws_sdk_config(config.target.region.clone()).await;
            let store = S3Store::new(
                &sdk_config,
                &config.target.bucket,
                config.target.prefix.clone(),
            );

            let invalidator = config
                .target
                .cloudfront_distribution
                .as_deref()
                .map(|distribution| CloudFrontInvalidator::new(&sdk_config, distribution));

            let cdn: Option<&dyn CdnInvalidator> =
                invalidator.as_ref().map(|i| i as &dyn CdnInvalidator);

            match publish(&config.site.root, &config.publish, &store, cdn, dry_run).await {
                Ok(report) => {
                    tracing::info!(
                        command = "publish",
                        uploaded = report.uploaded.len(),
                        deleted = report.deleted.len(),
                        skipped = report.skipped,
                        invalidated = report.invalidated,
                        dry_run = report.dry_run,
                        "Publish complete"
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "publish", error = %e, "Publish failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
