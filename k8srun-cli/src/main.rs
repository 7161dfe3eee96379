//! k8srun CLI
//!
//! Runs one job as a Kubernetes pod. The pod's output goes to stdout, logs go
//! to stderr, and the process exits with the pod's exit code (128 when the
//! runner itself failed).

mod config;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use k8srun_client::KubeCluster;
use k8srun_runner::Runner;
use k8srun_runner::status::MACHINERY_FAILURE;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout belongs to the pod
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "k8srun=info,k8srun_runner=info,k8srun_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            MACHINERY_FAILURE
        }
    };

    process::exit(code);
}

async fn run(cli: &Cli) -> Result<i32> {
    let job = cli.job();
    let runner_config = cli.runner_config()?;

    let cluster = KubeCluster::connect(&cli.cluster_config())
        .await
        .context("Failed to connect to cluster")?;
    let cluster = Arc::new(cluster);
    let runner = Runner::new(cluster.clone(), cluster, &runner_config);

    let cancel = CancellationToken::new();
    // Stops the watchers once the run is over.
    let _guard = cancel.clone().drop_guard();
    watch_for_cancellation(&cancel, cli.timeout());

    info!("Running job {} ({}/{})", job.name, job.instance, job.config);

    let mut stdout = tokio::io::stdout();
    let status = runner.run_with_cancel(&job, &mut stdout, &cancel).await;

    status.into_result().map_err(Into::into)
}

/// Cancels the run on Ctrl-C or once `timeout` has elapsed
fn watch_for_cancellation(cancel: &CancellationToken, timeout: Option<Duration>) {
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    warn!("Interrupted, cancelling run");
                    token.cancel();
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            },
        }
    });

    if let Some(timeout) = timeout {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    warn!("Timed out after {}s, cancelling run", timeout.as_secs());
                    token.cancel();
                }
            }
        });
    }
}
