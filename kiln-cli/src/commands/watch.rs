//! Watch command handler
//!
//! Polls a job until it finishes, printing every snapshot. Ctrl-C stops
//! polling.

use anyhow::{Result, bail};
use colored::*;
use kiln_client::JobClient;
use kiln_core::domain::job::JobId;
use kiln_poller::{Callbacks, PollResult, PollingEngine};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::display::{failure_message, print_outputs, print_snapshot};

/// Follow a job until it reaches a terminal status
///
/// # Arguments
/// * `client` - Client used for the status queries
/// * `config` - The CLI configuration
/// * `job_id` - Job to follow
pub async fn watch_job(client: Arc<JobClient>, config: &Config, job_id: JobId) -> Result<()> {
    let engine = PollingEngine::new(client, config.poller.clone());

    println!("{}", format!("Watching job {}...", job_id).bold());

    let callbacks = Callbacks::new().on_snapshot(print_snapshot);
    let subscription = engine.start(job_id, config.credential.clone(), callbacks);

    let token = subscription.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling");
            token.cancel();
        }
    });

    let result = subscription.wait().await;
    interrupt.abort();

    match result {
        PollResult::Succeeded(snapshot) => {
            print_outputs(&snapshot);
            Ok(())
        }
        PollResult::Failed(error) => bail!(failure_message(&error)),
        PollResult::Cancelled => {
            println!("{}", "Cancelled.".yellow());
            bail!("polling cancelled before the job finished")
        }
    }
}
