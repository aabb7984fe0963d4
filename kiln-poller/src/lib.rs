//! Kiln Poller
//!
//! Watches a submitted generation job until it finishes.
//!
//! [`PollingEngine::start`] spawns one task per job that queries the status
//! on a timer. Every snapshot goes to a [`PollObserver`], followed by
//! exactly one terminal callback: completion, error or cancellation.
//! Failed queries are retried with capped exponential backoff until the
//! budget in [`PollerConfig`] runs out.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kiln_client::JobClient;
//! use kiln_core::domain::credential::Credential;
//! use kiln_poller::{Callbacks, PollResult, PollerConfig, PollingEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Arc::new(JobClient::new("https://klingai.kuaishou.com")?);
//!     let engine = PollingEngine::new(client, PollerConfig::default());
//!
//!     let callbacks = Callbacks::new()
//!         .on_snapshot(|s| println!("status {}", s.application_status))
//!         .on_complete(|s| println!("done: {:?}", s.outputs()));
//!
//!     let subscription = engine.start("123".into(), Credential::new("session=..."), callbacks);
//!     if let PollResult::Failed(e) = subscription.wait().await {
//!         eprintln!("polling failed: {e}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod config;
mod engine;
pub mod error;
pub mod observer;
pub mod subscription;

pub use config::{PendingPolicy, PollerConfig};
pub use engine::PollingEngine;
pub use error::{AttemptError, ErrorKind, PollError};
pub use observer::{Callbacks, PollObserver};
pub use subscription::{PollPhase, PollResult, Subscription};
