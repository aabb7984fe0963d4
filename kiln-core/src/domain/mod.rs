//! Core domain types
//!
//! These types represent the entities tracked while a generation job runs:
//! the job itself, the opaque credential used to talk to the service and
//! the snapshots produced by each status query.

pub mod credential;
pub mod job;
pub mod status;
