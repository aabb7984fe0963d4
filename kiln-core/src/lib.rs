//! Kiln Core
//!
//! Core types shared by the Kiln generation client, polling engine and CLI.
//!
//! This crate contains:
//! - Domain types: jobs, credentials and decoded status snapshots
//! - DTOs: request and response shapes exchanged with the generation service

pub mod domain;
pub mod dto;
