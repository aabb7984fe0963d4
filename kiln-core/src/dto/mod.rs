//! Data Transfer Objects
//!
//! Request and response shapes exchanged with the generation service.

pub mod job;
pub mod upload;
