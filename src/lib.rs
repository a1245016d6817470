//! Prompt Pipeline Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod oracle;
/// Orchestration core
///
/// The stage state machine, the correlation registry, and the hooks
/// connecting them.
pub mod pipeline;
pub mod state;
