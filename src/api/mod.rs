//! API module
//!
//! Contains HTTP request handlers for the pipeline dispatch endpoints

pub mod pipeline;

pub use pipeline::{begin_pipeline, modify_fixing_prompt, modify_verification_prompt};
