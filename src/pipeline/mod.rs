//! Pipeline module
//!
//! The orchestration core: a multi-step, human-in-the-loop workflow
//! whose steps are separated by arbitrary real-world delay. The
//! orchestrator suspends mid-workflow on registry slots; dispatch
//! entry points resolve those slots from independent inbound calls
//! and await the next workflow event in turn.

pub mod hooks;
pub mod registry;
pub mod runner;
pub mod types;

pub use hooks::{PipelineHooks, RegistryHooks};
pub use registry::PipelineRegistry;
pub use runner::{run_pipeline, Verdict};
pub use types::{new_pipeline_id, PipelineEvent, PipelineId, Stage};

use crate::oracle::OracleError;
use thiserror::Error;

/// Errors from the orchestration core
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No edit slot is pending for the id; either the id is unknown
    /// or the pipeline is not waiting for an edit
    #[error("No pending edit for pipeline {0}")]
    NoPendingEdit(PipelineId),

    /// The resolve targeted a slot waiting at a different stage
    #[error("Pipeline {id} is waiting at stage {expected}, caller claimed {claimed}")]
    StageMismatch {
        /// Pipeline id
        id: PipelineId,
        /// Stage the slot expects to be satisfied at
        expected: Stage,
        /// Stage the caller claimed to satisfy
        claimed: Stage,
    },

    /// The edit slot was replaced or its resolver disappeared while
    /// the orchestrator was suspended on it
    #[error("Edit for pipeline {0} was abandoned before resolution")]
    EditAbandoned(PipelineId),

    /// A report was made with no dispatch call waiting for it
    #[error("No event waiter for pipeline {0}")]
    NoEventWaiter(PipelineId),

    /// The waiting dispatch call went away before the event arrived
    #[error("Event for pipeline {0} could not be delivered")]
    EventNotDelivered(PipelineId),

    /// The judgment rejected every round up to the configured bound
    #[error("Pipeline {id} gave up after {cycles} rejected fix cycles")]
    FixCycleLimit {
        /// Pipeline id
        id: PipelineId,
        /// Number of rejected rounds before giving up
        cycles: u32,
    },

    /// The external capability failed or returned an undecodable
    /// structured result
    #[error(transparent)]
    Oracle(#[from] OracleError),
}
