// Core pipeline types
// Contains pipeline identifiers, stages, and the event payload
// exchanged between the orchestrator and dispatch calls

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a pipeline instance
///
/// Generated once when a pipeline starts and preserved across
/// fix-cycle restarts, so every event for one human-facing workflow
/// shares one id.
pub type PipelineId = String;

/// Generate a new unique pipeline id
/// Uses UUID v4 for uniqueness
pub fn new_pipeline_id() -> PipelineId {
    Uuid::new_v4().to_string()
}

/// Pipeline stage enumeration
///
/// Represents the point in the workflow a human edit is currently
/// awaited for, or a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// The pipeline has not been created yet (caller-implicit)
    UnStarted,
    /// Waiting for a human-edited verification criterion
    Verification,
    /// Waiting for a human-edited fixing instruction
    Fixing,
    /// Terminal state; the result is final
    Finished,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::UnStarted => "UnStarted",
            Stage::Verification => "Verification",
            Stage::Fixing => "Fixing",
            Stage::Finished => "Finished",
        };
        write!(f, "{}", name)
    }
}

/// Event reported by the orchestrator at each suspension point
///
/// Every dispatch call returns one of these to its caller. Optional
/// fields are omitted from the JSON body when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Id of the pipeline this event belongs to
    pub id: PipelineId,
    /// Stage hint for the caller. For a freshly generated round this
    /// names the post-edit transition target (Fixing), matching the
    /// eventual transition if verification rejects.
    pub stage: Stage,
    /// The latest generated result text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// The draft verification prompt for the human to edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// The draft fixing instruction for the human to edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixing_prompt: Option<String>,
    /// Short human-readable summary of the original request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl PipelineEvent {
    /// Event for a freshly generated round: result, draft verification
    /// prompt and summary, awaiting the human's verification edit
    pub fn generated(id: PipelineId, result: String, prompt: String, summary: String) -> Self {
        Self {
            id,
            stage: Stage::Fixing,
            result: Some(result),
            prompt: Some(prompt),
            fixing_prompt: None,
            summary: Some(summary),
        }
    }

    /// Event for a rejected round: carries the draft fixing
    /// instruction awaiting the human's edit
    pub fn fixing(id: PipelineId, fixing_prompt: String) -> Self {
        Self {
            id,
            stage: Stage::Fixing,
            result: None,
            prompt: None,
            fixing_prompt: Some(fixing_prompt),
            summary: None,
        }
    }

    /// Terminal event carrying the accepted result
    pub fn finished(id: PipelineId, result: String) -> Self {
        Self {
            id,
            stage: Stage::Finished,
            result: Some(result),
            prompt: None,
            fixing_prompt: None,
            summary: None,
        }
    }
}
