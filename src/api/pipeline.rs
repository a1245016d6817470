//! Pipeline dispatch handlers
//!
//! The three boundary operations of the orchestration core. Each one
//! is a single request/response exchange, yet the workflow it belongs
//! to spans many such exchanges: the handler resolves the registry
//! slot the suspended orchestrator is parked on, then itself parks on
//! a fresh event slot until the orchestrator reaches its next
//! suspension point or terminates. The workflow's true continuation
//! lives entirely in server-side memory between calls, addressed by
//! the pipeline id.

use crate::error::AppError;
use crate::pipeline::{
    new_pipeline_id, run_pipeline, PipelineEvent, PipelineId, RegistryHooks, Stage,
};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::oneshot;

const MAX_PROMPT_LENGTH: usize = 10000; // 10KB

/// Request body for starting a pipeline
#[derive(Deserialize, Debug)]
pub struct BeginPipelineRequest {
    /// The original request text
    pub prompt: String,
}

/// Request body for submitting an edited prompt
#[derive(Deserialize, Debug)]
pub struct EditPromptRequest {
    /// The human-edited prompt text
    pub prompt: String,
}

fn validate_prompt(prompt: &str) -> Result<(), AppError> {
    if prompt.len() > MAX_PROMPT_LENGTH {
        return Err(AppError::InvalidRequest(format!(
            "Prompt too long ({} > {} characters)",
            prompt.len(),
            MAX_PROMPT_LENGTH
        )));
    }
    Ok(())
}

/// Await the next workflow event for a dispatch call
async fn await_event(
    id: &PipelineId,
    rx: oneshot::Receiver<Result<PipelineEvent, String>>,
) -> Result<Json<PipelineEvent>, AppError> {
    let outcome = rx
        .await
        .map_err(|_| AppError::PipelineFailed(format!("Pipeline {} went away", id)))?;
    outcome.map(Json).map_err(AppError::PipelineFailed)
}

/// POST /api/pipeline - Start a new pipeline
///
/// Allocates an id, spawns the orchestrator for the given prompt, and
/// returns the first reported event: the generated result, the draft
/// verification prompt for the human to edit, and a short summary.
///
/// The orchestrator run is fire-and-forget from the dispatcher's
/// perspective; a failed run is logged and also fails whichever
/// dispatch call is waiting on the pipeline at that moment.
///
/// # Arguments
/// * `State(state)` - Application state
/// * `Json(request)` - The original request text
///
/// # Returns
/// * `Ok(Json(event))` - The first workflow event
/// * `Err(AppError)` - Validation failure or a dead run
pub async fn begin_pipeline(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BeginPipelineRequest>,
) -> Result<Json<PipelineEvent>, AppError> {
    validate_prompt(&request.prompt)?;

    let id = new_pipeline_id();
    tracing::info!(pipeline_id = %id, prompt_len = request.prompt.len(), "Starting pipeline");

    let rx = state.registry.create_event_slot(&id, Stage::Verification);

    let oracle = state.oracle.clone();
    let registry = state.registry.clone();
    let max_fix_cycles = state.max_fix_cycles;
    let task_id = id.clone();
    let prompt = request.prompt;
    tokio::spawn(async move {
        let hooks = RegistryHooks::new(registry.clone());
        if let Err(e) = run_pipeline(oracle.as_ref(), &hooks, &task_id, prompt, max_fix_cycles).await
        {
            tracing::error!(pipeline_id = %task_id, error = %e, "Pipeline run failed");
            if !registry.fail_event(&task_id, e.to_string()) {
                tracing::warn!(
                    pipeline_id = %task_id,
                    "Pipeline failed with no dispatch call waiting"
                );
            }
        }
    });

    await_event(&id, rx).await
}

/// POST /api/pipeline/:id/verification - Submit an edited verification prompt
///
/// Resolves the pipeline's pending verification edit, unblocking the
/// suspended orchestrator, then waits for the next workflow event:
/// either a fixing draft (the judgment rejected the result) or the
/// finished result.
///
/// # Arguments
/// * `State(state)` - Application state
/// * `Path(id)` - Pipeline id from the URL
/// * `Json(request)` - The edited verification criterion
///
/// # Returns
/// * `Ok(Json(event))` - The next workflow event
/// * `Err(AppError)` - Unknown id, stage mismatch, or a dead run
pub async fn modify_verification_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PipelineId>,
    Json(request): Json<EditPromptRequest>,
) -> Result<Json<PipelineEvent>, AppError> {
    submit_edit(state, id, request.prompt, Stage::Verification).await
}

/// POST /api/pipeline/:id/fixing - Submit an edited fixing prompt
///
/// Resolves the pipeline's pending fixing edit; the orchestrator
/// restarts the round with the fixed request. The returned event is
/// the new round's draft verification prompt (or, in principle, a
/// finished event).
///
/// # Arguments
/// * `State(state)` - Application state
/// * `Path(id)` - Pipeline id from the URL
/// * `Json(request)` - The edited fixing instruction
///
/// # Returns
/// * `Ok(Json(event))` - The next workflow event
/// * `Err(AppError)` - Unknown id, stage mismatch, or a dead run
pub async fn modify_fixing_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PipelineId>,
    Json(request): Json<EditPromptRequest>,
) -> Result<Json<PipelineEvent>, AppError> {
    submit_edit(state, id, request.prompt, Stage::Fixing).await
}

/// Shared body of the two edit-submission handlers
///
/// One resolve, one fresh-slot await. The event slot must exist
/// before the edit resolves: once the orchestrator is unblocked it
/// may report the next event immediately, and a report with no waiter
/// fails the run.
async fn submit_edit(
    state: Arc<AppState>,
    id: PipelineId,
    prompt: String,
    stage: Stage,
) -> Result<Json<PipelineEvent>, AppError> {
    validate_prompt(&prompt)?;
    tracing::info!(pipeline_id = %id, stage = %stage, "Submitting edited prompt");

    let rx = state.registry.create_event_slot(&id, stage);
    if let Err(e) = state.registry.resolve_edit(&id, stage, prompt) {
        // Back out the slot we just created; nothing will resolve it
        state.registry.remove_event_slot(&id);
        return Err(e.into());
    }

    await_event(&id, rx).await
}
