//! Integration tests for the pipeline dispatch flow
//!
//! These tests drive the three boundary operations end to end with a
//! scripted oracle:
//! 1. Start a pipeline and receive the first event
//! 2. Submit edited verification/fixing prompts
//! 3. Stage and correlation errors
//! 4. Isolation between concurrent pipelines

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::Json;
use prompt_pipeline_backend::api::pipeline::{
    begin_pipeline, modify_fixing_prompt, modify_verification_prompt, BeginPipelineRequest,
    EditPromptRequest,
};
use prompt_pipeline_backend::error::AppError;
use prompt_pipeline_backend::oracle::{FunctionCall, FunctionDecl, Oracle, OracleError};
use prompt_pipeline_backend::pipeline::{PipelineEvent, Stage};
use prompt_pipeline_backend::state::AppState;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::Arc;

/// Oracle scripted with a queue of judgment verdicts
///
/// Plain asks are answered deterministically from the prompt text, so
/// tests can assert on which request produced which result.
struct ScriptedOracle {
    verdicts: Mutex<VecDeque<bool>>,
}

impl ScriptedOracle {
    fn new(verdicts: &[bool]) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn ask(&self, prompt: &str) -> Result<String, OracleError> {
        if prompt.starts_with("Summarize") {
            Ok("tiny summary".to_string())
        } else if prompt.starts_with("The following is a request") {
            Ok(format!("verify [{}]", prompt.lines().last().unwrap_or("")))
        } else {
            Ok(format!("answer to: {}", prompt))
        }
    }

    async fn ask_function(
        &self,
        _prompt: &str,
        functions: &[FunctionDecl],
    ) -> Result<FunctionCall, OracleError> {
        let verdict = self
            .verdicts
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected judgment call");
        Ok(FunctionCall {
            name: functions[0].name.clone(),
            arguments: json!({"correct": verdict, "reason": "scripted"}),
        })
    }
}

/// Helper to create test AppState around a scripted oracle
fn state_with_verdicts(verdicts: &[bool]) -> Arc<AppState> {
    Arc::new(AppState::new(Arc::new(ScriptedOracle::new(verdicts)), 8))
}

async fn begin(state: &Arc<AppState>, prompt: &str) -> PipelineEvent {
    begin_pipeline(
        State(state.clone()),
        Json(BeginPipelineRequest {
            prompt: prompt.to_string(),
        }),
    )
    .await
    .expect("begin_pipeline failed")
    .0
}

async fn submit_verification(
    state: &Arc<AppState>,
    id: &str,
    prompt: &str,
) -> Result<PipelineEvent, AppError> {
    modify_verification_prompt(
        State(state.clone()),
        Path(id.to_string()),
        Json(EditPromptRequest {
            prompt: prompt.to_string(),
        }),
    )
    .await
    .map(|json| json.0)
}

async fn submit_fixing(
    state: &Arc<AppState>,
    id: &str,
    prompt: &str,
) -> Result<PipelineEvent, AppError> {
    modify_fixing_prompt(
        State(state.clone()),
        Path(id.to_string()),
        Json(EditPromptRequest {
            prompt: prompt.to_string(),
        }),
    )
    .await
    .map(|json| json.0)
}

/// Test 1: A judgment that accepts on first evaluation yields exactly
/// one Finished event and no Fixing event
#[tokio::test]
async fn test_accepted_first_round_finishes() {
    let state = state_with_verdicts(&[true]);

    let first = begin(&state, "Write a limerick").await;
    assert!(!first.id.is_empty());
    assert_eq!(first.result.as_deref(), Some("answer to: Write a limerick"));
    assert!(first.prompt.is_some());
    assert_eq!(first.summary.as_deref(), Some("tiny summary"));

    let next = submit_verification(&state, &first.id, "Must rhyme properly")
        .await
        .unwrap();
    assert_eq!(next.stage, Stage::Finished);
    assert_eq!(next.result.as_deref(), Some("answer to: Write a limerick"));
    assert_eq!(next.id, first.id);
    assert!(next.fixing_prompt.is_none());
}

/// Test 2: A judgment that rejects once walks the full fix cycle:
/// begin -> verification (Fixing event) -> fixing (new verification
/// round) -> verification (Finished)
#[tokio::test]
async fn test_rejected_once_walks_fix_cycle() {
    let state = state_with_verdicts(&[false, true]);

    let first = begin(&state, "Write a limerick").await;
    let id = first.id.clone();

    // Rejected round: the next event carries a fixing draft seeded
    // from the prior result
    let fixing_event = submit_verification(&state, &id, "Must rhyme properly")
        .await
        .unwrap();
    assert_eq!(fixing_event.stage, Stage::Fixing);
    let fixing_draft = fixing_event.fixing_prompt.expect("expected a fixing draft");
    assert_eq!(fixing_draft, "answer to: answer to: Write a limerick");

    // Submitting the edited fix restarts the round; a fresh draft
    // verification prompt comes back
    let new_round = submit_fixing(&state, &id, "Rewrite it with a proper rhyme")
        .await
        .unwrap();
    assert_eq!(new_round.id, id);
    assert!(new_round.prompt.is_some());
    assert_eq!(
        new_round.result.as_deref(),
        Some("answer to: Rewrite it with a proper rhyme")
    );

    // Second verification round is accepted
    let finished = submit_verification(&state, &id, "Must rhyme properly")
        .await
        .unwrap();
    assert_eq!(finished.stage, Stage::Finished);
    assert_eq!(
        finished.result.as_deref(),
        Some("answer to: Rewrite it with a proper rhyme")
    );
}

/// Test 3: An id that was never started fails with a not-found error
/// and does not disturb other pipelines
#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let state = state_with_verdicts(&[true]);

    let first = begin(&state, "Write a limerick").await;

    let result = submit_verification(&state, "never-started", "criteria").await;
    assert!(matches!(result, Err(AppError::PipelineNotFound(_))));

    // The real pipeline is unaffected
    let finished = submit_verification(&state, &first.id, "Must rhyme properly")
        .await
        .unwrap();
    assert_eq!(finished.stage, Stage::Finished);
}

/// Test 4: Submitting a fixing edit while the pipeline waits for a
/// verification edit is rejected as a stage mismatch, and the
/// pipeline stays usable afterwards
#[tokio::test]
async fn test_stage_mismatch_rejected() {
    let state = state_with_verdicts(&[true]);

    let first = begin(&state, "Write a limerick").await;

    let result = submit_fixing(&state, &first.id, "not yet").await;
    assert!(matches!(result, Err(AppError::StageMismatch(_))));

    let finished = submit_verification(&state, &first.id, "Must rhyme properly")
        .await
        .unwrap();
    assert_eq!(finished.stage, Stage::Finished);
}

/// Test 5: Two pipelines run concurrently without cross-resolving
/// each other's slots
#[tokio::test]
async fn test_concurrent_pipelines_are_isolated() {
    let state = state_with_verdicts(&[true, true]);

    let a = begin(&state, "Question A").await;
    let b = begin(&state, "Question B").await;
    assert_ne!(a.id, b.id);
    assert_eq!(a.result.as_deref(), Some("answer to: Question A"));
    assert_eq!(b.result.as_deref(), Some("answer to: Question B"));

    // Finish them in the opposite order they were started
    let b_done = submit_verification(&state, &b.id, "criteria for B")
        .await
        .unwrap();
    assert_eq!(b_done.id, b.id);
    assert_eq!(b_done.result.as_deref(), Some("answer to: Question B"));

    let a_done = submit_verification(&state, &a.id, "criteria for A")
        .await
        .unwrap();
    assert_eq!(a_done.id, a.id);
    assert_eq!(a_done.result.as_deref(), Some("answer to: Question A"));
}

/// Test 6: The haiku scenario - begin returns an id, a draft
/// verification prompt and a short summary; an accepting judgment
/// finishes with the generated text
#[tokio::test]
async fn test_haiku_scenario() {
    let state = state_with_verdicts(&[true]);

    let first = begin(&state, "Write a haiku about rivers").await;
    assert!(first.prompt.is_some());
    let summary = first.summary.clone().unwrap();
    assert!(summary.len() <= 25);

    let finished = submit_verification(
        &state,
        &first.id,
        "Must be 5-7-5 syllables and mention water",
    )
    .await
    .unwrap();
    assert_eq!(finished.stage, Stage::Finished);
    assert_eq!(
        finished.result.as_deref(),
        Some("answer to: Write a haiku about rivers")
    );
}

/// Test 7: An over-long prompt is rejected before any state is created
#[tokio::test]
async fn test_oversized_prompt_rejected() {
    let state = state_with_verdicts(&[]);

    let result = begin_pipeline(
        State(state.clone()),
        Json(BeginPipelineRequest {
            prompt: "x".repeat(10001),
        }),
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidRequest(_))));
}

/// Test 8: A permanently rejecting judgment ends in a failed run
/// surfaced to the waiting dispatch call
#[tokio::test]
async fn test_fix_cycle_limit_surfaces_failure() {
    // max_fix_cycles = 1, judgment always rejects
    let state = Arc::new(AppState::new(
        Arc::new(ScriptedOracle::new(&[false, false])),
        1,
    ));

    let first = begin(&state, "Impossible request").await;
    let id = first.id.clone();

    let fixing_event = submit_verification(&state, &id, "criteria").await.unwrap();
    let fix = fixing_event.fixing_prompt.unwrap();

    let new_round = submit_fixing(&state, &id, &fix).await.unwrap();
    assert!(new_round.prompt.is_some());

    // The second rejection exhausts the bound; the awaiting call
    // surfaces the failed run instead of hanging
    let result = submit_verification(&state, &id, "criteria").await;
    match result {
        Err(AppError::PipelineFailed(message)) => {
            assert!(message.contains("gave up"), "unexpected message: {}", message);
        }
        other => panic!("Expected PipelineFailed, got {:?}", other.map(|e| e.stage)),
    }
}
