//! Pipeline orchestrator
//!
//! Drives one workflow instance through its stage state machine:
//! generate a result, derive a verification criterion, suspend for
//! the human edit, judge the result against the edited criterion,
//! and either finish or derive a fixing instruction, suspend for its
//! edit, and restart the round with the fixed request.
//!
//! The original design re-entered the machine recursively on every
//! rejected round with no bound; here the restart is an explicit
//! loop with an enforced maximum, so a permanently-rejecting
//! judgment becomes a typed give-up error instead of spinning
//! forever.

use crate::oracle::{ask_structured, FunctionDecl, Oracle, OracleError};
use crate::pipeline::hooks::PipelineHooks;
use crate::pipeline::types::{PipelineEvent, PipelineId, Stage};
use crate::pipeline::PipelineError;
use serde::Deserialize;
use serde_json::json;

/// Judgment returned by the correctness evaluation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Verdict {
    /// Whether the result fulfills the verification criteria
    pub correct: bool,
    /// Explanation for the judgment
    pub reason: String,
}

/// Function the judgment oracle call must invoke
fn correctness_function() -> FunctionDecl {
    FunctionDecl {
        name: "evaluate_correctness".to_string(),
        description: "Evaluate the correctness of an operation and provide a reason".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "correct": {
                    "type": "boolean",
                    "description": "Indicates whether the operation is correct"
                },
                "reason": {
                    "type": "string",
                    "description": "Explains why the operation is correct or incorrect"
                }
            },
            "required": ["correct", "reason"]
        }),
    }
}

fn summary_request(prompt: &str) -> String {
    format!(
        "Summarize the following request in under 25 characters:\n{}",
        prompt
    )
}

fn verification_request(prompt: &str) -> String {
    format!(
        "The following is a request to a language model.\n\
         Can you respond with a prompt which will be used to verify \
         that the language model completed the request in the prompt correctly?\n{}",
        prompt
    )
}

fn judgment_request(criteria: &str, result: &str) -> String {
    format!(
        "The following is a criteria for completion of a request: \"{}\".\n\
         Does the following response to the request fulfill the criteria?\n{}",
        criteria, result
    )
}

/// Run one pipeline instance to completion
///
/// Suspends at each `edit` call until a dispatch entry point resolves
/// the corresponding registry slot; there is no timeout. The id is
/// preserved across fix-cycle restarts, so all reports for one
/// human-facing workflow share one id.
///
/// # Arguments
/// * `oracle` - The text-generation capability
/// * `hooks` - Caller-supplied edit and report collaborators
/// * `id` - Pipeline instance id
/// * `initial_prompt` - The original request text
/// * `max_fix_cycles` - Rejected rounds allowed before giving up
///
/// # Returns
/// * `Ok(String)` - The accepted result text
/// * `Err(PipelineError)` - Oracle/judgment failure, an abandoned
///   suspension, or the fix-cycle limit
pub async fn run_pipeline(
    oracle: &dyn Oracle,
    hooks: &dyn PipelineHooks,
    id: &PipelineId,
    initial_prompt: String,
    max_fix_cycles: u32,
) -> Result<String, PipelineError> {
    let mut request = initial_prompt;

    for cycle in 0..=max_fix_cycles {
        tracing::info!(pipeline_id = %id, cycle, "Starting pipeline round");

        let result = oracle.ask(&request).await?;
        let summary = oracle.ask(&summary_request(&request)).await?;
        let draft = oracle.ask(&verification_request(&request)).await?;

        hooks
            .report(PipelineEvent::generated(
                id.clone(),
                result.clone(),
                draft.clone(),
                summary,
            ))
            .await?;

        let criteria = hooks.edit(id, &draft, Stage::Verification).await?;

        let verdict: Verdict = ask_structured(
            oracle,
            &judgment_request(&criteria, &result),
            &[correctness_function()],
            |call| {
                serde_json::from_value(call.arguments)
                    .map_err(|e| OracleError::Decode(e.to_string()))
            },
        )
        .await?;

        if verdict.correct {
            hooks
                .report(PipelineEvent::finished(id.clone(), result.clone()))
                .await?;
            tracing::info!(pipeline_id = %id, cycle, "Pipeline finished");
            return Ok(result);
        }

        // Give up at the bound instead of deriving another fixing
        // draft the human would edit for nothing
        if cycle == max_fix_cycles {
            return Err(PipelineError::FixCycleLimit {
                id: id.clone(),
                cycles: max_fix_cycles,
            });
        }

        tracing::info!(
            pipeline_id = %id,
            cycle,
            reason = %verdict.reason,
            "Verification rejected, entering fix cycle"
        );

        // The prior result seeds the corrective instruction
        let fixing_draft = oracle.ask(&result).await?;
        hooks
            .report(PipelineEvent::fixing(id.clone(), fixing_draft.clone()))
            .await?;
        request = hooks.edit(id, &fixing_draft, Stage::Fixing).await?;
    }

    // Unreachable: the final iteration returns at the bound check
    Err(PipelineError::FixCycleLimit {
        id: id.clone(),
        cycles: max_fix_cycles,
    })
}
