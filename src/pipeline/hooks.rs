//! Pipeline hooks
//!
//! The two collaborators the orchestrator needs from its caller: a
//! prompt-editing hook that suspends until a human supplies an edited
//! prompt, and a progress-report hook that delivers the next workflow
//! event to whatever dispatch call is polling for it.

use crate::pipeline::registry::PipelineRegistry;
use crate::pipeline::types::{PipelineEvent, PipelineId, Stage};
use crate::pipeline::PipelineError;
use async_trait::async_trait;
use std::sync::Arc;

/// Caller-supplied collaborators for a pipeline run
#[async_trait]
pub trait PipelineHooks: Send + Sync {
    /// Suspend until a human-edited version of `draft` arrives
    ///
    /// May block indefinitely; the orchestrator does not time out
    /// waiting. `stage` names the stage the edit satisfies.
    async fn edit(
        &self,
        id: &PipelineId,
        draft: &str,
        stage: Stage,
    ) -> Result<String, PipelineError>;

    /// Report a workflow event to the waiting dispatch call
    async fn report(&self, event: PipelineEvent) -> Result<(), PipelineError>;
}

/// Hooks backed by the correlation registry
///
/// `edit` parks the orchestrator on a fresh edit slot; `report`
/// resolves the pending event slot for the id.
pub struct RegistryHooks {
    registry: Arc<PipelineRegistry>,
}

impl RegistryHooks {
    /// Create hooks over `registry`
    pub fn new(registry: Arc<PipelineRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl PipelineHooks for RegistryHooks {
    async fn edit(
        &self,
        id: &PipelineId,
        _draft: &str,
        stage: Stage,
    ) -> Result<String, PipelineError> {
        // The draft itself already reached the client via the
        // preceding report; the slot only waits for the edited text.
        let rx = self.registry.create_edit_slot(id, stage);
        rx.await
            .map_err(|_| PipelineError::EditAbandoned(id.clone()))
    }

    async fn report(&self, event: PipelineEvent) -> Result<(), PipelineError> {
        self.registry.deliver_event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_edit_suspends_until_resolved() {
        let registry = Arc::new(PipelineRegistry::new());
        let hooks = RegistryHooks::new(registry.clone());
        let id: PipelineId = "p1".to_string();

        let edit_id = id.clone();
        let edit = tokio::spawn(async move {
            hooks
                .edit(&edit_id, "draft text", Stage::Verification)
                .await
        });

        // Let the hook park on its slot before resolving
        tokio::task::yield_now().await;
        registry
            .resolve_edit(&id, Stage::Verification, "human edit".to_string())
            .unwrap();

        assert_eq!(edit.await.unwrap().unwrap(), "human edit");
    }

    #[tokio::test]
    async fn test_report_delivers_to_event_slot() {
        let registry = Arc::new(PipelineRegistry::new());
        let hooks = RegistryHooks::new(registry.clone());
        let id: PipelineId = "p1".to_string();

        let rx = registry.create_event_slot(&id, Stage::Verification);
        hooks
            .report(PipelineEvent::finished(id.clone(), "done".to_string()))
            .await
            .unwrap();

        let event = rx.await.unwrap().unwrap();
        assert_eq!(event.stage, Stage::Finished);
    }

    #[tokio::test]
    async fn test_report_without_waiter_is_an_error() {
        let registry = Arc::new(PipelineRegistry::new());
        let hooks = RegistryHooks::new(registry);

        let result = hooks
            .report(PipelineEvent::finished("ghost".to_string(), "x".to_string()))
            .await;
        assert!(matches!(result, Err(PipelineError::NoEventWaiter(_))));
    }
}
