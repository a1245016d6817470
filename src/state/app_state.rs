// Application state
// Shared between all dispatch handlers via Arc

use crate::oracle::Oracle;
use crate::pipeline::PipelineRegistry;
use std::sync::Arc;

/// Main application state
///
/// One instance lives for the whole process. The registry carries its
/// own interior mutability, so handlers share a plain `Arc<AppState>`.
pub struct AppState {
    /// Correlation registry for suspended pipeline runs
    pub registry: Arc<PipelineRegistry>,
    /// The external text-generation capability
    pub oracle: Arc<dyn Oracle>,
    /// Rejected fix cycles allowed before a run gives up
    pub max_fix_cycles: u32,
}

impl AppState {
    /// Create application state around an oracle
    pub fn new(oracle: Arc<dyn Oracle>, max_fix_cycles: u32) -> Self {
        Self {
            registry: Arc::new(PipelineRegistry::new()),
            oracle,
            max_fix_cycles,
        }
    }
}
