use serde::Serialize;
use std::fmt;

/// Progress of one orchestration batch.
///
/// `Idle -> Dispatching -> Aggregating -> Complete` for mirror runs;
/// auto-assembly inserts `DispatchingTargets -> AggregatingTargets` before
/// `Complete`. Any unrecovered error ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Dispatching,
    Aggregating,
    DispatchingTargets,
    AggregatingTargets,
    Complete,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Dispatching => write!(f, "dispatching"),
            PipelineState::Aggregating => write!(f, "aggregating"),
            PipelineState::DispatchingTargets => write!(f, "dispatching_targets"),
            PipelineState::AggregatingTargets => write!(f, "aggregating_targets"),
            PipelineState::Complete => write!(f, "complete"),
            PipelineState::Failed => write!(f, "failed"),
        }
    }
}
