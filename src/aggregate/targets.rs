//! Target resolution: the second evaluation round of auto-assembly.
//!
//! Each part studio discovered in the first round is evaluated once per mate
//! that points at it, and the reported target mate is linked back to the
//! original mate. Target documents shared by several mates are not
//! deduplicated.

use std::collections::BTreeMap;
use tracing::{debug, info};

use super::AutoAssemblyMap;
use crate::dispatch::{Dispatcher, LoadedScript};
use crate::error::EvalResult;
use crate::model::{Evaluation, MateId, TargetResult};
use crate::scripts::AUTO_ASSEMBLY_TARGET;

/// Target mate id to the original mate id that led to it.
pub type TargetMap = BTreeMap<MateId, MateId>;

pub struct TargetResolver {
    dispatcher: Dispatcher,
    script_name: String,
}

impl TargetResolver {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            script_name: AUTO_ASSEMBLY_TARGET.to_string(),
        }
    }

    pub fn with_script(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    /// Evaluate every target part studio and fold the answers.
    pub async fn resolve(&self, mates_to_targets: &AutoAssemblyMap) -> EvalResult<TargetMap> {
        let results = self.evaluate(mates_to_targets).await?;
        let targets = fold(results);
        info!("Resolved {} of {} target mates", targets.len(), mates_to_targets.len());
        Ok(targets)
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// One evaluation per mate, each result keyed by the mate that asked for it.
    pub async fn evaluate(
        &self,
        mates_to_targets: &AutoAssemblyMap,
    ) -> EvalResult<Vec<(MateId, Evaluation<TargetResult>)>> {
        let script = self.dispatcher.load_script(&self.script_name).await?;
        self.evaluate_with(mates_to_targets, &script).await
    }

    /// `evaluate` with a target script loaded up front by the caller.
    pub async fn evaluate_with(
        &self,
        mates_to_targets: &AutoAssemblyMap,
        script: &LoadedScript,
    ) -> EvalResult<Vec<(MateId, Evaluation<TargetResult>)>> {
        let jobs = mates_to_targets
            .iter()
            .map(|(mate_id, target)| (mate_id.clone(), target.clone()))
            .collect();

        self.dispatcher.dispatch_keyed_with(jobs, script).await
    }
}

/// Fold keyed target results in the order given, skipping invalid ones.
/// A target mate reported twice keeps the later original mate.
pub fn fold(results: impl IntoIterator<Item = (MateId, Evaluation<TargetResult>)>) -> TargetMap {
    let mut targets = TargetMap::new();
    for (original_mate_id, result) in results {
        let Some(TargetResult { target_mate_id }) = result.into_valid() else {
            debug!("No target mate resolved for '{}'", original_mate_id);
            continue;
        };
        if let Some(previous) = targets.insert(target_mate_id.clone(), original_mate_id) {
            debug!("Original mate for target '{}' replaced (was '{}')", target_mate_id, previous);
        }
    }
    targets
}
