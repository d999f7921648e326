//! Orchestrator
//!
//! Runs one batch of part studios through dispatch and aggregation and, for
//! auto-assembly, through the second target-resolution round. Nothing
//! survives a call: every aggregate is built fresh and handed back whole, or
//! the call fails with no partial result.

mod state;

pub use state::PipelineState;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::aggregate::{auto_assembly, mirror, targets, MirrorRelationship, PartMaps, TargetMap, TargetResolver};
use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::error::EvalResult;
use crate::model::{AutoAssemblyResult, DocumentRef, MirrorResult};
use crate::remote::OnshapeEvaluator;
use crate::scripts::{DirectoryScriptRegistry, ASSEMBLY_MIRROR, AUTO_ASSEMBLY};

/// Consumer of the aggregate: creates the assembly and its mate features.
#[async_trait]
pub trait AssemblyBuilder: Send + Sync {
    async fn build(&self, part_maps: &PartMaps, target_mates: &TargetMap) -> Result<Value>;
}

/// Result of a full auto-assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoAssemblyOutcome {
    pub part_maps: PartMaps,
    pub target_mates: TargetMap,
}

pub struct Orchestrator {
    dispatcher: Dispatcher,
    state: watch::Sender<PipelineState>,
}

impl Orchestrator {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self { dispatcher, state }
    }

    /// HTTP evaluator and on-disk scripts, as configured.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let evaluator = Arc::new(OnshapeEvaluator::from_config(config)?);
        let scripts = Arc::new(DirectoryScriptRegistry::new(config.script_dir.clone()));
        let dispatcher = Dispatcher::new(evaluator, scripts).with_concurrency(config.concurrency);
        Ok(Self::new(dispatcher))
    }

    /// Watch pipeline transitions. With overlapping runs this reflects the
    /// most recent transition of any of them.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Mirror relationships across `part_studios`.
    pub async fn mirror(&self, part_studios: &HashSet<DocumentRef>) -> EvalResult<MirrorRelationship> {
        let outcome = self.run_mirror(part_studios).await;
        self.finish(outcome)
    }

    /// Auto-assembly discovery and mirror discovery over `part_studios`, then
    /// target resolution over every discovered mate.
    pub async fn auto_assembly(&self, part_studios: &HashSet<DocumentRef>) -> EvalResult<AutoAssemblyOutcome> {
        let outcome = self.run_auto_assembly(part_studios).await;
        self.finish(outcome)
    }

    /// `auto_assembly`, then hand the aggregate to `builder`.
    pub async fn generate(
        &self,
        part_studios: &HashSet<DocumentRef>,
        builder: &dyn AssemblyBuilder,
    ) -> Result<Value> {
        let outcome = self.auto_assembly(part_studios).await?;
        builder.build(&outcome.part_maps, &outcome.target_mates).await
    }

    async fn run_mirror(&self, part_studios: &HashSet<DocumentRef>) -> EvalResult<MirrorRelationship> {
        self.transition(PipelineState::Dispatching);
        let results = self
            .dispatcher
            .dispatch::<MirrorResult>(part_studios, ASSEMBLY_MIRROR)
            .await?;

        self.transition(PipelineState::Aggregating);
        let relationship = mirror::aggregate(results);
        info!(
            "Mirror aggregate: {} targeted, {} to origin",
            relationship.base_to_target_mates.len(),
            relationship.origin_base_mates.len()
        );
        Ok(relationship)
    }

    async fn run_auto_assembly(&self, part_studios: &HashSet<DocumentRef>) -> EvalResult<AutoAssemblyOutcome> {
        // Every script the run needs is resolved before the first remote call.
        let resolver = TargetResolver::new(self.dispatcher.clone());
        let (assembly_script, mirror_script, target_script) = tokio::try_join!(
            self.dispatcher.load_script(AUTO_ASSEMBLY),
            self.dispatcher.load_script(ASSEMBLY_MIRROR),
            self.dispatcher.load_script(resolver.script_name()),
        )?;

        self.transition(PipelineState::Dispatching);
        let (mates, mirrors) = tokio::try_join!(
            self.dispatcher.dispatch_with::<AutoAssemblyResult>(part_studios, &assembly_script),
            self.dispatcher.dispatch_with::<MirrorResult>(part_studios, &mirror_script),
        )?;

        self.transition(PipelineState::Aggregating);
        let part_maps = PartMaps::new(auto_assembly::aggregate(mates), mirror::aggregate(mirrors));
        info!(
            "Auto-assembly aggregate: {} mates with targets, {} mirrored, {} to origin",
            part_maps.mates_to_targets.len(),
            part_maps.mirror_mates.len(),
            part_maps.origin_mirror_mates.len()
        );

        self.transition(PipelineState::DispatchingTargets);
        let results = resolver
            .evaluate_with(&part_maps.mates_to_targets, &target_script)
            .await?;

        self.transition(PipelineState::AggregatingTargets);
        let target_mates = targets::fold(results);
        info!(
            "Resolved {} target mates from {} discovered",
            target_mates.len(),
            part_maps.mates_to_targets.len()
        );

        Ok(AutoAssemblyOutcome { part_maps, target_mates })
    }

    fn transition(&self, next: PipelineState) {
        let previous = self.state.send_replace(next);
        debug!("Pipeline state: {:?} -> {:?}", previous, next);
    }

    fn finish<T>(&self, outcome: EvalResult<T>) -> EvalResult<T> {
        match &outcome {
            Ok(_) => self.transition(PipelineState::Complete),
            Err(e) => {
                error!("Pipeline failed: {}", e);
                self.transition(PipelineState::Failed);
            }
        }
        outcome
    }
}
