//! Auto Assembly
//!
//! Evaluates FeatureScripts against many part studios at once and folds the
//! results into the mate maps used to build or mirror assemblies:
//! - Concurrent, bounded dispatch of remote evaluations
//! - Typed result schemas per script kind
//! - Mirror, auto-assembly and target-resolution aggregation
//! - A two-round orchestration pipeline with observable state

pub mod aggregate;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod remote;
pub mod scripts;
pub mod utils;

// Re-exports for convenience
pub use aggregate::{AutoAssemblyMap, MirrorRelationship, PartMaps, TargetMap, TargetResolver};
pub use config::EngineConfig;
pub use dispatch::{Dispatcher, LoadedScript};
pub use error::{EvalError, EvalResult};
pub use model::{DocumentRef, Evaluation, EvaluationResult, MateId, PartRef};
pub use orchestrator::{AssemblyBuilder, AutoAssemblyOutcome, Orchestrator, PipelineState};
pub use remote::{OnshapeEvaluator, RemoteEvaluator};
pub use scripts::{DirectoryScriptRegistry, InMemoryScriptRegistry, ScriptRegistry};
