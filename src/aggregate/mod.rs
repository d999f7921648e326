//! Aggregation
//!
//! Folds completed evaluation results into the maps consumed by assembly
//! generation. Folding is sequential and pure: all inputs are already in
//! hand when it runs, so it cannot fail.

pub mod auto_assembly;
pub mod mirror;
pub mod targets;

pub use auto_assembly::AutoAssemblyMap;
pub use mirror::MirrorRelationship;
pub use targets::{TargetMap, TargetResolver};

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::MateId;

/// Everything assembly generation needs from one batch of part studios.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartMaps {
    pub mates_to_targets: AutoAssemblyMap,
    pub mirror_mates: BTreeMap<MateId, MateId>,
    pub origin_mirror_mates: BTreeSet<MateId>,
}

impl PartMaps {
    pub fn new(mates_to_targets: AutoAssemblyMap, mirrors: MirrorRelationship) -> Self {
        Self {
            mates_to_targets,
            mirror_mates: mirrors.base_to_target_mates,
            origin_mirror_mates: mirrors.origin_base_mates,
        }
    }
}
