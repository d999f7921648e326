//! Auto-assembly aggregation: which part studio each mate connects against.

use std::collections::BTreeMap;
use tracing::debug;

use crate::model::{AutoAssemblyResult, DocumentRef, Evaluation, MateId};

/// Mate id to the part studio it should be auto-connected against.
pub type AutoAssemblyMap = BTreeMap<MateId, DocumentRef>;

/// Fold auto-assembly results in the order given, skipping invalid ones.
///
/// Mate ids are only unique per document, so two part studios can report the
/// same id. The later one wins.
pub fn aggregate(results: impl IntoIterator<Item = Evaluation<AutoAssemblyResult>>) -> AutoAssemblyMap {
    let mut mates_to_targets = AutoAssemblyMap::new();
    for result in results.into_iter().filter_map(Evaluation::into_valid) {
        for mate in result.mates {
            if let Some(previous) = mates_to_targets.insert(mate.mate_id.clone(), mate.target) {
                debug!("Target for mate '{}' replaced (was {})", mate.mate_id, previous);
            }
        }
    }
    mates_to_targets
}
