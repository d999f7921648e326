//! Mirror relationship aggregation.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::model::{Evaluation, MateId, MirrorEntry, MirrorResult, PartRef};

/// Mirror facts across every evaluated part studio.
///
/// A base mate is expected in at most one of the two collections. That is
/// the script's responsibility; if it is violated both entries are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorRelationship {
    /// Base mate id to the mate it mirrors onto.
    pub base_to_target_mates: BTreeMap<MateId, MateId>,
    /// Base mates mirrored across the origin onto themselves.
    pub origin_base_mates: BTreeSet<MateId>,
}

impl MirrorRelationship {
    pub fn is_empty(&self) -> bool {
        self.base_to_target_mates.is_empty() && self.origin_base_mates.is_empty()
    }

    /// Fold one part studio's entries in. A repeated base mate overwrites the
    /// earlier target.
    pub fn fold(&mut self, result: MirrorResult) {
        for entry in result.mirrors {
            match entry {
                MirrorEntry::ToOrigin { base_mate_id } => {
                    self.origin_base_mates.insert(base_mate_id);
                }
                MirrorEntry::ToTarget { base_mate_id, target_mate_id } => {
                    if let Some(previous) = self
                        .base_to_target_mates
                        .insert(base_mate_id.clone(), target_mate_id)
                    {
                        debug!("Mirror target for mate '{}' replaced (was '{}')", base_mate_id, previous);
                    }
                }
            }
        }
    }

    /// Number of copies of each part needed to satisfy every base and target
    /// mate.
    ///
    /// TODO: the counting rule is still undecided upstream; until it is, no
    /// extra instances are requested.
    pub fn instances_to_instantiate(
        &self,
        _mates_to_parts: &HashMap<MateId, PartRef>,
    ) -> HashMap<PartRef, usize> {
        HashMap::new()
    }
}

/// Fold mirror results in the order given, skipping invalid ones.
pub fn aggregate(results: impl IntoIterator<Item = Evaluation<MirrorResult>>) -> MirrorRelationship {
    let mut relationship = MirrorRelationship::default();
    for result in results.into_iter().filter_map(Evaluation::into_valid) {
        relationship.fold(result);
    }
    relationship
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(id: &str) -> MirrorEntry {
        MirrorEntry::ToOrigin { base_mate_id: id.into() }
    }

    fn target(base: &str, target: &str) -> MirrorEntry {
        MirrorEntry::ToTarget { base_mate_id: base.into(), target_mate_id: target.into() }
    }

    fn valid(mirrors: Vec<MirrorEntry>) -> Evaluation<MirrorResult> {
        Evaluation::Valid(MirrorResult { mirrors })
    }

    #[test]
    fn test_all_invalid_is_empty() {
        let relationship = aggregate(vec![Evaluation::Invalid, Evaluation::Invalid]);
        assert!(relationship.is_empty());
    }

    #[test]
    fn test_origin_and_target_split() {
        let relationship = aggregate(vec![
            valid(vec![origin("m1")]),
            Evaluation::Invalid,
            valid(vec![target("m2", "m3"), origin("m4")]),
        ]);

        assert_eq!(relationship.origin_base_mates, BTreeSet::from(["m1".into(), "m4".into()]));
        assert_eq!(relationship.base_to_target_mates, BTreeMap::from([("m2".into(), "m3".into())]));
        for mate in &relationship.origin_base_mates {
            assert!(!relationship.base_to_target_mates.contains_key(mate));
        }
    }

    #[test]
    fn test_duplicate_base_last_writer_wins() {
        let relationship = aggregate(vec![
            valid(vec![target("m1", "a")]),
            valid(vec![target("m1", "b")]),
        ]);
        assert_eq!(relationship.base_to_target_mates["m1"], "b");
    }

    #[test]
    fn test_reaggregation_is_identical() {
        let results = vec![valid(vec![origin("m1"), target("m2", "m3")]), Evaluation::Invalid];
        assert_eq!(aggregate(results.clone()), aggregate(results));
    }

    #[test]
    fn test_instances_to_instantiate_is_empty() {
        let relationship = aggregate(vec![valid(vec![origin("m1")])]);
        assert!(relationship.instances_to_instantiate(&HashMap::new()).is_empty());
    }
}
