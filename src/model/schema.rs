//! Result schemas, one per script kind.

use serde::Deserialize;

use super::{DocumentRef, MateId};

/// `parseAssemblyMirror` result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MirrorResult {
    pub mirrors: Vec<MirrorEntry>,
}

/// A base mate either mirrors onto itself (across the origin) or onto a
/// target mate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawMirrorEntry")]
pub enum MirrorEntry {
    ToOrigin { base_mate_id: MateId },
    ToTarget { base_mate_id: MateId, target_mate_id: MateId },
}

impl MirrorEntry {
    pub fn base_mate_id(&self) -> &str {
        match self {
            MirrorEntry::ToOrigin { base_mate_id } => base_mate_id,
            MirrorEntry::ToTarget { base_mate_id, .. } => base_mate_id,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMirrorEntry {
    base_mate_id: MateId,
    mate_to_origin: bool,
    #[serde(default)]
    target_mate_id: Option<MateId>,
}

impl TryFrom<RawMirrorEntry> for MirrorEntry {
    type Error = String;

    fn try_from(raw: RawMirrorEntry) -> Result<Self, Self::Error> {
        if raw.mate_to_origin {
            return Ok(MirrorEntry::ToOrigin { base_mate_id: raw.base_mate_id });
        }
        match raw.target_mate_id {
            Some(target_mate_id) => Ok(MirrorEntry::ToTarget {
                base_mate_id: raw.base_mate_id,
                target_mate_id,
            }),
            None => Err(format!(
                "mirror entry '{}' has no targetMateId and does not mirror to origin",
                raw.base_mate_id
            )),
        }
    }
}

/// `parseAutoAssembly` result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AutoAssemblyResult {
    pub mates: Vec<AutoAssemblyMate>,
}

/// A mate and the part studio it should be auto-connected against.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AutoAssemblyMate {
    #[serde(rename = "mateId")]
    pub mate_id: MateId,
    #[serde(flatten)]
    pub target: DocumentRef,
}

/// `parseAutoAssemblyTarget` result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetResult {
    #[serde(rename = "targetMateId")]
    pub target_mate_id: MateId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mirror_entries() {
        let result: MirrorResult = serde_json::from_value(json!({
            "valid": true,
            "mirrors": [
                { "baseMateId": "m1", "mateToOrigin": true },
                { "baseMateId": "m2", "mateToOrigin": false, "targetMateId": "m3" }
            ]
        }))
        .unwrap();

        assert_eq!(
            result.mirrors,
            vec![
                MirrorEntry::ToOrigin { base_mate_id: "m1".into() },
                MirrorEntry::ToTarget { base_mate_id: "m2".into(), target_mate_id: "m3".into() },
            ]
        );
        assert_eq!(result.mirrors[1].base_mate_id(), "m2");
    }

    #[test]
    fn test_mirror_entry_without_target_rejected() {
        let err = serde_json::from_value::<MirrorResult>(json!({
            "mirrors": [{ "baseMateId": "m2", "mateToOrigin": false }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("no targetMateId"));
    }

    #[test]
    fn test_auto_assembly_mate_builds_reference() {
        let result: AutoAssemblyResult = serde_json::from_value(json!({
            "valid": true,
            "mates": [{
                "mateId": "m1",
                "documentId": "d1",
                "workspaceId": "w1",
                "elementId": "e1"
            }]
        }))
        .unwrap();
        assert_eq!(result.mates[0].mate_id, "m1");
        assert_eq!(result.mates[0].target, DocumentRef::new("d1", "w1", "e1"));
    }
}
