//! Data Model
//!
//! Document references, raw evaluation results and the typed view the
//! aggregators work on.

mod schema;

pub use schema::{AutoAssemblyMate, AutoAssemblyResult, MirrorEntry, MirrorResult, TargetResult};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::utils::preview_json;

/// Identifier of a mate connector. Only unique within its owning document.
pub type MateId = String;

/// Locates a single part studio element inside a workspace of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub document_id: String,
    pub workspace_id: String,
    pub element_id: String,
}

impl DocumentRef {
    pub fn new(
        document_id: impl Into<String>,
        workspace_id: impl Into<String>,
        element_id: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            workspace_id: workspace_id.into(),
            element_id: element_id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "d/{}/w/{}/e/{}",
            self.document_id, self.workspace_id, self.element_id
        )
    }
}

impl FromStr for DocumentRef {
    type Err = String;

    /// Accepts `d/<did>/w/<wid>/e/<eid>` or the short `<did>/<wid>/<eid>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().trim_matches('/').split('/').collect();
        let ids = match parts.as_slice() {
            ["d", did, "w", wid, "e", eid] => [*did, *wid, *eid],
            [did, wid, eid] => [*did, *wid, *eid],
            _ => return Err(format!("expected d/<did>/w/<wid>/e/<eid>, got '{}'", s)),
        };
        if ids.iter().any(|id| id.is_empty()) {
            return Err(format!("empty identifier in document reference '{}'", s));
        }
        Ok(Self::new(ids[0], ids[1], ids[2]))
    }
}

/// A single part inside a part studio element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRef {
    pub element: DocumentRef,
    pub part_id: String,
}

/// Raw outcome of one remote evaluation: `{"valid": bool, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub valid: bool,
    pub payload: Value,
}

impl EvaluationResult {
    pub fn from_value(payload: Value) -> Result<Self, String> {
        match payload.get("valid").and_then(Value::as_bool) {
            Some(valid) => Ok(Self { valid, payload }),
            None => Err(format!(
                "missing boolean 'valid' field in {}",
                preview_json(&payload)
            )),
        }
    }

    /// Decodes the payload into the result schema of a script kind.
    /// Invalid results are never decoded; they carry no usable payload.
    pub fn typed<T: DeserializeOwned>(&self) -> Result<Evaluation<T>, String> {
        if !self.valid {
            return Ok(Evaluation::Invalid);
        }
        T::deserialize(&self.payload)
            .map(Evaluation::Valid)
            .map_err(|e| e.to_string())
    }
}

/// Typed evaluation result. `Invalid` means the script found its
/// preconditions unmet and contributes nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation<T> {
    Valid(T),
    Invalid,
}

impl<T> Evaluation<T> {
    pub fn into_valid(self) -> Option<T> {
        match self {
            Evaluation::Valid(value) => Some(value),
            Evaluation::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Evaluation::Valid(_))
    }
}
