//! Remote Evaluation
//!
//! The opaque capability that runs a script against one part studio and
//! returns its JSON result.

mod fsvalue;
mod onshape;

pub use fsvalue::fs_value_to_json;
pub use onshape::OnshapeEvaluator;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::model::DocumentRef;

#[async_trait]
pub trait RemoteEvaluator: Send + Sync {
    /// Evaluate `script` in the context of `document`. Timeouts and retries,
    /// if any, are the implementation's business.
    async fn evaluate(&self, document: &DocumentRef, script: &str) -> Result<Value>;
}
