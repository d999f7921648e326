//! Error types for the evaluation engine.

use thiserror::Error;

use crate::model::DocumentRef;

pub type EvalResult<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    /// Transport or remote-side failure while evaluating a script.
    #[error("remote evaluation failed for {document}: {source}")]
    RemoteCall {
        document: DocumentRef,
        #[source]
        source: anyhow::Error,
    },

    #[error("script not found: {0}")]
    ScriptNotFound(String),

    /// The call succeeded but the payload does not match the script's result schema.
    #[error("malformed result from {document}: {reason}")]
    MalformedResult { document: DocumentRef, reason: String },

    #[error("{received} of {expected} evaluation tasks reported before the pool shut down")]
    TaskAborted { expected: usize, received: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
