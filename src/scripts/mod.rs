//! Script Registry
//!
//! Resolves logical script names to FeatureScript bodies. Lookups are pure:
//! nothing is cached between calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EvalError, EvalResult};

/// Discovers mates and the part studios they target.
pub const AUTO_ASSEMBLY: &str = "parseAutoAssembly";
/// Reads the target mate id out of a target part studio.
pub const AUTO_ASSEMBLY_TARGET: &str = "parseAutoAssemblyTarget";
/// Discovers mirror relationships between mates.
pub const ASSEMBLY_MIRROR: &str = "parseAssemblyMirror";

const SCRIPT_EXTENSION: &str = "fs";

#[async_trait]
pub trait ScriptRegistry: Send + Sync {
    /// Load the body of the named script, or `ScriptNotFound`.
    async fn load(&self, name: &str) -> EvalResult<String>;
}

/// Reads `<dir>/<name>.fs` on every lookup.
#[derive(Debug, Clone)]
pub struct DirectoryScriptRegistry {
    dir: PathBuf,
}

impl DirectoryScriptRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn script_path(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.contains(&['/', '\\'][..]) || name.contains("..") {
            return None;
        }
        Some(self.dir.join(format!("{}.{}", name, SCRIPT_EXTENSION)))
    }
}

#[async_trait]
impl ScriptRegistry for DirectoryScriptRegistry {
    async fn load(&self, name: &str) -> EvalResult<String> {
        let path = self
            .script_path(name)
            .ok_or_else(|| EvalError::ScriptNotFound(name.to_string()))?;

        match tokio::fs::read_to_string(&path).await {
            Ok(body) => {
                debug!("Loaded script '{}' from {:?} ({} bytes)", name, path, body.len());
                Ok(body)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EvalError::ScriptNotFound(name.to_string()))
            }
            Err(e) => Err(EvalError::Io(e)),
        }
    }
}

/// Script bodies held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScriptRegistry {
    scripts: HashMap<String, String>,
}

impl InMemoryScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(name, body);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.scripts.insert(name.into(), body.into());
    }
}

#[async_trait]
impl ScriptRegistry for InMemoryScriptRegistry {
    async fn load(&self, name: &str) -> EvalResult<String> {
        self.scripts
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::ScriptNotFound(name.to_string()))
    }
}
