//! Engine Configuration
//!
//! Read once from the process environment (after `.env` is loaded by the
//! binary). Every value has a default except the API keys.

use std::path::PathBuf;
use std::time::Duration;

use crate::dispatch::DEFAULT_CONCURRENCY;
use crate::error::{EvalError, EvalResult};

const DEFAULT_BASE_URL: &str = "https://cad.onshape.com";
const DEFAULT_SCRIPT_DIR: &str = "scripts";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the CAD platform REST API
    pub base_url: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Directory holding `<name>.fs` script bodies
    pub script_dir: PathBuf,
    /// Upper bound on in-flight evaluations per dispatch
    pub concurrency: usize,
    /// Per-request timeout applied by the HTTP evaluator
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_key: None,
            secret_key: None,
            script_dir: PathBuf::from(DEFAULT_SCRIPT_DIR),
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> EvalResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EvalResult<Self> {
        let defaults = Self::default();

        let concurrency = match lookup("AUTO_ASSEMBLY_CONCURRENCY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(EvalError::Config(format!(
                        "AUTO_ASSEMBLY_CONCURRENCY must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => defaults.concurrency,
        };

        let request_timeout = match lookup("AUTO_ASSEMBLY_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| {
                    EvalError::Config(format!(
                        "AUTO_ASSEMBLY_TIMEOUT_SECS must be a number of seconds, got '{}'",
                        raw
                    ))
                })?,
            None => defaults.request_timeout,
        };

        Ok(Self {
            base_url: lookup("ONSHAPE_BASE_URL").unwrap_or(defaults.base_url),
            access_key: lookup("ONSHAPE_ACCESS_KEY").filter(|k| !k.is_empty()),
            secret_key: lookup("ONSHAPE_SECRET_KEY").filter(|k| !k.is_empty()),
            script_dir: lookup("AUTO_ASSEMBLY_SCRIPT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.script_dir),
            concurrency,
            request_timeout,
        })
    }

    /// Basic-auth pair, only when both keys are present.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.clone(), secret.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, "https://cad.onshape.com");
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.script_dir, PathBuf::from("scripts"));
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("ONSHAPE_BASE_URL", "https://example.test"),
            ("ONSHAPE_ACCESS_KEY", "ak"),
            ("ONSHAPE_SECRET_KEY", "sk"),
            ("AUTO_ASSEMBLY_CONCURRENCY", "3"),
            ("AUTO_ASSEMBLY_TIMEOUT_SECS", "5"),
            ("AUTO_ASSEMBLY_SCRIPT_DIR", "/opt/scripts"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://example.test");
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.script_dir, PathBuf::from("/opt/scripts"));
        assert_eq!(config.credentials(), Some(("ak".to_string(), "sk".to_string())));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[("AUTO_ASSEMBLY_CONCURRENCY", "0")]))
            .unwrap_err();
        assert!(matches!(err, EvalError::Config(_)));
    }

    #[test]
    fn test_bad_timeout_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[("AUTO_ASSEMBLY_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, EvalError::Config(_)));
    }
}
