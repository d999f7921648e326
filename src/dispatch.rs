//! Concurrent Dispatcher
//!
//! Runs one remote evaluation per part studio on a pool bounded by a
//! semaphore. Results are drained in completion order by the caller's task,
//! which is the only place they are decoded and handed on, so aggregation
//! never shares mutable state with the workers.
//!
//! The first remote failure (or undecodable payload) ends the drain and is
//! returned. Workers already in flight are not cancelled; they finish on
//! their own and their results are dropped with the channel.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::error::{EvalError, EvalResult};
use crate::model::{DocumentRef, Evaluation, EvaluationResult};
use crate::remote::RemoteEvaluator;
use crate::scripts::ScriptRegistry;
use crate::utils::preview_json;

pub const DEFAULT_CONCURRENCY: usize = 8;

type Completion<K> = (K, DocumentRef, anyhow::Result<Value>);

/// A script body resolved from the registry, shared by every worker.
#[derive(Debug, Clone)]
pub struct LoadedScript {
    name: String,
    body: Arc<str>,
}

impl LoadedScript {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    evaluator: Arc<dyn RemoteEvaluator>,
    scripts: Arc<dyn ScriptRegistry>,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(evaluator: Arc<dyn RemoteEvaluator>, scripts: Arc<dyn ScriptRegistry>) -> Self {
        Self {
            evaluator,
            scripts,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Bound on in-flight evaluations per dispatch call. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Evaluate `script_name` against every document. Results come back in
    /// completion order, not submission order.
    pub async fn dispatch<T>(
        &self,
        documents: &HashSet<DocumentRef>,
        script_name: &str,
    ) -> EvalResult<Vec<Evaluation<T>>>
    where
        T: DeserializeOwned,
    {
        let script = self.load_script(script_name).await?;
        self.dispatch_with(documents, &script).await
    }

    /// Like `dispatch`, but each job carries a key that is returned alongside
    /// its result. Jobs are not deduplicated: two keys pointing at the same
    /// document are two evaluations.
    pub async fn dispatch_keyed<K, T>(
        &self,
        jobs: Vec<(K, DocumentRef)>,
        script_name: &str,
    ) -> EvalResult<Vec<(K, Evaluation<T>)>>
    where
        K: Send + 'static,
        T: DeserializeOwned,
    {
        let script = self.load_script(script_name).await?;
        self.dispatch_keyed_with(jobs, &script).await
    }

    /// Resolve a script body ahead of dispatch, so a pipeline can fail on a
    /// missing script before any remote call is made.
    pub async fn load_script(&self, script_name: &str) -> EvalResult<LoadedScript> {
        let body = self.scripts.load(script_name).await?;
        Ok(LoadedScript {
            name: script_name.to_string(),
            body: body.into(),
        })
    }

    /// `dispatch` with an already loaded script.
    pub async fn dispatch_with<T>(
        &self,
        documents: &HashSet<DocumentRef>,
        script: &LoadedScript,
    ) -> EvalResult<Vec<Evaluation<T>>>
    where
        T: DeserializeOwned,
    {
        let jobs = documents.iter().cloned().map(|doc| ((), doc)).collect();
        let results = self.dispatch_keyed_with(jobs, script).await?;
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }

    /// `dispatch_keyed` with an already loaded script.
    pub async fn dispatch_keyed_with<K, T>(
        &self,
        jobs: Vec<(K, DocumentRef)>,
        script: &LoadedScript,
    ) -> EvalResult<Vec<(K, Evaluation<T>)>>
    where
        K: Send + 'static,
        T: DeserializeOwned,
    {
        let script_name = script.name.as_str();
        let expected = jobs.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        info!(
            "Dispatching '{}' to {} part studios (concurrency {})",
            script_name, expected, self.concurrency
        );

        let pool = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<Completion<K>>(expected);

        for (key, document) in jobs {
            let tx = tx.clone();
            let pool = pool.clone();
            let evaluator = self.evaluator.clone();
            let script = script.body.clone();

            tokio::spawn(async move {
                let _permit = pool.acquire_owned().await.ok();
                debug!("Evaluating {}", document);
                let outcome = evaluator.evaluate(&document, &script).await;
                let _ = tx.send((key, document, outcome)).await;
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(expected);
        while let Some((key, document, outcome)) = rx.recv().await {
            let value = match outcome {
                Ok(value) => value,
                Err(source) => {
                    warn!("Evaluation of '{}' failed for {}: {:#}", script_name, document, source);
                    return Err(EvalError::RemoteCall { document, source });
                }
            };
            let evaluation = decode::<T>(&document, value)?;
            if !evaluation.is_valid() {
                debug!("Skipping invalid '{}' result from {}", script_name, document);
            }
            results.push((key, evaluation));
        }

        if results.len() < expected {
            return Err(EvalError::TaskAborted {
                expected,
                received: results.len(),
            });
        }
        Ok(results)
    }
}

fn decode<T: DeserializeOwned>(document: &DocumentRef, value: Value) -> EvalResult<Evaluation<T>> {
    let malformed = |reason: String| {
        warn!("Malformed result from {}: {}", document, reason);
        EvalError::MalformedResult { document: document.clone(), reason }
    };

    let raw = EvaluationResult::from_value(value).map_err(&malformed)?;
    raw.typed::<T>()
        .map_err(|reason| malformed(format!("{} in {}", reason, preview_json(&raw.payload))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TargetResult;
    use crate::scripts::InMemoryScriptRegistry;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes the element id back as the target mate id, tracking peak concurrency.
    #[derive(Default)]
    struct EchoEvaluator {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteEvaluator for EchoEvaluator {
        async fn evaluate(&self, document: &DocumentRef, script: &str) -> Result<Value> {
            assert_eq!(script, "target body");
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if document.element_id == "boom" {
                anyhow::bail!("connection reset");
            }
            if document.element_id == "garbled" {
                return Ok(json!({ "valid": true }));
            }
            Ok(json!({ "valid": true, "targetMateId": document.element_id }))
        }
    }

    fn dispatcher(evaluator: Arc<EchoEvaluator>) -> Dispatcher {
        let scripts = InMemoryScriptRegistry::new().with_script("target", "target body");
        Dispatcher::new(evaluator, Arc::new(scripts))
    }

    fn docs(ids: &[&str]) -> HashSet<DocumentRef> {
        ids.iter().map(|id| DocumentRef::new("d", "w", *id)).collect()
    }

    #[tokio::test]
    async fn test_one_evaluation_per_document() {
        let evaluator = Arc::new(EchoEvaluator::default());
        let results: Vec<Evaluation<TargetResult>> = dispatcher(evaluator.clone())
            .dispatch(&docs(&["a", "b", "c"]), "target")
            .await
            .unwrap();

        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 3);
        let mut ids: Vec<String> = results
            .into_iter()
            .filter_map(Evaluation::into_valid)
            .map(|r| r.target_mate_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_pool_bounds_in_flight_calls() {
        let evaluator = Arc::new(EchoEvaluator::default());
        let ids: Vec<String> = (0..12).map(|i| format!("e{}", i)).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();

        let _: Vec<Evaluation<TargetResult>> = dispatcher(evaluator.clone())
            .with_concurrency(3)
            .dispatch(&docs(&ids), "target")
            .await
            .unwrap();

        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 12);
        assert!(evaluator.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_remote_failure_aborts_batch() {
        let evaluator = Arc::new(EchoEvaluator::default());
        let err = dispatcher(evaluator)
            .dispatch::<TargetResult>(&docs(&["a", "boom", "c"]), "target")
            .await
            .unwrap_err();

        match err {
            EvalError::RemoteCall { document, .. } => assert_eq!(document.element_id, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_is_fatal() {
        let evaluator = Arc::new(EchoEvaluator::default());
        let err = dispatcher(evaluator)
            .dispatch::<TargetResult>(&docs(&["garbled"]), "target")
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::MalformedResult { .. }));
    }

    #[tokio::test]
    async fn test_missing_script_fails_before_dispatch() {
        let evaluator = Arc::new(EchoEvaluator::default());
        let err = dispatcher(evaluator.clone())
            .dispatch::<TargetResult>(&docs(&["a"]), "nope")
            .await
            .unwrap_err();

        assert!(matches!(err, EvalError::ScriptNotFound(_)));
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preloaded_script_is_reused() {
        let evaluator = Arc::new(EchoEvaluator::default());
        let dispatcher = dispatcher(evaluator.clone());
        let script = dispatcher.load_script("target").await.unwrap();
        assert_eq!(script.name(), "target");

        let first = dispatcher
            .dispatch_with::<TargetResult>(&docs(&["a", "b"]), &script)
            .await
            .unwrap();
        let second = dispatcher
            .dispatch_with::<TargetResult>(&docs(&["c"]), &script)
            .await
            .unwrap();

        assert_eq!(first.len() + second.len(), 3);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_default_concurrency_matches_config() {
        let evaluator = Arc::new(EchoEvaluator::default());
        assert_eq!(
            dispatcher(evaluator).concurrency(),
            crate::config::EngineConfig::default().concurrency
        );
    }

    #[tokio::test]
    async fn test_keyed_jobs_keep_duplicates() {
        let evaluator = Arc::new(EchoEvaluator::default());
        let same = DocumentRef::new("d", "w", "shared");
        let jobs = vec![("m1".to_string(), same.clone()), ("m2".to_string(), same)];

        let mut results: Vec<(String, Evaluation<TargetResult>)> = dispatcher(evaluator.clone())
            .dispatch_keyed(jobs, "target")
            .await
            .unwrap();
        results.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(results[0].0, "m1");
        assert_eq!(results[1].0, "m2");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let evaluator = Arc::new(EchoEvaluator::default());
        let results = dispatcher(evaluator)
            .dispatch::<TargetResult>(&HashSet::new(), "target")
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
