use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{fs_value_to_json, RemoteEvaluator};
use crate::config::EngineConfig;
use crate::model::DocumentRef;

/// Evaluates FeatureScript through the part studio REST endpoint.
pub struct OnshapeEvaluator {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl OnshapeEvaluator {
    pub fn new(base_url: String, credentials: Option<(String, String)>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base_url, credentials })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.credentials(), config.request_timeout)
    }

    fn featurescript_url(&self, document: &DocumentRef) -> String {
        format!(
            "{}/api/partstudios/{}/featurescript",
            self.base_url.trim_end_matches('/'),
            document
        )
    }
}

#[async_trait]
impl RemoteEvaluator for OnshapeEvaluator {
    async fn evaluate(&self, document: &DocumentRef, script: &str) -> Result<Value> {
        let url = self.featurescript_url(document);
        debug!("POST {}", url);

        let mut request = self
            .client
            .post(&url)
            .json(&json!({ "script": script, "queries": [] }));

        if let Some((ref access_key, ref secret_key)) = self.credentials {
            request = request.basic_auth(access_key, Some(secret_key));
        }

        let res = request.send().await?.error_for_status()?;
        let body: Value = res.json().await.context("Failed to decode evaluation response")?;

        let result = body
            .get("result")
            .context("Evaluation response has no 'result' field")?;
        Ok(fs_value_to_json(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_featurescript_url() {
        let evaluator = OnshapeEvaluator::new(
            "https://cad.onshape.com/".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let document = DocumentRef::new("d1", "w1", "e1");
        assert_eq!(
            evaluator.featurescript_url(&document),
            "https://cad.onshape.com/api/partstudios/d/d1/w/w1/e/e1/featurescript"
        );
    }
}
