//! Hosted token-classification client
//!
//! Talks to a Hugging Face style inference endpoint:
//! `POST {endpoint}/models/{model}` with `{"inputs": text}` returning
//! `[{entity, score, word, start, end}, ...]`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use nerid_core::{ClassifiedToken, ClassifierConfig, NeridError, Result, TokenClassifier};

/// HTTP token classifier
pub struct HttpTokenClassifier {
    client: Client,
    endpoint: String,
    model: String,
    api_token: Option<String>,
    name: String,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    /// Per-token output; merging happens locally
    aggregation_strategy: &'static str,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Flat(Vec<InferenceToken>),
    Batched(Vec<Vec<InferenceToken>>),
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct InferenceToken {
    #[serde(alias = "entity_group")]
    entity: String,
    score: Option<f32>,
    word: Option<String>,
    start: Option<usize>,
    end: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct InferenceError {
    error: String,
}

impl HttpTokenClassifier {
    /// Create a new client with default timeout
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            name: format!("http:{model}"),
            model,
            api_token: None,
        }
    }

    /// Create from config
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NeridError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_token: config.api_token.clone(),
            name: format!("http:{}", config.model),
        })
    }

    /// Set bearer token
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Full URL of the model endpoint
    pub fn url(&self) -> String {
        format!("{}/models/{}", self.endpoint, self.model)
    }

    /// Parse a successful response body into tokens
    pub fn parse_response(body: &str) -> Result<Vec<ClassifiedToken>> {
        let response: InferenceResponse = serde_json::from_str(body)
            .map_err(|e| NeridError::ClassifierError(format!("Failed to parse response: {e}")))?;

        let raw = match response {
            InferenceResponse::Flat(tokens) => tokens,
            InferenceResponse::Batched(batches) => batches.into_iter().next().unwrap_or_default(),
        };

        raw.into_iter()
            .map(|t| {
                let (Some(start), Some(end)) = (t.start, t.end) else {
                    return Err(NeridError::ClassifierError(format!(
                        "Model returned no offsets for entity '{}'",
                        t.entity
                    )));
                };

                let token = ClassifiedToken::new(t.entity, start, end);
                Ok(match t.score {
                    Some(score) => token.with_score(score),
                    None => token,
                })
            })
            .collect()
    }
}

#[async_trait]
impl TokenClassifier for HttpTokenClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<ClassifiedToken>> {
        let request = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                aggregation_strategy: "none",
            },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let mut builder = self.client.post(self.url()).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                NeridError::ClassifierUnavailable(format!("Request failed: {e}"))
            } else {
                NeridError::ClassifierError(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NeridError::ClassifierError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<InferenceError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);

            tracing::error!(status = %status, model = %self.model, "Classifier request failed");

            return Err(if status == StatusCode::SERVICE_UNAVAILABLE {
                NeridError::ClassifierUnavailable(message)
            } else {
                NeridError::ClassifierError(format!("{status}: {message}"))
            });
        }

        let tokens = Self::parse_response(&body)?;
        tracing::debug!(model = %self.model, tokens = tokens.len(), "Classifier response");
        Ok(tokens)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
