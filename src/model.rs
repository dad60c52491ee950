//! Language-model client for structured summaries.
//!
//! The [`Summarizer`] trait is the seam the ingestion pipeline calls through;
//! [`OllamaClient`] is the production implementation, calling a local Ollama
//! server's `POST /api/generate` endpoint with `stream: false`.
//!
//! One call per invocation, no retry: the pipeline owns the failure policy.
//!
//! # Errors
//!
//! - connection refused, timeout, non-2xx status, or no configured endpoint
//!   → [`DigestError::ModelUnavailable`]
//! - 2xx with a body lacking a string `response` field
//!   → [`DigestError::ModelMalformedResponse`]

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ModelConfig;
use crate::error::{DigestError, Result};

/// Section labels the prompt asks for, in order. The title extractor and
/// any downstream renderer can match on these literally.
pub const LABEL_TITLE: &str = "Titre :";
pub const LABEL_SUMMARY: &str = "Résumé :";
pub const LABEL_KEY_POINTS: &str = "Points clés :";
pub const LABEL_ACTIONS: &str = "Suggestions d'action :";

/// Produces a structured summary of a document's extracted text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Builds the single prompt sent to the model. The source text is embedded
/// verbatim after the instructions.
pub fn build_prompt(text: &str) -> String {
    format!(
        "Lis le texte ci-dessous et produis une réponse structurée, en français uniquement, \
en respectant strictement ce format :\n\
{LABEL_TITLE} <titre court du document>\n\
{LABEL_SUMMARY} <résumé de 3 à 5 phrases>\n\
{LABEL_KEY_POINTS}\n\
- <point clé>\n\
{LABEL_ACTIONS}\n\
- <suggestion d'action>\n\
N'ajoute rien d'autre.\n\
\n\
Texte :\n\
{text}\n"
    )
}

/// Removes the prompt when the backend echoes it before the generated text.
pub fn strip_prompt_echo(generated: &str, prompt: &str) -> String {
    match generated.strip_prefix(prompt) {
        Some(rest) => rest.trim().to_string(),
        None => generated.to_string(),
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Ollama `/api/generate` client.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: Option<String>,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            model: config.name.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            DigestError::ModelUnavailable("no model endpoint configured (model.base_url)".into())
        })?;

        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DigestError::ModelUnavailable(format!(
                    "connection error (is Ollama running at {}?): {}",
                    base_url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(DigestError::ModelUnavailable(format!(
                "Ollama API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DigestError::ModelMalformedResponse(e.to_string()))?;

        parse_generate_response(&json)
    }
}

fn parse_generate_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            DigestError::ModelMalformedResponse("missing string field 'response'".to_string())
        })
}

#[async_trait]
impl Summarizer for OllamaClient {
    async fn summarize(&self, text: &str) -> Result<String> {
        let prompt = build_prompt(text);
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "calling model");
        let generated = self.generate(&prompt).await?;
        Ok(strip_prompt_echo(&generated, &prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base_url: Option<String>) -> ModelConfig {
        ModelConfig {
            base_url,
            name: "mistral".to_string(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_prompt_embeds_text_and_labels() {
        let prompt = build_prompt("Le contrat expire en mars.");
        assert!(prompt.ends_with("Texte :\nLe contrat expire en mars.\n"));
        for label in [LABEL_TITLE, LABEL_SUMMARY, LABEL_KEY_POINTS, LABEL_ACTIONS] {
            assert!(prompt.contains(label), "missing label {}", label);
        }
        assert!(prompt.contains("français"));
    }

    #[test]
    fn test_echoed_prompt_is_stripped() {
        let prompt = build_prompt("abc");
        let echoed = format!("{}\nTitre : ABC\n", prompt);
        assert_eq!(strip_prompt_echo(&echoed, &prompt), "Titre : ABC");
        assert_eq!(strip_prompt_echo("Titre : ABC", &prompt), "Titre : ABC");
    }

    #[tokio::test]
    async fn test_summarize_returns_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "model": "mistral", "response": "Titre : X", "done": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(Some(server.uri()))).unwrap();
        let out = client.summarize("hello").await.unwrap();
        assert_eq!(out, "Titre : X");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "mistral");
        assert_eq!(body["stream"], false);
        assert_eq!(body["prompt"], build_prompt("hello"));
    }

    #[tokio::test]
    async fn test_summarize_strips_echoed_prompt() {
        let server = MockServer::start().await;
        let echoed = format!("{}Titre : Echo", build_prompt("doc"));
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": echoed })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(Some(server.uri()))).unwrap();
        assert_eq!(client.summarize("doc").await.unwrap(), "Titre : Echo");
    }

    #[tokio::test]
    async fn test_missing_response_field_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(Some(server.uri()))).unwrap();
        let err = client.summarize("doc").await.unwrap_err();
        assert!(matches!(err, DigestError::ModelMalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(Some(server.uri()))).unwrap();
        let err = client.summarize("doc").await.unwrap_err();
        assert!(matches!(err, DigestError::ModelMalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(Some(server.uri()))).unwrap();
        let err = client.summarize("doc").await.unwrap_err();
        assert!(matches!(err, DigestError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_slow_model_times_out_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "late" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config_for(Some(server.uri()))).unwrap();
        let err = client.summarize("doc").await.unwrap_err();
        assert!(matches!(err, DigestError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client =
            OllamaClient::new(&config_for(Some(format!("http://127.0.0.1:{}", port)))).unwrap();
        let err = client.summarize("doc").await.unwrap_err();
        assert!(matches!(err, DigestError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_unavailable() {
        let client = OllamaClient::new(&config_for(None)).unwrap();
        let err = client.summarize("doc").await.unwrap_err();
        assert!(matches!(err, DigestError::ModelUnavailable(_)));
    }
}
