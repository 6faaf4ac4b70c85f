//! Native Google Generative Language client.
//!
//! Covers the three calls the command surface needs: listing models,
//! generating content, and counting tokens. Authentication is by API key
//! sent in the `x-goog-api-key` header.

use std::time::Duration;

use async_trait::async_trait;
use modelcall_core::CatalogError;
use modelcall_core::CatalogSource;
use modelcall_core::ExecutionError;
use modelcall_core::ModelEntry;
use modelcall_core::config_loader::ModelcallConfig;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::PROVIDER;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Upper bound on `models.list` pages fetched in one listing.
const MAX_MODEL_PAGES: usize = 100;

/// Resource prefix the API puts in front of model names.
const MODEL_RESOURCE_PREFIX: &str = "models/";

/// Errors from Gemini API calls.
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("No API key configured (set GEMINI_API_KEY or MODELCALL_API_KEY)")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API returned an error response. Renders the backend message alone.
    #[error("{message}")]
    ApiResponse {
        status: u16,
        message: String,
        /// Google status string, e.g. `INVALID_ARGUMENT`.
        error_type: Option<String>,
    },

    #[error("Prompt blocked: {0}")]
    PromptBlocked(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type GeminiResult<T> = Result<T, GeminiError>;

impl From<GeminiError> for ExecutionError {
    fn from(err: GeminiError) -> Self {
        ExecutionError::Backend(err.to_string())
    }
}

impl From<GeminiError> for CatalogError {
    fn from(err: GeminiError) -> Self {
        CatalogError::Fetch {
            provider: PROVIDER.to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub page_size: u32,
    pub max_output_bytes: usize,
    pub request_timeout: Duration,
}

impl From<&ModelcallConfig> for GeminiConfig {
    fn from(config: &ModelcallConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            page_size: config.page_size,
            max_output_bytes: config.max_output_bytes,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self::from(&ModelcallConfig::default())
    }
}

/// Google error wrapper.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<RemoteModel>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteModel {
    name: String,
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl From<RemoteModel> for ModelEntry {
    fn from(model: RemoteModel) -> Self {
        let name = model
            .name
            .strip_prefix(MODEL_RESOURCE_PREFIX)
            .map(str::to_string)
            .unwrap_or(model.name);
        ModelEntry {
            name,
            display_name: model.display_name,
            supported_actions: model.supported_generation_methods,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Prompt feedback (for blocked prompts).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    total_tokens: u64,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated.
    fn into_text(self) -> GeminiResult<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeminiError::PromptBlocked(reason));
        }
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(String::new());
        };
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(GeminiError::PromptBlocked(
                "response blocked due to safety concerns".to_string(),
            ));
        }
        Ok(candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

/// Client for the Generative Language API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> GeminiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("modelcall/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_key(&self) -> GeminiResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(GeminiError::MissingApiKey)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Fetch every page of `models.list`, names stripped of `models/`.
    pub async fn fetch_models(&self) -> GeminiResult<Vec<ModelEntry>> {
        let key = self.api_key()?;
        let url = self.url("models");
        let page_size = self.config.page_size.to_string();
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, key)
                .query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListModelsResponse = Self::read_json(request.send().await?).await?;
            pages += 1;
            tracing::debug!(
                models = page.models.len(),
                more = page.next_page_token.is_some(),
                "fetched model page"
            );
            entries.extend(page.models.into_iter().map(ModelEntry::from));

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    tracing::warn!(token = %token, "models.list repeated its page token; stopping");
                    break;
                }
                Some(_) if pages >= MAX_MODEL_PAGES => {
                    tracing::warn!(pages, "models.list page limit reached; stopping");
                    break;
                }
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::info!(models = entries.len(), "listed Gemini models");
        Ok(entries)
    }

    /// `models/{model}:generateContent` with `query` as the single user turn.
    pub async fn generate_content(&self, model: &str, query: &str) -> GeminiResult<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": query }] }]
        });
        let response: GenerateContentResponse =
            self.post(&format!("models/{model}:generateContent"), &body).await?;
        response.into_text()
    }

    /// `models/{model}:countTokens` for `query`.
    pub async fn count_tokens(&self, model: &str, query: &str) -> GeminiResult<u64> {
        let body = json!({
            "contents": [{ "parts": [{ "text": query }] }]
        });
        let response: CountTokensResponse =
            self.post(&format!("models/{model}:countTokens"), &body).await?;
        Ok(response.total_tokens)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> GeminiResult<T> {
        let key = self.api_key()?;
        tracing::debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .header(API_KEY_HEADER, key)
            .json(body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    /// Decode a success body, or turn an error status into `ApiResponse`.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> GeminiResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let err = Self::api_error(status.as_u16(), &text);
            if let GeminiError::ApiResponse {
                status, error_type, ..
            } = &err
            {
                tracing::warn!(status, error_type = ?error_type, "Gemini API request failed");
            }
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| GeminiError::Parse(e.to_string()))
    }

    fn api_error(status: u16, body: &str) -> GeminiError {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) => GeminiError::ApiResponse {
                status: parsed.error.code.unwrap_or(status),
                message: parsed.error.message,
                error_type: parsed.error.status,
            },
            Err(_) => GeminiError::ApiResponse {
                status,
                message: body.to_string(),
                error_type: None,
            },
        }
    }
}

#[async_trait]
impl CatalogSource for GeminiClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>, CatalogError> {
        Ok(self.fetch_models().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn remote_model_strips_resource_prefix() {
        let json = r#"{"name":"models/gemini-1.5-pro","displayName":"Gemini 1.5 Pro","supportedGenerationMethods":["generateContent","countTokens"]}"#;
        let remote: RemoteModel = serde_json::from_str(json).unwrap();
        assert_eq!(
            ModelEntry::from(remote),
            ModelEntry::new("gemini-1.5-pro")
                .with_display_name("Gemini 1.5 Pro")
                .with_actions(["generateContent", "countTokens"])
        );
    }

    #[test]
    fn remote_model_without_prefix_or_methods() {
        let remote: RemoteModel = serde_json::from_str(r#"{"name":"tunedModels/x"}"#).unwrap();
        let entry = ModelEntry::from(remote);
        assert_eq!(entry.name, "tunedModels/x");
        assert!(entry.supported_actions.is_empty());
    }

    #[test]
    fn generate_response_concatenates_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), "Hello");
    }

    #[test]
    fn generate_response_without_candidates_is_empty() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.into_text().unwrap(), "");
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let json = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let err = response.into_text().unwrap_err();
        assert_eq!(err.to_string(), "Prompt blocked: SAFETY");
    }

    #[test]
    fn api_error_prefers_google_body() {
        let err = GeminiClient::api_error(
            400,
            r#"{"error":{"code":400,"message":"Invalid request","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(err.to_string(), "Invalid request");
        assert!(matches!(
            err,
            GeminiError::ApiResponse { status: 400, error_type: Some(ref t), .. } if t == "INVALID_ARGUMENT"
        ));

        let raw = GeminiClient::api_error(502, "bad gateway");
        assert_eq!(raw.to_string(), "bad gateway");
        assert!(matches!(raw, GeminiError::ApiResponse { status: 502, .. }));
    }

    #[test]
    fn missing_key_is_reported_before_any_request() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        assert!(matches!(client.api_key(), Err(GeminiError::MissingApiKey)));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = GeminiClient::new(GeminiConfig {
            base_url: "http://localhost:1234/v1beta/".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();
        assert_eq!(client.url("models"), "http://localhost:1234/v1beta/models");
    }

    #[test]
    fn errors_convert_for_core() {
        let exec: ExecutionError = GeminiError::MissingApiKey.into();
        assert!(matches!(exec, ExecutionError::Backend(ref m) if m.starts_with("No API key")));
        let catalog: CatalogError = GeminiError::Parse("bad".to_string()).into();
        assert_eq!(
            catalog.to_string(),
            "failed to list models for Gemini: Parse error: bad"
        );
    }
}
