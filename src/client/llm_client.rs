//! Generic LLM client for OpenAI-compatible endpoints.
//!
//! Epistemic foundation:
//! - K_i: OpenAI chat-completions schema is the de facto standard
//! - K_i: Aggregators (OpenRouter) and on-prem (vLLM, Ollama) all support it
//! - B_i: API will respond within timeout (might fail)
//! - B_i: Response will be valid JSON (might fail)
//! - I^B: Network availability unknowable → retry with backoff

use crate::models::{expand_headers, Config, ModelSpec, ProviderError, QuizError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A provider-independent chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: ModelSpec,
    pub messages: Vec<Message>,
    /// Ask for a single JSON object (`response_format`)
    pub json_mode: bool,
}

/// Chat completion request payload.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// API error response (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<serde_json::Value>,
}

/// Response from a completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,
    /// Model used (may differ from requested)
    pub model: String,
    /// Input tokens
    pub input_tokens: u32,
    /// Output tokens
    pub output_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
    /// Request duration
    pub duration: Duration,
}

/// Anything that can answer a chat request.
///
/// The quiz generator only depends on this seam; production uses
/// [`LLMClient`], tests use a scripted fake.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<CompletionResponse>;
}

/// Generic LLM client for any OpenAI-compatible endpoint.
///
/// Features:
/// - Retry with exponential backoff
/// - `retry-after` handling on 429
/// - Token tracking
/// - Custom headers for auth flexibility
pub struct LLMClient {
    client: reqwest::Client,
    /// API key (None for local endpoints without auth)
    api_key: Option<String>,
    /// Base URL for the API
    base_url: String,
    /// Custom headers to include in requests
    custom_headers: HashMap<String, String>,
    /// Request timeout
    timeout: Duration,
    /// Maximum attempts per request
    max_retries: u32,
    total_input_tokens: AtomicU64,
    total_output_tokens: AtomicU64,
}

impl LLMClient {
    /// Create a new LLM client.
    ///
    /// # Arguments
    /// - `api_key`: Optional API key (None for local endpoints)
    /// - `base_url`: Base URL for the API
    /// - `custom_headers`: Additional headers to include in requests
    /// - `timeout_secs`: Request timeout in seconds
    /// - `max_retries`: Maximum attempts per request
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        custom_headers: HashMap<String, String>,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(QuizError::Network)?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            custom_headers,
            timeout,
            max_retries: max_retries.max(1),
            total_input_tokens: AtomicU64::new(0),
            total_output_tokens: AtomicU64::new(0),
        })
    }

    /// Build a client from the `[llm]` config section.
    ///
    /// B_i(api key available) → Result
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        Self::new(
            Some(api_key),
            config.llm.base_url.clone(),
            expand_headers(&config.llm.headers),
            config.llm.timeout_secs,
            config.llm.max_retries,
        )
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build headers for a request.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(ref api_key) = self.api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (key, value) in &self.custom_headers {
            if let (Ok(name), Ok(val)) = (
                HeaderName::try_from(key.as_str()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, val);
            }
        }

        headers
    }

    /// Complete a chat request.
    ///
    /// B_i(API available) → Result
    /// B_i(valid response) → Result
    /// I^B(rate limits) → honour retry-after
    pub async fn complete(
        &self,
        model: &ModelSpec,
        messages: &[Message],
        json_mode: bool,
    ) -> Result<CompletionResponse> {
        let start = Instant::now();

        let request = ChatCompletionRequest {
            model: &model.id,
            messages,
            max_tokens: model.max_tokens,
            temperature: model.temperature,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error: Option<QuizError> = None;

        for attempt in 0..self.max_retries {
            let response = self
                .client
                .post(&url)
                .headers(self.headers())
                .json(&request)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(QuizError::Timeout(self.timeout));
                    } else {
                        last_error = Some(QuizError::Network(e));
                    }
                    if attempt < self.max_retries - 1 {
                        let backoff = Duration::from_secs(2u64.pow(attempt));
                        debug!(
                            attempt = attempt,
                            backoff_secs = backoff.as_secs(),
                            "Retrying after network error"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<f64>().ok())
                    .unwrap_or(1.0);

                last_error = Some(QuizError::RateLimited {
                    retry_after_secs: retry_after,
                });

                if attempt < self.max_retries - 1 {
                    debug!(
                        attempt = attempt,
                        retry_after_secs = retry_after,
                        "Rate limited, waiting"
                    );
                    tokio::time::sleep(Duration::from_secs_f64(retry_after)).await;
                }
                continue;
            }

            if !response.status().is_success() {
                let error_body = response.text().await.unwrap_or_default();
                let error =
                    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
                        if status == 401 {
                            ProviderError::AuthenticationFailed
                        } else if status == 404 {
                            ProviderError::ModelNotFound(model.id.clone())
                        } else {
                            ProviderError::ApiError {
                                status,
                                message: api_error.error.message,
                            }
                        }
                    } else if status == 401 {
                        ProviderError::AuthenticationFailed
                    } else {
                        ProviderError::ApiError {
                            status,
                            message: error_body,
                        }
                    };

                last_error = Some(QuizError::Provider(error));

                // Don't retry auth errors or not found
                if status == 401 || status == 404 {
                    break;
                }

                if attempt < self.max_retries - 1 {
                    let backoff = Duration::from_secs(2u64.pow(attempt));
                    tokio::time::sleep(backoff).await;
                }
                continue;
            }

            let body: ChatCompletionResponse = response.json().await.map_err(|e| {
                ProviderError::InvalidResponse(format!("Failed to parse response: {e}"))
            })?;

            let content = body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| ProviderError::InvalidResponse("No content in response".into()))?;

            let usage = body.usage.unwrap_or_default();

            self.total_input_tokens
                .fetch_add(usage.prompt_tokens as u64, Ordering::Relaxed);
            self.total_output_tokens
                .fetch_add(usage.completion_tokens as u64, Ordering::Relaxed);

            let elapsed = start.elapsed();
            debug!(
                model = %model.id,
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                elapsed_ms = elapsed.as_millis() as u64,
                "Completion received"
            );

            return Ok(CompletionResponse {
                content,
                model: body.model.unwrap_or_else(|| model.id.clone()),
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
                duration: elapsed,
            });
        }

        // All retries exhausted
        Err(last_error.unwrap_or_else(|| {
            QuizError::Provider(ProviderError::MaxRetriesExceeded {
                attempts: self.max_retries,
                last_error: "Unknown error".to_string(),
            })
        }))
    }

    /// Get total tokens tracked.
    pub fn total_tokens(&self) -> (u64, u64) {
        (
            self.total_input_tokens.load(Ordering::Relaxed),
            self.total_output_tokens.load(Ordering::Relaxed),
        )
    }

    /// Health check: ping the /models endpoint.
    ///
    /// B_i: endpoint is healthy if /models returns 200
    pub async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let url = format!("{}/models", self.base_url);

        match self
            .client
            .get(&url)
            .headers(self.headers())
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(response) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                if response.status().is_success() {
                    HealthCheckResult {
                        status: HealthStatus::Healthy,
                        latency_ms: Some(latency_ms),
                        error: None,
                    }
                } else {
                    HealthCheckResult {
                        status: HealthStatus::Unhealthy,
                        latency_ms: Some(latency_ms),
                        error: Some(format!("HTTP {}", response.status().as_u16())),
                    }
                }
            }
            Err(e) => HealthCheckResult {
                status: HealthStatus::Unreachable,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
impl ChatModel for LLMClient {
    async fn chat(&self, request: &ChatRequest) -> Result<CompletionResponse> {
        self.complete(&request.model, &request.messages, request.json_mode)
            .await
    }
}

/// Health check result.
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    /// Latency in milliseconds (if reachable)
    pub latency_ms: Option<u64>,
    /// Error message (if unhealthy or unreachable)
    pub error: Option<String>,
}

/// Health status of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Endpoint is responding normally
    Healthy,
    /// Endpoint is responding but with errors
    Unhealthy,
    /// Endpoint is not reachable
    Unreachable,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Unreachable => write!(f, "unreachable"),
        }
    }
}
