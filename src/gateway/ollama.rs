//! Ollama adapter for chat and embedding requests.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::error::{ErrorContext, ProviderError};
use super::types::*;
use super::{ChatGateway, EmbedGateway};

/// Maximum allowed response body length (16MB; embedding batches are large).
const MAX_RESPONSE_LEN: usize = 16 * 1_024 * 1_024;

const DEFAULT_PORT: u16 = 11434;
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const PROVIDER: &str = "ollama";

/// Ollama HTTP API adapter.
#[derive(Debug, Clone)]
pub struct OllamaAdapter {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaAdapter {
    /// Create with custom configuration.
    pub fn with_config(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = normalize_base_url(&base_url.into());
        if base_url.is_empty() {
            return Err(ProviderError::config("empty Ollama base URL"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{endpoint}", self.base_url)
    }

    /// POST a JSON body and return the (size-limited) response body on 2xx.
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        model: &str,
        body: &T,
    ) -> Result<String, ProviderError> {
        let mut response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_transport(e))? {
            let new_len = bytes.len() + chunk.len();
            if new_len > MAX_RESPONSE_LEN {
                return Err(ProviderError::provider(
                    PROVIDER,
                    format!("Response too large: {new_len} bytes"),
                    false,
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&bytes).to_string();

        if status.is_success() {
            return Ok(body);
        }

        let ctx = ErrorContext::new()
            .with_status(status.as_u16())
            .with_model(model);
        let message = serde_json::from_str::<ApiError>(&body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        Err(match status.as_u16() {
            404 => ProviderError::model_not_found(model, ctx),
            400 => ProviderError::InvalidRequest {
                message,
                context: Some(ctx),
            },
            code => ProviderError::provider_with_context(PROVIDER, message, code >= 500, ctx),
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Http(err)
        }
    }

    /// Run a chat completion (non-streaming).
    pub async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        if req.messages.is_empty() {
            return Err(ProviderError::invalid_request("chat request has no messages"));
        }

        let start = Instant::now();
        let messages: Vec<ApiMessage<'_>> = req.messages.iter().map(ApiMessage::from).collect();
        let api_req = ChatApiRequest {
            model: req.model.model_id(),
            messages: &messages,
            stream: false,
            options: ApiOptions {
                temperature: req.temperature,
                num_predict: req.max_tokens,
            },
        };

        let body = self.post_json("chat", req.model.model_id(), &api_req).await?;

        let parsed: ChatApiResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::provider(PROVIDER, format!("Invalid JSON: {e}"), false)
        })?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::provider(PROVIDER, error, false));
        }

        let message = parsed
            .message
            .ok_or_else(|| ProviderError::provider(PROVIDER, "No message in response", false))?;

        Ok(ChatResponse {
            content: message.content.unwrap_or_default(),
            input_tokens: parsed.prompt_eval_count.unwrap_or(0),
            output_tokens: parsed.eval_count.unwrap_or(0),
            latency: start.elapsed(),
            finish_reason: FinishReason::from(parsed.done_reason),
        })
    }

    /// Embed a batch of texts.
    pub async fn embed(&self, req: &EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        if req.texts.is_empty() {
            return Ok(EmbedResponse::empty());
        }

        let start = Instant::now();
        let api_req = EmbedApiRequest {
            model: req.model.model_id(),
            input: &req.texts,
        };

        let body = self.post_json("embed", req.model.model_id(), &api_req).await?;

        let parsed: EmbedApiResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::provider(PROVIDER, format!("Invalid JSON: {e}"), false)
        })?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::provider(PROVIDER, error, false));
        }

        let embeddings = parsed.embeddings.unwrap_or_default();
        if embeddings.len() != req.texts.len() {
            return Err(ProviderError::provider(
                PROVIDER,
                format!(
                    "expected {} embeddings, got {}",
                    req.texts.len(),
                    embeddings.len()
                ),
                false,
            ));
        }

        Ok(EmbedResponse {
            embeddings,
            input_tokens: parsed.prompt_eval_count.unwrap_or(0),
            latency: start.elapsed(),
        })
    }
}

#[async_trait]
impl ChatGateway for OllamaAdapter {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        OllamaAdapter::chat(self, &req).await
    }
}

#[async_trait]
impl EmbedGateway for OllamaAdapter {
    async fn embed(&self, req: EmbedRequest) -> Result<EmbedResponse, ProviderError> {
        OllamaAdapter::embed(self, &req).await
    }
}

/// `OLLAMA_HOST` conventions: a bare host gets `http://` and, lacking a port,
/// `:11434`. An explicit scheme keeps its own default port.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }
    let (authority, path) = match trimmed.find('/') {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };
    if has_port(authority) {
        format!("http://{trimmed}")
    } else {
        format!("http://{authority}:{DEFAULT_PORT}{path}")
    }
}

fn has_port(authority: &str) -> bool {
    // Colons inside a bracketed IPv6 literal are not a port separator.
    let host_end = authority.rfind(']').map_or(0, |i| i + 1);
    authority[host_end..]
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    stream: bool,
    options: ApiOptions,
}

#[derive(Serialize)]
struct ApiOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for ApiMessage<'a> {
    fn from(m: &'a Message) -> Self {
        Self {
            role: m.role.as_str(),
            content: &m.content,
        }
    }
}

#[derive(Deserialize)]
struct ChatApiResponse {
    message: Option<ChoiceMessage>,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbedApiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedApiResponse {
    embeddings: Option<Vec<Vec<f32>>>,
    prompt_eval_count: Option<u32>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_scheme_and_loses_trailing_slash() {
        assert_eq!(normalize_base_url("localhost:11434"), "http://localhost:11434");
        assert_eq!(
            normalize_base_url("https://gpu-box:11434/"),
            "https://gpu-box:11434"
        );
        assert_eq!(normalize_base_url("   "), "");
    }

    #[test]
    fn bare_host_gets_default_ollama_port() {
        assert_eq!(normalize_base_url("myhost"), "http://myhost:11434");
        assert_eq!(normalize_base_url("10.0.0.5/"), "http://10.0.0.5:11434");
        assert_eq!(normalize_base_url("myhost/ollama"), "http://myhost:11434/ollama");
        assert_eq!(normalize_base_url("[::1]"), "http://[::1]:11434");
        assert_eq!(normalize_base_url("[::1]:8080"), "http://[::1]:8080");
        assert_eq!(normalize_base_url("http://myhost"), "http://myhost");
    }

    #[test]
    fn adapter_reports_normalized_base_url() {
        let adapter = OllamaAdapter::with_config("gpu-box", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(adapter.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn empty_base_url_is_a_config_error() {
        let err = OllamaAdapter::with_config("", DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
    }
}
