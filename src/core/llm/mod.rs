pub mod providers;
pub mod retry;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::AppConfig;
use providers::{GoogleProvider, OpenAiProvider};
pub use retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "openai")]
    OpenAI,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Google => write!(f, "google"),
            ProviderType::OpenAI => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gemini" => Ok(ProviderType::Google),
            "openai" => Ok(ProviderType::OpenAI),
            other => bail!("Unknown LLM provider '{}'. Expected 'google' or 'openai'.", other),
        }
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Provider-assigned call id, when the provider uses one.
    pub id: Option<String>,
    pub name: String,
    pub args: Value,
}

/// The local result of a [`ToolInvocation`], fed back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

/// One entry of the running model conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    User(String),
    Assistant {
        text: Option<String>,
        tool_calls: Vec<ToolInvocation>,
    },
    ToolResults(Vec<ToolOutcome>),
}

/// What the model sent back for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCalls {
        text: Option<String>,
        calls: Vec<ToolInvocation>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the arguments object; `None` for tools without arguments.
    pub parameters: Option<Value>,
}

pub struct GenerateRequest<'a> {
    pub system_instruction: &'a str,
    pub messages: &'a [ChatMessage],
    pub tools: &'a [ToolDeclaration],
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model service temporarily unavailable: {0}")]
    Transient(String),
    #[error("model service error: {0}")]
    Permanent(String),
    #[error("model returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Transient(_))
    }

    /// Classify a non-success HTTP status. Only timeouts and server-side
    /// availability errors are worth retrying; quota exhaustion (429) is not.
    pub fn from_status(service: &str, status: u16, body: &str) -> Self {
        let detail = format!("{} API Error ({}): {}", service, status, body);
        match status {
            408 | 500 | 502 | 503 | 504 => LlmError::Transient(detail),
            _ => LlmError::Permanent(detail),
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        // Request URLs may carry credentials.
        let e = e.without_url();
        if e.is_timeout() || e.is_connect() {
            return LlmError::Transient(e.to_string());
        }
        if let Some(status) = e.status() {
            return LlmError::from_status("HTTP", status.as_u16(), &e.to_string());
        }
        if e.is_decode() {
            return LlmError::Permanent(format!("malformed response: {}", e));
        }
        if e.is_request() || e.is_body() {
            return LlmError::Transient(e.to_string());
        }
        LlmError::Permanent(e.to_string())
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn provider_type(&self) -> ProviderType;

    // Send the whole running conversation plus the tool manifest and return the model's reply
    async fn generate(
        &self,
        model_id: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<ModelReply, LlmError>;
}

/// The active provider and model, wrapped in the retry policy and a
/// per-request timeout.
pub struct LlmManager {
    provider: Box<dyn LlmProvider>,
    model_id: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl LlmManager {
    pub fn new(provider: Box<dyn LlmProvider>, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        info!(
            "Setting active LLM: {} ({})",
            provider.provider_type(),
            model_id
        );
        Self {
            provider,
            model_id,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let Some(api_key) = config.api_key() else {
            bail!(
                "{} not found. Set it in the environment or in a .env file.",
                config.api_key_env_var()
            );
        };
        let provider: Box<dyn LlmProvider> = match config.provider {
            ProviderType::Google => {
                let mut p = GoogleProvider::new(api_key.to_string());
                if let Some(base) = &config.api_base {
                    p = p.with_base_url(base);
                }
                Box::new(p)
            }
            ProviderType::OpenAI => {
                let mut p = OpenAiProvider::new(api_key.to_string());
                if let Some(base) = &config.api_base {
                    p = p.with_base_url(base);
                }
                Box::new(p)
            }
        };
        Ok(Self::new(provider, config.model.clone())
            .with_retry(config.retry.clone())
            .with_timeout(Duration::from_secs(config.request_timeout_secs)))
    }

    pub fn get_active_info(&self) -> (ProviderType, &str) {
        (self.provider.provider_type(), &self.model_id)
    }

    /// Send one request, retrying transient failures. A request that outlives
    /// the timeout counts as transient.
    pub async fn generate(&self, request: &GenerateRequest<'_>) -> Result<ModelReply, LlmError> {
        let provider = self.provider.as_ref();
        let model_id = self.model_id.as_str();
        let timeout = self.timeout;
        self.retry
            .run("generate", move || async move {
                debug!("Sending {} message(s) to {}", request.messages.len(), model_id);
                match tokio::time::timeout(timeout, provider.generate(model_id, request)).await {
                    Ok(reply) => reply,
                    Err(_) => Err(LlmError::Transient(format!(
                        "request timed out after {}s",
                        timeout.as_secs_f32()
                    ))),
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Google
        }

        async fn generate(
            &self,
            _model_id: &str,
            _request: &GenerateRequest<'_>,
        ) -> Result<ModelReply, LlmError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ModelReply::Text("too late".to_string()))
        }
    }

    struct FlakyProvider {
        calls: Arc<AtomicUsize>,
        failures: usize,
        error: fn() -> LlmError,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn provider_type(&self) -> ProviderType {
            ProviderType::OpenAI
        }

        async fn generate(
            &self,
            _model_id: &str,
            _request: &GenerateRequest<'_>,
        ) -> Result<ModelReply, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)())
            } else {
                Ok(ModelReply::Text("ok".to_string()))
            }
        }
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    fn empty_request() -> GenerateRequest<'static> {
        GenerateRequest {
            system_instruction: "",
            messages: &[],
            tools: &[],
        }
    }

    #[test]
    fn status_classification() {
        assert!(LlmError::from_status("Gemini", 503, "overloaded").is_transient());
        assert!(LlmError::from_status("Gemini", 500, "").is_transient());
        assert!(LlmError::from_status("Gemini", 408, "").is_transient());
        assert!(!LlmError::from_status("Gemini", 400, "bad request").is_transient());
        assert!(!LlmError::from_status("Gemini", 429, "quota").is_transient());
        assert!(!LlmError::from_status("Gemini", 403, "").is_transient());
    }

    #[test]
    fn provider_type_parses_aliases() {
        assert_eq!("google".parse::<ProviderType>().unwrap(), ProviderType::Google);
        assert_eq!("Gemini".parse::<ProviderType>().unwrap(), ProviderType::Google);
        assert_eq!("openai".parse::<ProviderType>().unwrap(), ProviderType::OpenAI);
        assert!("zai".parse::<ProviderType>().is_err());
    }

    #[tokio::test]
    async fn timeout_is_reported_as_transient() {
        let llm = LlmManager::new(Box::new(SlowProvider), "gemini-test")
            .with_retry(fast_retry(0))
            .with_timeout(Duration::from_millis(20));
        let err = llm.generate(&empty_request()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let llm = LlmManager::new(
            Box::new(FlakyProvider {
                calls: calls.clone(),
                failures: 2,
                error: || LlmError::Transient("503".to_string()),
            }),
            "m",
        )
        .with_retry(fast_retry(3));
        let reply = llm.generate(&empty_request()).await.unwrap();
        assert_eq!(reply, ModelReply::Text("ok".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let llm = LlmManager::new(
            Box::new(FlakyProvider {
                calls: calls.clone(),
                failures: 5,
                error: || LlmError::Permanent("400".to_string()),
            }),
            "m",
        )
        .with_retry(fast_retry(3));
        let err = llm.generate(&empty_request()).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
