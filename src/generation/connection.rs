use std::env;
use std::error::Error;
use std::fmt;
use std::time::Duration;

use dotenv::dotenv;

use super::endpoints::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_MODEL: &str = "llama3.2";

#[derive(Debug)]
pub enum GenerationError {
    MissingApiKey(String),
    Network(reqwest::Error),
    Api {
        status: reqwest::StatusCode,
        error_body: String,
    },
    EmptyResponse,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::MissingApiKey(key_name) => {
                write!(f, "API key not found in environment: {}", key_name)
            }
            GenerationError::Network(err) => write!(f, "generation service unreachable: {}", err),
            GenerationError::Api { status, error_body } => {
                write!(f, "generation service returned {}: {}", status, error_body)
            }
            GenerationError::EmptyResponse => {
                write!(f, "generation service returned no choices")
            }
        }
    }
}

impl Error for GenerationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GenerationError::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Network(err)
    }
}

/// Connection settings for the generation service. The default points at
/// a local Ollama; hosted endpoints set `api_key_env` to the name of the
/// environment variable holding their key.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: None,
        }
    }
}

pub struct GenerationClient {
    http: reqwest::Client,
    config: GenerationConfig,
}

impl GenerationClient {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    /// One prompt in, one opaque text out. The response passes through
    /// untouched; the composer owns the prompt contract.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        // Resolved per call so a key added to the environment between
        // requests is picked up without rebuilding the client.
        let api_key = match &self.config.api_key_env {
            Some(key_name) => {
                dotenv().ok();
                Some(
                    env::var(key_name)
                        .map_err(|_| GenerationError::MissingApiKey(key_name.clone()))?,
                )
            }
            None => None,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(0.2),
            max_tokens: Some(1024),
        };

        let mut builder = self.http.post(&url).json(&request);
        if let Some(api_key) = api_key {
            builder = builder.bearer_auth(api_key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(GenerationError::Api { status, error_body });
        }

        let body = response.json::<ChatCompletionResponse>().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }
}
