pub mod connection;
pub mod endpoints;

pub use connection::{
    GenerationClient, GenerationConfig, GenerationError, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use endpoints::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// The generation surface the session consumes: single request/response,
/// no streaming. [`GenerationClient`] is the production implementation.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

impl TextGenerator for GenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        GenerationClient::generate(self, prompt).await
    }
}
