use std::sync::Arc;

use async_trait::async_trait;
use modelcall_core::Command;
use modelcall_core::ExecutionError;
use modelcall_core::HandlerRegistry;
use modelcall_core::MethodHandler;
use modelcall_core::truncate::truncate_output;

use crate::PROVIDER;
use crate::client::GeminiClient;

/// `Gemini.<model>.generateContent("...")`: the model's text reply.
#[derive(Debug, Clone)]
pub struct GenerateContent {
    client: Arc<GeminiClient>,
}

impl GenerateContent {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MethodHandler for GenerateContent {
    async fn call(&self, command: &Command) -> Result<String, ExecutionError> {
        let text = self
            .client
            .generate_content(&command.model, &command.query)
            .await?;
        Ok(truncate_output(text, self.client.config().max_output_bytes))
    }
}

/// `Gemini.<model>.countTokens("...")`: token count of the query.
#[derive(Debug, Clone)]
pub struct CountTokens {
    client: Arc<GeminiClient>,
}

impl CountTokens {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MethodHandler for CountTokens {
    async fn call(&self, command: &Command) -> Result<String, ExecutionError> {
        let total = self
            .client
            .count_tokens(&command.model, &command.query)
            .await?;
        Ok(total.to_string())
    }
}

/// Register every Gemini method on `registry`.
///
/// `generateText` is accepted as an alias of `generateContent` so commands
/// written against the older API surface keep working.
pub fn register(registry: &mut HandlerRegistry, client: Arc<GeminiClient>) {
    let generate: Arc<dyn MethodHandler> = Arc::new(GenerateContent::new(Arc::clone(&client)));
    registry
        .register(PROVIDER, "generateContent", Arc::clone(&generate))
        .register(PROVIDER, "generateText", generate)
        .register(PROVIDER, "countTokens", Arc::new(CountTokens::new(client)));
}
