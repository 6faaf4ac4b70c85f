//! Dispatch of parsed commands to backend handlers.
//!
//! Handlers are registered per `(provider, method)` pair. Anything not
//! registered resolves to [`ExecutionError::Unsupported`], so new providers
//! plug in without touching the parser or the completer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::parser::Command;

/// Failure reported by the execution side, distinct from a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Method not supported")]
    Unsupported { provider: String, method: String },

    /// Message from the backend, passed through unchanged.
    #[error("{0}")]
    Backend(String),
}

impl ExecutionError {
    pub fn backend(message: impl Into<String>) -> Self {
        ExecutionError::Backend(message.into())
    }
}

/// One backend operation, e.g. Gemini `generateContent`.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn call(&self, command: &Command) -> Result<String, ExecutionError>;
}

/// Runs a parsed command and returns its text output.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, command: &Command) -> Result<String, ExecutionError>;
}

type HandlerKey = (String, String);

/// Registry mapping `(provider, method)` to a handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerKey, Arc<dyn MethodHandler>>,
    /// Registration order, for stable listings.
    order: Vec<HandlerKey>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`, replacing any earlier handler for the same pair.
    pub fn register(
        &mut self,
        provider: impl Into<String>,
        method: impl Into<String>,
        handler: Arc<dyn MethodHandler>,
    ) -> &mut Self {
        let key = (provider.into(), method.into());
        if self.handlers.insert(key.clone(), handler).is_none() {
            self.order.push(key);
        }
        self
    }

    pub fn lookup(&self, provider: &str, method: &str) -> Option<Arc<dyn MethodHandler>> {
        self.handlers
            .get(&(provider.to_string(), method.to_string()))
            .cloned()
    }

    /// Providers with at least one handler, in registration order.
    pub fn providers(&self) -> Vec<String> {
        let mut providers: Vec<String> = Vec::new();
        for (provider, _) in &self.order {
            if !providers.contains(provider) {
                providers.push(provider.clone());
            }
        }
        providers
    }

    /// Methods registered for `provider`, in registration order.
    pub fn methods(&self, provider: &str) -> Vec<String> {
        self.order
            .iter()
            .filter(|(p, _)| p == provider)
            .map(|(_, method)| method.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.order)
            .finish()
    }
}

#[async_trait]
impl Executor for HandlerRegistry {
    async fn execute(&self, command: &Command) -> Result<String, ExecutionError> {
        let Some(handler) = self.lookup(&command.provider, &command.method) else {
            tracing::info!(
                provider = %command.provider,
                method = %command.method,
                "no handler registered"
            );
            return Err(ExecutionError::Unsupported {
                provider: command.provider.clone(),
                method: command.method.clone(),
            });
        };
        tracing::info!(
            provider = %command.provider,
            model = %command.model,
            method = %command.method,
            "executing command"
        );
        let result = handler.call(command).await;
        if let Err(err) = &result {
            tracing::warn!("command failed: {err}");
        }
        result
    }
}
