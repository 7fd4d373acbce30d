//! One sidebar chat turn: assemble, stream, collect.

use crate::context::{AssemblyInput, AssemblyMetadata, ContextAssembler};
use crate::stream::consume_stream;
use notechat_config::AppConfig;
use notechat_core::cancel::CancellationToken;
use notechat_core::error::ProviderError;
use notechat_core::message::ChatMessage;
use notechat_core::provider::{CompletionRequest, Provider, Usage};
use std::sync::Arc;
use tracing::{info, warn};

/// The result of one [`ChatSession::send`].
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// The assistant reply (possibly partial when cancelled).
    pub reply: ChatMessage,
    /// Whether the user stopped the stream.
    pub cancelled: bool,
    pub usage: Option<Usage>,
    /// How the request was assembled.
    pub metadata: AssemblyMetadata,
}

/// Drives chat turns against a completion provider.
///
/// Holds no conversation state; the caller owns the history and appends
/// each returned reply itself.
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: String,
    role_prompt: String,
    assembler: ContextAssembler,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            system_prompt: String::new(),
            role_prompt: String::new(),
            assembler: ContextAssembler::with_default_budget(),
        }
    }

    /// Build a session from loaded configuration.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        let mut session = Self::new(provider, config.model.clone())
            .with_temperature(config.temperature)
            .with_system_prompt(config.system_prompt.clone())
            .with_assembler(ContextAssembler::from_config(&config.budget));
        session.max_tokens = config.max_response_tokens;
        session
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Persona prompt merged after the system prompt.
    pub fn with_role_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.role_prompt = prompt.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `user_message` with the given prior turns and attached notes.
    ///
    /// `on_delta` receives the reply text as it streams in. If `cancel` is
    /// set mid-stream the partial reply is returned with `cancelled = true`.
    pub async fn send<F>(
        &self,
        history: &[ChatMessage],
        documents: &[String],
        user_message: &str,
        cancel: &CancellationToken,
        on_delta: F,
    ) -> Result<ChatTurn, ProviderError>
    where
        F: FnMut(&str),
    {
        let assembled = self.assembler.assemble(&AssemblyInput {
            system_prompt: &self.system_prompt,
            role_prompt: &self.role_prompt,
            documents,
            history,
            user_message,
        });

        let mut request = CompletionRequest::new(self.model.clone(), assembled.messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request.stream = true;

        info!(
            provider = self.provider.name(),
            model = %self.model,
            messages = request.messages.len(),
            estimated_tokens = assembled.metadata.total_tokens,
            "Sending chat request"
        );

        let rx = self.provider.stream(request).await.inspect_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Provider request failed");
        })?;

        let outcome = consume_stream(rx, cancel, on_delta).await.inspect_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Stream failed");
        })?;

        Ok(ChatTurn {
            reply: ChatMessage::assistant(outcome.text),
            cancelled: outcome.cancelled,
            usage: outcome.usage,
            metadata: assembled.metadata,
        })
    }
}
