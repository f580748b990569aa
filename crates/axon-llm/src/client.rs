//! Completion orchestrator
//!
//! The top-level facade: dispatches canonical requests to the right provider
//! adapter, wraps every outbound call in the retry pipeline, and drives the
//! tool-calling loop to convergence.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use axon_config::{AxonConfig, ProviderType};
use axon_core::{RequestContext, TokenSupplier};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::provider::anthropic::AnthropicProvider;
use crate::provider::google::GoogleProvider;
use crate::provider::openai::{OpenAiDialect, OpenAiProvider};
use crate::provider::{EventStream, Provider};
use crate::retry::RetryPolicy;
use crate::routing::ModelRouter;
use crate::types::{
    CompletionRequest, CompletionResponse, Message, StreamEvent, TokenUsage, ToolCallDelta, ToolCallRequest,
    ToolCallResult,
};

/// Executes tool calls on behalf of the orchestrator
///
/// Domain failures belong in [`ToolCallResult::is_error`] so the model can
/// react to them; returning `Err` aborts the whole loop.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute one tool call and produce its result
    ///
    /// # Errors
    ///
    /// Returns an error only for failures the loop cannot recover from.
    async fn execute(&self, call: &ToolCallRequest) -> anyhow::Result<ToolCallResult>;
}

/// Tool-calling loop settings
#[derive(Debug, Clone)]
pub struct ToolLoopOptions {
    /// Provider calls allowed before the loop fails with exhaustion
    pub max_iterations: u32,
}

impl Default for ToolLoopOptions {
    fn default() -> Self {
        Self { max_iterations: 20 }
    }
}

/// Terminal result of a converged tool loop
#[derive(Debug, Clone)]
pub struct ToolLoopOutcome {
    /// Final text content from the model
    pub content: String,
    /// Usage summed over every turn
    pub usage: TokenUsage,
    /// Provider calls made
    pub iterations: u32,
    /// The full conversation, tool traffic included
    pub messages: Vec<Message>,
}

impl ToolLoopOutcome {
    /// Deserialize the final content as JSON
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error if the content is not valid JSON
    /// for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// Observation emitted by the streaming tool loop
#[derive(Debug, Clone)]
pub enum ToolLoopEvent {
    /// Incremental text content
    TextDelta(String),
    /// Partial tool-call data
    ToolCallDelta(ToolCallDelta),
    /// A fully accumulated tool call, about to be executed
    ToolCall(ToolCallRequest),
    /// A tool result was appended to the conversation
    ToolResult(ToolCallResult),
    /// The loop converged
    Completed(ToolLoopOutcome),
}

/// Completion orchestrator over the configured providers
pub struct Completions {
    providers: HashMap<String, Arc<dyn Provider>>,
    router: ModelRouter,
    retry: RetryPolicy,
    tool_loop: ToolLoopOptions,
}

impl Completions {
    /// Build the orchestrator from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a provider fails to initialize or a model filter
    /// pattern is invalid.
    pub fn from_config(config: &AxonConfig) -> Result<Self, LlmError> {
        Self::with_suppliers(config, HashMap::new())
    }

    /// Build the orchestrator, attaching token suppliers to Vertex-mode
    /// Google providers by name
    ///
    /// # Errors
    ///
    /// Returns an error if a provider fails to initialize or a model filter
    /// pattern is invalid.
    pub fn with_suppliers(
        config: &AxonConfig,
        mut suppliers: HashMap<String, Arc<dyn TokenSupplier>>,
    ) -> Result<Self, LlmError> {
        let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();

        for (name, provider_config) in &config.providers {
            let provider: Arc<dyn Provider> = match provider_config.provider_type {
                ProviderType::Openai => Arc::new(OpenAiProvider::new(
                    name.clone(),
                    OpenAiDialect::OpenAi,
                    provider_config,
                )?),
                ProviderType::Xai => Arc::new(OpenAiProvider::new(name.clone(), OpenAiDialect::Xai, provider_config)?),
                ProviderType::Anthropic => Arc::new(AnthropicProvider::new(name.clone(), provider_config)?),
                ProviderType::Google => {
                    let mut google = GoogleProvider::new(name.clone(), provider_config)?;
                    if let Some(supplier) = suppliers.remove(name) {
                        google = google.with_token_supplier(supplier);
                    }
                    Arc::new(google)
                }
            };
            providers.insert(name.clone(), provider);
        }

        Ok(Self {
            providers,
            router: ModelRouter::new(config)?,
            retry: RetryPolicy::from_config(&config.retry),
            tool_loop: ToolLoopOptions {
                max_iterations: config.tool_loop.max_iterations,
            },
        })
    }

    /// Resolve a model name to its provider, rewriting the request's model
    /// to the provider-local identifier
    fn resolve(&self, request: &CompletionRequest) -> Result<(CompletionRequest, Arc<dyn Provider>), LlmError> {
        let resolved = self.router.resolve(&request.model)?;
        let provider = self
            .providers
            .get(&resolved.provider_name)
            .ok_or_else(|| LlmError::ProviderNotFound {
                provider: resolved.provider_name.clone(),
            })?;

        let mut request = request.clone();
        request.model = resolved.model_id;

        Ok((request, Arc::clone(provider)))
    }

    /// Reject requests the target provider cannot serve
    fn validate(request: &CompletionRequest, provider: &Arc<dyn Provider>) -> Result<(), LlmError> {
        if request.messages.is_empty() {
            return Err(LlmError::InvalidRequest("message list is empty".to_owned()));
        }

        let capabilities = provider.capabilities();
        let unsupported = |capability| LlmError::Unsupported {
            provider: provider.name().to_owned(),
            capability,
        };

        if request.tools.as_ref().is_some_and(|t| !t.is_empty()) && !capabilities.tool_calling {
            return Err(unsupported("tool calling"));
        }
        if request.response_schema.is_some() && !capabilities.structured_output {
            return Err(unsupported("structured output"));
        }
        if request.stream && !capabilities.streaming {
            return Err(unsupported("streaming"));
        }

        Ok(())
    }

    /// Execute a non-streaming completion
    ///
    /// # Errors
    ///
    /// Surfaces transport, API, parse, and validation errors per the error
    /// taxonomy; transient failures are retried first.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<CompletionResponse, LlmError> {
        let (request, provider) = self.resolve(request)?;
        Self::validate(&request, &provider)?;

        self.retry
            .run(&context.cancel, || provider.complete(&request, context))
            .await
    }

    /// Execute a streaming completion
    ///
    /// Retry applies to connection establishment only; an established stream
    /// is consumed exactly once.
    ///
    /// # Errors
    ///
    /// Surfaces the same error taxonomy as [`Completions::complete`].
    pub async fn complete_stream(
        &self,
        request: &CompletionRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        let (mut request, provider) = self.resolve(request)?;
        request.stream = true;
        Self::validate(&request, &provider)?;

        self.retry
            .run(&context.cancel, || provider.complete_stream(&request, context))
            .await
    }

    /// Drive a multi-turn conversation with externally executed tools to
    /// convergence
    ///
    /// Each iteration is one provider call. Tool calls execute sequentially
    /// in provider order; their results re-enter the conversation as tool
    /// messages in the same order.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ToolLoopExhausted` after `max_iterations` provider
    /// calls without a terminal response, `LlmError::Cancelled` on
    /// cancellation, and `LlmError::Internal` if the executor fails.
    pub async fn complete_with_tools(
        &self,
        request: &CompletionRequest,
        executor: &dyn ToolExecutor,
        context: &RequestContext,
    ) -> Result<ToolLoopOutcome, LlmError> {
        let (request, provider) = self.resolve(request)?;
        Self::validate(&request, &provider)?;

        let mut messages = request.messages.clone();
        let mut usage = TokenUsage::ZERO;
        let mut iterations = 0;

        loop {
            if context.cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }
            if iterations >= self.tool_loop.max_iterations {
                return Err(LlmError::ToolLoopExhausted { iterations });
            }

            let mut turn_request = request.clone();
            turn_request.messages.clone_from(&messages);

            let response = self
                .retry
                .run(&context.cancel, || provider.complete(&turn_request, context))
                .await?;
            iterations += 1;
            usage += response.usage;

            if !response.has_tool_calls() {
                tracing::debug!(iterations, total_tokens = usage.total(), "tool loop converged");
                messages.push(Message::assistant(response.content.clone()));
                return Ok(ToolLoopOutcome {
                    content: response.content,
                    usage,
                    iterations,
                    messages,
                });
            }

            tracing::debug!(
                iterations,
                tool_calls = response.tool_calls.len(),
                "executing tool calls"
            );
            messages.push(Message::assistant_with_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                if context.cancel.is_cancelled() {
                    return Err(LlmError::Cancelled);
                }
                let result = executor.execute(call).await.map_err(LlmError::Internal)?;
                messages.push(Message::tool(&result));
            }
        }
    }

    /// Streaming variant of the tool loop
    ///
    /// Emits one tagged event per observation instead of a single terminal
    /// value, with the same iteration-bound and cancellation semantics.
    ///
    /// # Errors
    ///
    /// Resolution and validation errors surface immediately; loop errors are
    /// delivered through the returned stream.
    pub fn complete_with_tools_stream(
        &self,
        request: &CompletionRequest,
        executor: Arc<dyn ToolExecutor>,
        context: &RequestContext,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ToolLoopEvent, LlmError>> + Send>>, LlmError> {
        let (mut request, provider) = self.resolve(request)?;
        request.stream = true;
        Self::validate(&request, &provider)?;

        let retry = self.retry.clone();
        let max_iterations = self.tool_loop.max_iterations;
        let context = context.clone();

        let (tx, rx) = futures::channel::mpsc::channel(32);

        tokio::spawn(async move {
            let mut tx = tx;
            if let Err(e) =
                run_streaming_loop(&provider, &retry, max_iterations, request, executor.as_ref(), &context, &mut tx)
                    .await
            {
                let _ = tx.send(Err(e)).await;
            }
        });

        Ok(Box::pin(rx))
    }
}

/// Inner state machine of the streaming tool loop
///
/// Sends events through `tx`; a dropped receiver ends the loop silently.
async fn run_streaming_loop(
    provider: &Arc<dyn Provider>,
    retry: &RetryPolicy,
    max_iterations: u32,
    request: CompletionRequest,
    executor: &dyn ToolExecutor,
    context: &RequestContext,
    tx: &mut futures::channel::mpsc::Sender<Result<ToolLoopEvent, LlmError>>,
) -> Result<(), LlmError> {
    let mut messages = request.messages.clone();
    let mut usage = TokenUsage::ZERO;
    let mut iterations = 0;

    loop {
        if context.cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        if iterations >= max_iterations {
            return Err(LlmError::ToolLoopExhausted { iterations });
        }

        let mut turn_request = request.clone();
        turn_request.messages.clone_from(&messages);

        let mut stream = retry
            .run(&context.cancel, || provider.complete_stream(&turn_request, context))
            .await?;

        let mut turn_text = String::new();
        let mut turn_calls: Vec<ToolCallRequest> = Vec::new();
        // Snapshot semantics: providers may re-yield usage; the last wins
        let mut turn_usage = TokenUsage::ZERO;

        while let Some(event) = stream.next().await {
            if context.cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }
            match event? {
                StreamEvent::TextDelta(text) => {
                    turn_text.push_str(&text);
                    if tx.send(Ok(ToolLoopEvent::TextDelta(text))).await.is_err() {
                        return Ok(());
                    }
                }
                StreamEvent::ToolCallDelta(delta) => {
                    if tx.send(Ok(ToolLoopEvent::ToolCallDelta(delta))).await.is_err() {
                        return Ok(());
                    }
                }
                StreamEvent::ToolCall(call) => {
                    turn_calls.push(call.clone());
                    if tx.send(Ok(ToolLoopEvent::ToolCall(call))).await.is_err() {
                        return Ok(());
                    }
                }
                StreamEvent::Usage(snapshot) => turn_usage = snapshot,
                StreamEvent::Done => break,
            }
        }

        iterations += 1;
        usage += turn_usage;

        if turn_calls.is_empty() {
            messages.push(Message::assistant(turn_text.clone()));
            let outcome = ToolLoopOutcome {
                content: turn_text,
                usage,
                iterations,
                messages,
            };
            let _ = tx.send(Ok(ToolLoopEvent::Completed(outcome))).await;
            return Ok(());
        }

        messages.push(Message::assistant_with_tool_calls(turn_text, turn_calls.clone()));

        for call in &turn_calls {
            if context.cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }
            let result = executor.execute(call).await.map_err(LlmError::Internal)?;
            messages.push(Message::tool(&result));
            if tx.send(Ok(ToolLoopEvent::ToolResult(result))).await.is_err() {
                return Ok(());
            }
        }
    }
}
