//! Canonical types for provider-agnostic request/response representation
//!
//! These are the normalized shapes every wire format converts to and from.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;
pub mod usage;

pub use message::{Content, ContentPart, Message, MessageKind, Role, ToolCallRequest, ToolCallResult};
pub use request::{CompletionParams, CompletionRequest};
pub use response::{CompletionResponse, FinishReason};
pub use stream::{StreamEvent, ToolCallDelta};
pub use tool::{ToolChoice, ToolDefinition};
pub use usage::TokenUsage;
