//! # dvagent Core
//!
//! Domain types, traits, and error definitions for the dvagent Dataverse agent.
//! This crate has **no HTTP or runtime dependencies**: it defines the domain
//! model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is a trait here:
//! - [`Provider`]: the model gateway (chat completions with tool calling)
//! - [`Tool`]: a named, schema-described handler the model may invoke
//! - [`DataBackend`]: the CRUD/query interface over the data store
//! - [`CredentialProvider`]: one link of the credential fallback chain
//!
//! Implementations live in their respective crates, so the loop can be tested
//! with scripted providers and in-memory backends.

pub mod backend;
pub mod credential;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use backend::{AttributeInfo, DataBackend, RecordQuery, TableInfo, TableSchema};
pub use credential::{Credential, CredentialChain, CredentialContext, CredentialProvider};
pub use error::{AuthError, BackendError, Error, ProviderError, Result, ToolError};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry, ToolResult};
