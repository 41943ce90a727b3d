//! Model gateway implementations for dvagent.
//!
//! All providers implement the `dvagent_core::Provider` trait.

pub mod openai_compat;

pub use dvagent_config::EndpointStyle;
pub use openai_compat::OpenAiCompatProvider;
