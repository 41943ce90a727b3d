//! The agent loop: the heart of dvagent.
//!
//! The agent follows a **Call → Act → Observe** cycle:
//!
//! 1. **Seed** the conversation with the system prompt and the caller's messages
//! 2. **Send to the model** with every tool definition attached
//! 3. **If tool calls**: execute them in order, append the results, go back to 2
//! 4. **If text response**: that is the answer
//!
//! The loop stops on the first text-only response or when the iteration
//! budget runs out. Every step is mirrored into the
//! [`TraceStore`](dvagent_telemetry::TraceStore) as AGENT, LLM and TOOL spans.

pub mod error;
pub mod loop_runner;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use error::AgentError;
pub use loop_runner::{AgentLoop, AgentOutcome, AgentRequest, MAX_ITERATIONS_MESSAGE, validate_messages};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, load_system_prompt};
