//! Catalog of serving-endpoint models offered in the model selector.
//!
//! Tool-capable models come first, then the ones that cannot drive the
//! Dataverse tools.

use serde::Serialize;

/// One selectable chat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub provider: &'static str,
    pub supports_tools: bool,
    pub context_window: u32,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

const fn chat(
    id: &'static str,
    name: &'static str,
    provider: &'static str,
    supports_tools: bool,
    context_window: u32,
) -> ModelInfo {
    ModelInfo {
        id,
        name,
        provider,
        supports_tools,
        context_window,
        kind: "chat",
    }
}

pub const MODEL_CATALOG: &[ModelInfo] = &[
    chat("databricks-claude-3.7-sonnet", "Claude 3.7 Sonnet", "Anthropic", true, 200_000),
    chat("databricks-claude-sonnet-4", "Claude Sonnet 4", "Anthropic", true, 200_000),
    chat("databricks-claude-sonnet-4-5", "Claude Sonnet 4.5", "Anthropic", true, 200_000),
    chat("databricks-dbrx-instruct", "DBRX Instruct", "Databricks", true, 32_768),
    chat("databricks-gemma-3-12b", "Gemma 3 12B", "Google", true, 8_192),
    chat("databricks-gemini-2-5-flash", "Gemini 2.5 Flash", "Google", true, 1_000_000),
    chat("databricks-gemini-2-5-pro", "Gemini 2.5 Pro", "Google", true, 2_000_000),
    chat("databricks-gpt-5", "GPT-5", "OpenAI", true, 128_000),
    chat("databricks-gpt-5-1", "GPT-5.1", "OpenAI", true, 128_000),
    chat("databricks-gpt-5-mini", "GPT-5 Mini", "OpenAI", true, 128_000),
    chat("databricks-gpt-5-nano", "GPT-5 Nano", "OpenAI", true, 128_000),
    chat("databricks-gpt-oss-120b", "GPT OSS 120B", "OpenAI", true, 128_000),
    chat("databricks-gpt-oss-20b", "GPT OSS 20B", "OpenAI", true, 128_000),
    chat("databricks-meta-llama-3-1-405b-instruct", "Llama 3.1 405B Instruct", "Meta", true, 128_000),
    chat("databricks-meta-llama-3-1-70b-instruct", "Llama 3.1 70B Instruct", "Meta", true, 128_000),
    chat("databricks-meta-llama-3-2-1b-instruct", "Llama 3.2 1B Instruct", "Meta", true, 128_000),
    chat("databricks-meta-llama-3-2-3b-instruct", "Llama 3.2 3B Instruct", "Meta", true, 128_000),
    chat("databricks-meta-llama-3-3-70b-instruct", "Llama 3.3 70B Instruct", "Meta", true, 128_000),
    chat("databricks-llama-4-maverick", "Llama 4 Maverick (Preview)", "Meta", true, 128_000),
    chat("databricks-mixtral-8x7b-instruct", "Mixtral 8x7B Instruct", "Mistral AI", true, 32_768),
    chat("databricks-claude-opus-4", "Claude Opus 4", "Anthropic", false, 200_000),
    chat("databricks-claude-opus-4-1", "Claude Opus 4.1", "Anthropic", false, 200_000),
    chat("databricks-meta-llama-3-1-8b-instruct", "Llama 3.1 8B Instruct", "Meta", false, 128_000),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<_> = MODEL_CATALOG.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), MODEL_CATALOG.len());
    }

    #[test]
    fn tool_capable_models_come_first() {
        let first_without = MODEL_CATALOG.iter().position(|m| !m.supports_tools).unwrap();
        assert!(MODEL_CATALOG[first_without..].iter().all(|m| !m.supports_tools));
    }

    #[test]
    fn serializes_type_field() {
        let json = serde_json::to_value(MODEL_CATALOG[0]).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["supports_tools"], true);
    }
}
