//! System prompt selection.

use std::path::Path;
use tracing::{debug, warn};

/// Instruction text used when no prompt file is configured or readable.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a Dataverse AI assistant with access to Microsoft Dataverse data.

## Available Tools:
1. **list_tables** - Discover available tables (entities)
2. **describe_table** - Get schema/columns for a specific table
3. **read_query** - Query records using OData
4. **create_record** - Insert new records
5. **update_record** - Modify existing records

Always use the available tools to access real data - never make up information!";

/// Read the system prompt from `path`, falling back to
/// [`DEFAULT_SYSTEM_PROMPT`] when the file is missing, unreadable or blank.
pub fn load_system_prompt(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return DEFAULT_SYSTEM_PROMPT.to_string();
    };

    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            debug!(path = %path.display(), chars = text.len(), "Loaded system prompt");
            text
        }
        Ok(_) => {
            warn!(path = %path.display(), "System prompt file is empty, using built-in prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read system prompt file, using built-in prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}
