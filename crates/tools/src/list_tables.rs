//! `list_tables`: discover the tables (entities) of the environment.

use crate::args;
use async_trait::async_trait;
use dvagent_core::error::ToolError;
use dvagent_core::tool::{Tool, ToolContext, ToolResult};
use dvagent_core::DataBackend;
use serde_json::json;
use std::sync::Arc;

/// Filter applied when only custom tables are requested.
pub const CUSTOM_ONLY_FILTER: &str = "IsCustomEntity eq true";

pub struct ListTablesTool {
    backend: Arc<dyn DataBackend>,
}

impl ListTablesTool {
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &str {
        "list_tables"
    }

    fn description(&self) -> &str {
        "List all tables (entities) in Dataverse. Returns metadata about available tables including logical names, display names, and entity set names."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "filter_query": {
                    "type": "string",
                    "description": "OData filter expression (e.g., 'IsCustomEntity eq true')"
                },
                "top": {
                    "type": "integer",
                    "description": "Maximum number of tables to return (default: 100)"
                },
                "custom_only": {
                    "type": "boolean",
                    "description": "If true, only return custom tables"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let top = args::u32_or(&arguments, "top", 100)?;
        let custom_only = args::bool_or(&arguments, "custom_only", false)?;
        let filter = match args::optional_str(&arguments, "filter_query")? {
            Some(filter) => Some(filter),
            None if custom_only => Some(CUSTOM_ONLY_FILTER),
            None => None,
        };

        let tables = self.backend.list_tables(filter, top).await?;
        tracing::debug!(count = tables.len(), ?filter, "Listed tables");

        Ok(ToolResult::ok(json!({
            "tables": tables,
            "count": tables.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    fn tool(backend: &Arc<MockBackend>) -> ListTablesTool {
        ListTablesTool::new(Arc::clone(backend) as Arc<dyn DataBackend>)
    }

    #[tokio::test]
    async fn lists_with_top() {
        let backend = Arc::new(MockBackend::with_tables(&[("account", false), ("contact", false), ("lead", false)]));
        let result = tool(&backend)
            .execute(json!({"top": 2}), &ToolContext::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data["count"], 2);
        assert_eq!(result.data["tables"][0]["logical_name"], "account");
        assert_eq!(result.data["tables"][0]["entity_set_name"], "accounts");
        assert_eq!(result.data["tables"][1]["display_name"], "CONTACT");
        assert_eq!(backend.calls.lock().unwrap().as_slice(), ["list_tables(2)"]);
    }

    #[tokio::test]
    async fn custom_only_without_filter_uses_custom_filter() {
        let backend = Arc::new(MockBackend::with_tables(&[("account", false), ("cr1_widget", true)]));
        let result = tool(&backend)
            .execute(json!({"custom_only": true}), &ToolContext::default())
            .await
            .unwrap();

        assert_eq!(result.data["count"], 1);
        assert_eq!(result.data["tables"][0]["is_custom"], true);
        assert_eq!(backend.last_filter.lock().unwrap().as_deref(), Some(CUSTOM_ONLY_FILTER));
    }

    #[tokio::test]
    async fn explicit_filter_wins_over_custom_only() {
        let backend = Arc::new(MockBackend::with_tables(&[("account", false)]));
        tool(&backend)
            .execute(
                json!({"custom_only": true, "filter_query": "IsActivity eq false"}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(backend.last_filter.lock().unwrap().as_deref(), Some("IsActivity eq false"));
    }

    #[tokio::test]
    async fn default_top_is_100() {
        let backend = Arc::new(MockBackend::default());
        tool(&backend).execute(json!({}), &ToolContext::default()).await.unwrap();
        assert_eq!(backend.calls.lock().unwrap().as_slice(), ["list_tables(100)"]);
    }
}
