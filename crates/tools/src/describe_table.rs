//! `describe_table`: column metadata for one table.

use crate::args;
use async_trait::async_trait;
use dvagent_core::error::ToolError;
use dvagent_core::tool::{Tool, ToolContext, ToolResult};
use dvagent_core::DataBackend;
use serde_json::json;
use std::sync::Arc;

/// Attributes included in the result; the full count is still reported.
pub const MAX_ATTRIBUTES: usize = 50;

pub struct DescribeTableTool {
    backend: Arc<dyn DataBackend>,
}

impl DescribeTableTool {
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for DescribeTableTool {
    fn name(&self) -> &str {
        "describe_table"
    }

    fn description(&self) -> &str {
        "Get detailed metadata for a specific table (entity). Returns the table's columns (attributes) with their data types and which one is the primary key."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Logical name of the table (e.g., 'account', 'contact', 'cr123_customtable')"
                }
            },
            "required": ["table_name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let table_name = args::required_str(&arguments, "table_name")?;
        let schema = self.backend.describe_table(table_name).await?;

        let attribute_count = schema.attributes.len();
        let attributes: Vec<_> = schema.attributes.into_iter().take(MAX_ATTRIBUTES).collect();

        Ok(ToolResult::ok(json!({
            "table_name": schema.logical_name,
            "attributes": attributes,
            "attribute_count": attribute_count,
            "message": format!(
                "Found {attribute_count} attributes for table '{table_name}' (showing first {MAX_ATTRIBUTES})"
            ),
        })))
    }
}
