//! `read_query`: OData record queries against one table.

use crate::args;
use async_trait::async_trait;
use dvagent_core::backend::RecordQuery;
use dvagent_core::error::ToolError;
use dvagent_core::tool::{Tool, ToolContext, ToolResult};
use dvagent_core::DataBackend;
use serde_json::json;
use std::sync::Arc;

pub struct ReadQueryTool {
    backend: Arc<dyn DataBackend>,
}

impl ReadQueryTool {
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ReadQueryTool {
    fn name(&self) -> &str {
        "read_query"
    }

    fn description(&self) -> &str {
        "Query records from a Dataverse table using simple OData syntax. Retrieve data with optional filtering, sorting, and column selection."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Logical name of the table to query (e.g., 'account', 'contact')"
                },
                "select": {
                    "type": "string",
                    "description": "Comma-separated list of columns to return (e.g., 'name,revenue')"
                },
                "filter": {
                    "type": "string",
                    "description": "OData filter expression (e.g., \"revenue gt 1000000\")"
                },
                "top": {
                    "type": "integer",
                    "description": "Maximum number of records to return (default: 10)"
                },
                "orderby": {
                    "type": "string",
                    "description": "OData orderby expression (e.g., 'createdon desc')"
                }
            },
            "required": ["table_name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let table_name = args::required_str(&arguments, "table_name")?;
        let query = RecordQuery {
            entity_set: self.backend.entity_set_name(table_name).await?,
            select: args::column_list(&arguments, "select")?,
            filter: args::optional_str(&arguments, "filter")?.map(String::from),
            order_by: args::optional_str(&arguments, "orderby")?.map(String::from),
            top: args::u32_or(&arguments, "top", 10)?,
        };

        let records = self.backend.read_query(&query).await?;
        let count = records.len();
        tracing::debug!(table = table_name, entity_set = %query.entity_set, count, "Query returned");

        Ok(ToolResult::ok(json!({
            "table_name": table_name,
            "entity_set_name": query.entity_set,
            "records": records,
            "count": count,
            "message": format!("Retrieved {count} record(s) from {table_name}"),
        })))
    }
}
