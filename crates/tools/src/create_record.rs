//! `create_record`: insert one record.

use crate::args;
use async_trait::async_trait;
use dvagent_core::error::ToolError;
use dvagent_core::tool::{Tool, ToolContext, ToolResult};
use dvagent_core::DataBackend;
use serde_json::json;
use std::sync::Arc;

pub struct CreateRecordTool {
    backend: Arc<dyn DataBackend>,
}

impl CreateRecordTool {
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for CreateRecordTool {
    fn name(&self) -> &str {
        "create_record"
    }

    fn description(&self) -> &str {
        "Create a new record in a Dataverse table."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Logical name of the table"
                },
                "data": {
                    "type": "object",
                    "description": "Column values for the new record, keyed by logical name"
                }
            },
            "required": ["table_name", "data"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let table_name = args::required_str(&arguments, "table_name")?;
        let data = args::required_object(&arguments, "data")?;

        let entity_set = self.backend.entity_set_name(table_name).await?;
        let record_id = self.backend.create_record(&entity_set, data).await?;
        tracing::info!(table = table_name, %record_id, "Record created");

        Ok(ToolResult::ok(json!({
            "table_name": table_name,
            "record_id": record_id,
            "message": "Record created successfully",
        })))
    }
}
