//! `update_record`: patch one record by id.

use crate::args;
use async_trait::async_trait;
use dvagent_core::error::ToolError;
use dvagent_core::tool::{Tool, ToolContext, ToolResult};
use dvagent_core::DataBackend;
use serde_json::json;
use std::sync::Arc;

pub struct UpdateRecordTool {
    backend: Arc<dyn DataBackend>,
}

impl UpdateRecordTool {
    pub fn new(backend: Arc<dyn DataBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for UpdateRecordTool {
    fn name(&self) -> &str {
        "update_record"
    }

    fn description(&self) -> &str {
        "Update an existing record in a Dataverse table."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "table_name": {
                    "type": "string",
                    "description": "Logical name of the table"
                },
                "record_id": {
                    "type": "string",
                    "description": "GUID of the record to update"
                },
                "data": {
                    "type": "object",
                    "description": "Column values to change, keyed by logical name"
                }
            },
            "required": ["table_name", "record_id", "data"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let table_name = args::required_str(&arguments, "table_name")?;
        let record_id = args::required_str(&arguments, "record_id")?;
        let data = args::required_object(&arguments, "data")?;

        let entity_set = self.backend.entity_set_name(table_name).await?;
        self.backend.update_record(&entity_set, record_id, data).await?;
        tracing::info!(table = table_name, record_id, "Record updated");

        Ok(ToolResult::ok(json!({
            "table_name": table_name,
            "record_id": record_id,
            "message": "Record updated successfully",
        })))
    }
}
