//! Dataverse tool implementations for dvagent.
//!
//! Each tool wraps a shared [`DataBackend`] and turns model-supplied JSON
//! arguments into one backend call:
//! list tables, describe a table, query records, create and update records.

pub mod args;
pub mod create_record;
pub mod describe_table;
pub mod list_tables;
pub mod read_query;
pub mod update_record;

#[cfg(test)]
pub(crate) mod mock;

use dvagent_core::tool::ToolRegistry;
use dvagent_core::DataBackend;
use std::sync::Arc;

pub use create_record::CreateRecordTool;
pub use describe_table::DescribeTableTool;
pub use list_tables::ListTablesTool;
pub use read_query::ReadQueryTool;
pub use update_record::UpdateRecordTool;

/// Names of the tools the agent is allowed to call.
pub const DATAVERSE_TOOLS: &[&str] = &[
    "list_tables",
    "describe_table",
    "read_query",
    "create_record",
    "update_record",
];

/// Create the Dataverse tool registry over `backend`, checked against
/// [`DATAVERSE_TOOLS`].
pub fn dataverse_registry(backend: Arc<dyn DataBackend>) -> dvagent_core::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ListTablesTool::new(Arc::clone(&backend))));
    registry.register(Box::new(DescribeTableTool::new(Arc::clone(&backend))));
    registry.register(Box::new(ReadQueryTool::new(Arc::clone(&backend))));
    registry.register(Box::new(CreateRecordTool::new(Arc::clone(&backend))));
    registry.register(Box::new(UpdateRecordTool::new(backend)));
    registry.validate_names(DATAVERSE_TOOLS)?;
    Ok(registry)
}
