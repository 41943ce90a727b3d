//! DataBackend trait: the CRUD/query surface the tools run against.
//!
//! The production implementation talks to the Dataverse Web API; tests use
//! in-memory backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::error::BackendError;

/// Summary of one table (entity definition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub logical_name: String,
    pub display_name: Option<String>,
    pub entity_set_name: Option<String>,
    pub is_custom: bool,
}

/// One column (attribute) of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeInfo {
    pub logical_name: String,
    pub attribute_type: Option<String>,
    pub is_primary_id: bool,
}

/// Schema of a table: its attributes in backend order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub logical_name: String,
    pub attributes: Vec<AttributeInfo>,
}

/// An OData-style record query against an entity set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub entity_set: String,
    pub select: Vec<String>,
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub top: u32,
}

/// The data store the agent's tools operate on.
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// List tables, optionally narrowed by an OData filter expression,
    /// truncated to `top`. A `top` of 0 means no limit.
    async fn list_tables(&self, filter: Option<&str>, top: u32) -> Result<Vec<TableInfo>, BackendError>;

    /// Full schema of one table. Unknown table ⇒ `BackendError::NotFound`.
    async fn describe_table(&self, logical_name: &str) -> Result<TableSchema, BackendError>;

    /// Resolve a logical name (`account`) to its entity set (`accounts`).
    async fn entity_set_name(&self, logical_name: &str) -> Result<String, BackendError>;

    /// Run a record query and return the matching rows.
    async fn read_query(&self, query: &RecordQuery) -> Result<Vec<Map<String, Value>>, BackendError>;

    /// Create a record; returns the new record id.
    async fn create_record(&self, entity_set: &str, fields: &Map<String, Value>) -> Result<String, BackendError>;

    /// Patch an existing record.
    async fn update_record(
        &self,
        entity_set: &str,
        record_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), BackendError>;
}
