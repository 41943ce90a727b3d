//! Stand-in backend used when the `[dataverse]` section is incomplete.
//!
//! The gateway still starts; every tool call then fails with a
//! `BackendError::Config` the model can relay to the user.

use async_trait::async_trait;
use dvagent_core::backend::*;
use dvagent_core::BackendError;
use serde_json::{Map, Value};

pub struct UnconfiguredBackend {
    reason: String,
}

impl UnconfiguredBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn error(&self) -> BackendError {
        BackendError::Config(self.reason.clone())
    }
}

#[async_trait]
impl DataBackend for UnconfiguredBackend {
    async fn list_tables(&self, _filter: Option<&str>, _top: u32) -> Result<Vec<TableInfo>, BackendError> {
        Err(self.error())
    }

    async fn describe_table(&self, _logical_name: &str) -> Result<TableSchema, BackendError> {
        Err(self.error())
    }

    async fn entity_set_name(&self, _logical_name: &str) -> Result<String, BackendError> {
        Err(self.error())
    }

    async fn read_query(&self, _query: &RecordQuery) -> Result<Vec<Map<String, Value>>, BackendError> {
        Err(self.error())
    }

    async fn create_record(&self, _entity_set: &str, _fields: &Map<String, Value>) -> Result<String, BackendError> {
        Err(self.error())
    }

    async fn update_record(
        &self,
        _entity_set: &str,
        _record_id: &str,
        _fields: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        Err(self.error())
    }
}
