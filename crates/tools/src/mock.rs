//! In-memory backend for tool tests.

use async_trait::async_trait;
use dvagent_core::backend::*;
use dvagent_core::BackendError;
use serde_json::{Map, Value};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockBackend {
    pub tables: Vec<TableInfo>,
    pub attributes: Vec<AttributeInfo>,
    pub records: Vec<Map<String, Value>>,
    /// Every call, e.g. `read_query(accounts)`.
    pub calls: Mutex<Vec<String>>,
    pub last_query: Mutex<Option<RecordQuery>>,
    pub last_filter: Mutex<Option<String>>,
    pub written: Mutex<Vec<Map<String, Value>>>,
}

impl MockBackend {
    pub fn with_tables(names: &[(&str, bool)]) -> Self {
        Self {
            tables: names
                .iter()
                .map(|(name, custom)| TableInfo {
                    logical_name: name.to_string(),
                    display_name: Some(name.to_uppercase()),
                    entity_set_name: Some(format!("{name}s")),
                    is_custom: *custom,
                })
                .collect(),
            ..Self::default()
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn known(&self, logical_name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.logical_name == logical_name)
    }
}

#[async_trait]
impl DataBackend for MockBackend {
    async fn list_tables(&self, filter: Option<&str>, top: u32) -> Result<Vec<TableInfo>, BackendError> {
        self.record(format!("list_tables({top})"));
        *self.last_filter.lock().unwrap() = filter.map(String::from);
        let custom_only = filter == Some("IsCustomEntity eq true");
        Ok(self
            .tables
            .iter()
            .filter(|t| !custom_only || t.is_custom)
            .take(if top == 0 { usize::MAX } else { top as usize })
            .cloned()
            .collect())
    }

    async fn describe_table(&self, logical_name: &str) -> Result<TableSchema, BackendError> {
        self.record(format!("describe_table({logical_name})"));
        self.known(logical_name)
            .map(|t| TableSchema {
                logical_name: t.logical_name.clone(),
                attributes: self.attributes.clone(),
            })
            .ok_or_else(|| BackendError::NotFound(format!("Table '{logical_name}' not found")))
    }

    async fn entity_set_name(&self, logical_name: &str) -> Result<String, BackendError> {
        self.record(format!("entity_set_name({logical_name})"));
        self.known(logical_name)
            .and_then(|t| t.entity_set_name.clone())
            .ok_or_else(|| BackendError::NotFound(format!("Table '{logical_name}' not found")))
    }

    async fn read_query(&self, query: &RecordQuery) -> Result<Vec<Map<String, Value>>, BackendError> {
        self.record(format!("read_query({})", query.entity_set));
        *self.last_query.lock().unwrap() = Some(query.clone());
        Ok(self.records.iter().take(query.top as usize).cloned().collect())
    }

    async fn create_record(&self, entity_set: &str, fields: &Map<String, Value>) -> Result<String, BackendError> {
        self.record(format!("create_record({entity_set})"));
        self.written.lock().unwrap().push(fields.clone());
        Ok("00000000-0000-0000-0000-000000000042".into())
    }

    async fn update_record(
        &self,
        entity_set: &str,
        record_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        self.record(format!("update_record({entity_set},{record_id})"));
        self.written.lock().unwrap().push(fields.clone());
        Ok(())
    }
}
