//! Table schema generation
//!
//! Column definitions are sorted by their rendered text, so the same field set
//! always produces the same DDL regardless of configured order.

use super::{StoreError, StoreResult};
use crate::fields::FieldMapper;
use crate::Source;
use serde::{Deserialize, Serialize};

/// Index granularity for the ordered engine
pub const INDEX_GRANULARITY: u32 = 8192;

/// Engine used when the ordering key fields are not requested
pub const APPEND_ONLY_ENGINE: &str = "Log";

/// Which requested fields make a table eligible for the ordered engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnginePolicy {
    /// External identifier of the date field
    pub date_field: String,
    /// External identifier of the client identifier field
    pub client_id_field: String,
}

impl EnginePolicy {
    /// Built-in identifiers for a source
    pub fn default_for(source: Source) -> Self {
        let prefix = match source {
            Source::Hits => "ym:pv:",
            Source::Visits => "ym:s:",
        };
        Self {
            date_field: format!("{prefix}date"),
            client_id_field: format!("{prefix}clientID"),
        }
    }

    /// Engine clause for a table holding `fields`
    pub fn engine_for(&self, fields: &[String], mapper: &FieldMapper) -> String {
        let has = |name: &str| fields.iter().any(|f| f == name);
        if has(&self.date_field) && has(&self.client_id_field) {
            let date = mapper.column_name(&self.date_field);
            let client = mapper.column_name(&self.client_id_field);
            format!(
                "MergeTree({date}, intHash32({client}), ({date}, intHash32({client})), {INDEX_GRANULARITY})"
            )
        } else {
            APPEND_ONLY_ENGINE.to_string()
        }
    }

    /// Column holding the row date
    pub fn date_column(&self, mapper: &FieldMapper) -> String {
        mapper.column_name(&self.date_field)
    }
}

/// Rendered `CREATE TABLE` inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// `<db>.<table>`
    pub table: String,
    /// `<name> <type>` definitions, sorted
    pub columns: Vec<String>,
    /// Engine clause
    pub engine: String,
}

impl TableSchema {
    /// Build the schema for `fields`, failing on a field without a type
    pub fn build(
        table: impl Into<String>,
        fields: &[String],
        mapper: &FieldMapper,
        policy: &EnginePolicy,
    ) -> StoreResult<Self> {
        let mut columns = fields
            .iter()
            .map(|field| {
                let column_type = mapper
                    .column_type(field)
                    .ok_or_else(|| StoreError::UnknownFieldType(field.clone()))?;
                Ok(format!("{} {}", mapper.column_name(field), column_type))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        columns.sort();
        columns.dedup();

        Ok(Self {
            table: table.into(),
            columns,
            engine: policy.engine_for(fields, mapper),
        })
    }

    /// `CREATE TABLE` statement
    pub fn to_ddl(&self) -> String {
        format!(
            "CREATE TABLE {} (\n    {}\n) ENGINE = {}",
            self.table,
            self.columns.join(",\n    "),
            self.engine
        )
    }
}
