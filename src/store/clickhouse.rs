//! ClickHouse store over the HTTP interface

use super::schema::TableSchema;
use super::{Store, StoreError, StoreResult};
use crate::config::{AppConfig, ClickHouseConfig};
use crate::fields::FieldMapper;
use crate::store::schema::EnginePolicy;
use crate::{Source, DATE_FORMAT};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use tracing::debug;

/// ClickHouse adapter
#[derive(Debug, Clone)]
pub struct ClickHouseStore {
    client: Client,
    config: ClickHouseConfig,
    mapper: FieldMapper,
    hits_policy: EnginePolicy,
    visits_policy: EnginePolicy,
}

impl ClickHouseStore {
    /// Build a store from the application config
    pub fn from_config(config: &AppConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls())
            .build()
            .map_err(|e| StoreError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clickhouse.clone(),
            mapper: config.field_mapper(),
            hits_policy: config.engine_policy(Source::Hits),
            visits_policy: config.engine_policy(Source::Visits),
        })
    }

    /// Fully qualified table name for a source
    pub fn table_name(&self, source: Source) -> String {
        format!("{}.{}", self.config.database, self.config.table_for(source))
    }

    fn policy(&self, source: Source) -> &EnginePolicy {
        match source {
            Source::Hits => &self.hits_policy,
            Source::Visits => &self.visits_policy,
        }
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.config.user.is_empty() && self.config.password.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.config.user, Some(&self.config.password))
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> StoreResult<String> {
        let response = self
            .with_auth(builder)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if status.as_u16() != 200 {
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Run a query and return the raw response text
    pub async fn query(&self, sql: &str) -> StoreResult<String> {
        debug!("{}", sql);
        self.execute(self.client.post(&self.config.host).body(sql.to_string()))
            .await
    }

    async fn list(&self, sql: &str) -> StoreResult<Vec<String>> {
        Ok(parse_lines(&self.query(sql).await?))
    }
}

fn parse_lines(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_count(body: &str) -> StoreResult<u64> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse()
        .map_err(|_| StoreError::InvalidResponse(format!("expected a row count, got {trimmed:?}")))
}

#[async_trait]
impl Store for ClickHouseStore {
    async fn database_exists(&self) -> StoreResult<bool> {
        let databases = self.list("SHOW DATABASES").await?;
        Ok(databases.iter().any(|db| db == &self.config.database))
    }

    async fn create_database(&self) -> StoreResult<()> {
        self.query(&format!("CREATE DATABASE {}", self.config.database))
            .await
            .map(|_| ())
    }

    async fn table_exists(&self, source: Source) -> StoreResult<bool> {
        let tables = self
            .list(&format!("SHOW TABLES FROM {}", self.config.database))
            .await?;
        let table = self.config.table_for(source);
        Ok(tables.iter().any(|t| t == table))
    }

    async fn create_table(&self, source: Source, fields: &[String]) -> StoreResult<()> {
        let schema = TableSchema::build(
            self.table_name(source),
            fields,
            &self.mapper,
            self.policy(source),
        )?;
        self.query(&schema.to_ddl()).await.map(|_| ())
    }

    async fn load(&self, source: Source, payload: &str) -> StoreResult<()> {
        let insert = format!(
            "INSERT INTO {} FORMAT TabSeparatedWithNames",
            self.table_name(source)
        );
        debug!("{} ({} bytes)", insert, payload.len());
        let builder = self
            .client
            .post(&self.config.host)
            .query(&[("query", insert)])
            .body(payload.to_string());
        self.execute(builder).await.map(|_| ())
    }

    async fn row_count_in_range(
        &self,
        source: Source,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<u64> {
        let sql = format!(
            "SELECT count() FROM {} WHERE {} >= '{}' AND {} <= '{}'",
            self.table_name(source),
            self.policy(source).date_column(&self.mapper),
            start.format(DATE_FORMAT),
            self.policy(source).date_column(&self.mapper),
            end.format(DATE_FORMAT),
        );
        parse_count(&self.query(&sql).await?)
    }
}
