//! Unit tests for table schema generation from a loaded config

use logs_api_loader::config::AppConfig;
use logs_api_loader::store::{StoreError, TableSchema};
use logs_api_loader::Source;
use std::io::Write;

const CONFIG: &str = r#"{
    "token": "secret",
    "counter_id": 100500,
    "visits_fields": ["ym:s:date", "ym:s:clientID", "ym:s:visitID"],
    "hits_fields": ["ym:pv:URL", "ym:pv:date"],
    "clickhouse": {"host": "http://localhost:8123", "database": "metrica"},
    "field_types": {
        "ym:s:date": "Date",
        "ym:s:clientID": "UInt64",
        "ym:s:visitID": "UInt64",
        "ym:pv:URL": "String",
        "ym:pv:date": "Date"
    },
    "engine": {
        "hits": {"date_field": "ym:pv:date", "client_id_field": "ym:pv:URL"}
    }
}"#;

fn load_config() -> AppConfig {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    AppConfig::load(file.path()).unwrap()
}

fn schema(config: &AppConfig, source: Source) -> Result<TableSchema, StoreError> {
    TableSchema::build(
        format!("{}.{}", config.clickhouse.database, config.clickhouse.table_for(source)),
        config.fields_for(source),
        &config.field_mapper(),
        &config.engine_policy(source),
    )
}

#[test]
fn test_visits_table_uses_ordered_engine() {
    let config = load_config();
    let schema = schema(&config, Source::Visits).unwrap();

    assert_eq!(
        schema.to_ddl(),
        "CREATE TABLE metrica.visits_all (\n    \
         ClientID UInt64,\n    \
         Date Date,\n    \
         VisitID UInt64\n\
         ) ENGINE = MergeTree(Date, intHash32(ClientID), (Date, intHash32(ClientID)), 8192)"
    );
}

#[test]
fn test_configured_engine_policy() {
    let config = load_config();
    let schema = schema(&config, Source::Hits).unwrap();

    assert_eq!(schema.table, "metrica.hits_all");
    assert_eq!(
        schema.engine,
        "MergeTree(Date, intHash32(URL), (Date, intHash32(URL)), 8192)"
    );
}

#[test]
fn test_field_without_type_is_rejected() {
    let mut config = load_config();
    config.visits_fields.push("ym:s:bounce".to_string());

    assert!(config.validate_source(Source::Visits).is_err());
    let err = schema(&config, Source::Visits).unwrap_err();
    assert!(matches!(err, StoreError::UnknownFieldType(f) if f == "ym:s:bounce"));
}
