//! Unit tests for field to column mapping

use logs_api_loader::fields::FieldMapper;

#[test]
fn test_visits_and_hits_prefixes() {
    let mapper = FieldMapper::default();
    assert_eq!(mapper.column_name("ym:s:visitID"), "VisitID");
    assert_eq!(mapper.column_name("ym:pv:watchID"), "WatchID");
    assert_eq!(mapper.column_name("ym:s:date"), "Date");
}

#[test]
fn test_unprefixed_field_is_capitalized() {
    let mapper = FieldMapper::default();
    assert_eq!(mapper.column_name("clientID"), "ClientID");
    assert_eq!(mapper.column_name(""), "");
}

#[test]
fn test_header_mapping() {
    let mapper = FieldMapper::default();
    assert_eq!(
        mapper.map_header("ym:pv:date\tym:pv:URL\tym:pv:clientID"),
        "Date\tURL\tClientID"
    );
}

#[test]
fn test_custom_prefixes() {
    let mapper = FieldMapper::default().with_prefixes(["ga:"]);
    assert_eq!(mapper.column_name("ga:sessionId"), "SessionId");
    assert_eq!(mapper.column_name("ym:s:date"), "Ym:s:date");
}

#[test]
fn test_mapping_is_idempotent() {
    let mapper = FieldMapper::default();
    for field in ["ym:s:date", "ym:pv:URL", "ym:s:ym:pv:x", "visitID"] {
        let once = mapper.column_name(field);
        assert_eq!(mapper.column_name(&once), once, "{field}");
    }
}
