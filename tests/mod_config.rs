use nexusodm::config::{DEFAULT_MAX_IN_SET, OdmConfig, load_config};
use nexusodm::query::parse_query_json_with;
use std::io::Write;

#[test]
fn explicit_file_wins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odm.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "[limits]\nmax_path_depth = 4\n\n[logging]\nlevel = \"debug\"\ndev6 = true").unwrap();
    let cfg = load_config(Some(path.as_path())).unwrap();
    assert_eq!(cfg.limits.max_path_depth, 4);
    assert_eq!(cfg.limits.max_in_set, DEFAULT_MAX_IN_SET);
    assert_eq!(cfg.logging.level.as_deref(), Some("debug"));
    assert!(cfg.logging.dev6);
}

#[test]
fn broken_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odm.toml");
    std::fs::write(&path, "[limits\n").unwrap();
    assert!(load_config(Some(path.as_path())).is_err());
}

#[test]
fn limits_feed_query_parsing() {
    let cfg = OdmConfig::from_toml_str("[limits]\nmax_in_set = 1\n").unwrap();
    assert!(parse_query_json_with(r#"{"a":{"$in":[1,2]}}"#, &cfg.limits).is_err());
    let e = parse_query_json_with(r#"{"a":{"$in":[1]}}"#, &cfg.limits).unwrap();
    assert_eq!(e.compile(), bson::doc! {"a": {"$in": [1]}});
}

#[test]
fn limits_feed_path_assignment() {
    let cfg = OdmConfig::from_toml_str("[limits]\nmax_path_depth = 2\n").unwrap();
    let reg = nexusodm::SchemaRegistry::new().with(
        nexusodm::Schema::new("User").field("prefs", nexusodm::FieldKind::Dict),
    );
    let mut d = bson::Document::new();
    nexusodm::apply_path_with(&reg, "User", &mut d, "prefs.theme", "dark", &cfg.limits).unwrap();
    let e = nexusodm::apply_path_with(&reg, "User", &mut d, "prefs.a.b", 1, &cfg.limits);
    assert!(matches!(e, Err(nexusodm::OdmError::MalformedPath { .. })));
}
