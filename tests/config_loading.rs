use std::io::Write;

use skein_core::config::AppConfig;
use skein_core::error::SkeinError;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[engine]
max_workers = 6
max_node_visits = 100

[log]
filter = "skein=debug"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.engine.max_workers, 6);
    assert_eq!(config.engine.max_node_visits, Some(100));
    assert_eq!(config.log.filter.as_deref(), Some("skein=debug"));
}

#[test]
fn test_load_expands_env_vars() {
    std::env::set_var("SKEIN_TEST_LOG_FILTER", "skein_engine=trace");
    let toml_content = "[log]\nfilter = \"${SKEIN_TEST_LOG_FILTER}\"\n";

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.log.filter.as_deref(), Some("skein_engine=trace"));
    std::env::remove_var("SKEIN_TEST_LOG_FILTER");
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = AppConfig::parse("[engine]\nmax_node_visits = 5\n").expect("parse");
    assert_eq!(config.engine.max_node_visits, Some(5));
    assert!(config.engine.max_workers >= 1);
    assert!(config.log.filter.is_none());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = AppConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, SkeinError::ConfigNotFound(_)));
}

#[test]
fn test_malformed_toml() {
    let err = AppConfig::parse("[engine\nmax_workers = 2").unwrap_err();
    assert!(matches!(err, SkeinError::Config(_)));

    let err = AppConfig::parse("[engine]\nmax_workers = \"many\"\n").unwrap_err();
    assert!(matches!(err, SkeinError::Config(_)));
}
