use coursebook::config::{self, AppConfig, DEFAULT_PAGE_SIZE, DEFAULT_URI};
use std::path::{Path, PathBuf};

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

#[test]
fn toml_layer_parses_known_keys() {
    let cfg = AppConfig::from_toml(
        r#"
uri = "mongodb://localhost/shop"
page_size = 25
tag_validator_delay_ms = 4000
"#,
    )
    .unwrap();
    assert_eq!(cfg.uri.as_deref(), Some("mongodb://localhost/shop"));
    assert_eq!(cfg.page_size, Some(25));
    assert_eq!(cfg.tag_validator_delay_ms, Some(4000));
    assert!(AppConfig::from_toml("colour = \"blue\"").is_err());
}

#[test]
fn env_layer_reads_prefixed_variables_only() {
    let cfg = AppConfig::from_vars(vars(&[
        ("COURSEBOOK_URI", "mongodb://h/db"),
        ("COURSEBOOK_PAGE_SIZE", "abc"),
        ("COURSEBOOK_LOG_LEVEL", "debug"),
        ("URI", "ignored"),
    ]));
    assert_eq!(cfg.uri.as_deref(), Some("mongodb://h/db"));
    assert_eq!(cfg.page_size, None);
    assert_eq!(cfg.log_level.as_deref(), Some("debug"));
}

#[test]
fn earlier_layers_win() {
    let mut cli = AppConfig { log_level: Some("trace".into()), ..AppConfig::default() };
    cli.fill_from(AppConfig::from_vars(vars(&[
        ("COURSEBOOK_LOG_LEVEL", "warn"),
        ("COURSEBOOK_PAGE_SIZE", "5"),
    ])));
    cli.fill_from(AppConfig { page_size: Some(50), uri: Some("mongodb://f/x".into()), ..AppConfig::default() });
    assert_eq!(cli.log_level.as_deref(), Some("trace"));
    assert_eq!(cli.page_size, Some(5));
    assert_eq!(cli.uri.as_deref(), Some("mongodb://f/x"));
}

#[test]
fn resolve_applies_defaults() {
    let s = AppConfig { data_dir: Some(PathBuf::from("/srv/cb")), page_size: Some(0), ..AppConfig::default() }
        .resolve();
    assert_eq!(s.uri, DEFAULT_URI);
    assert_eq!(s.log_dir, Path::new("/srv/cb/logs"));
    assert_eq!(s.page_size, DEFAULT_PAGE_SIZE);
    assert_eq!(s.tag_validator_delay_ms, 0);
}

#[test]
fn file_layer_and_missing_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coursebook.toml");
    assert_eq!(AppConfig::from_file(&path).unwrap(), AppConfig::default());
    std::fs::write(&path, "log_level = \"error\"\n").unwrap();
    assert_eq!(AppConfig::from_file(&path).unwrap().log_level.as_deref(), Some("error"));

    let cli = AppConfig { log_level: Some("debug".into()), ..AppConfig::default() };
    let s = config::load(cli, Some(&path)).unwrap();
    assert_eq!(s.log_level, "debug");
    assert!(config::load(AppConfig::default(), Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn explicit_path_is_searched_first() {
    let explicit = Path::new("/tmp/a.toml");
    let paths = config::config_paths(Some(explicit), Some(PathBuf::from("/tmp/b.toml")));
    assert_eq!(paths[0], explicit);
    assert_eq!(paths[1], Path::new("/tmp/b.toml"));
}
