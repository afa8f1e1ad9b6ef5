use std::collections::HashMap;
use std::path::PathBuf;

use memordo::config::{data_dir_from, ClientConfig, ServerConfig, MAX_TOKEN_TTL_SECS};
use memordo::types::errors::ConfigError;
use memordo::types::settings::OfflinePolicy;
use rstest::rstest;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[rstest]
#[case(&[("MEMORDO_DATA_DIR", "/srv/memo"), ("HOME", "/home/u")], "/srv/memo")]
#[case(&[("XDG_DATA_HOME", "/xdg"), ("HOME", "/home/u")], "/xdg/memordo")]
#[case(&[("HOME", "/home/u")], "/home/u/.local/share/memordo")]
#[case(&[], ".")]
fn data_dir_resolution_order(#[case] vars: &[(&str, &str)], #[case] expected: &str) {
    assert_eq!(data_dir_from(&env(vars)), PathBuf::from(expected));
}

#[test]
fn server_config_defaults_database_into_data_dir() {
    let mut config = ServerConfig::default();
    config.apply_overrides(&env(&[("MEMORDO_DATA_DIR", "/data")])).unwrap();
    assert_eq!(config.bind, "0.0.0.0:3000");
    assert_eq!(config.database_path, Some(PathBuf::from("/data/memordo.db")));
}

#[test]
fn server_config_env_overrides_bind_and_db() {
    let mut config = ServerConfig::default();
    config
        .apply_overrides(&env(&[("MEMORDO_BIND", "127.0.0.1:8080"), ("MEMORDO_DB", "/tmp/x.db")]))
        .unwrap();
    assert_eq!(config.bind, "127.0.0.1:8080");
    assert_eq!(config.database_path, Some(PathBuf::from("/tmp/x.db")));
}

#[rstest]
#[case(0, 60)]
#[case(60, -1)]
#[case(MAX_TOKEN_TTL_SECS + 1, 60)]
#[case(60, i64::MAX)]
fn server_config_rejects_out_of_range_ttl(#[case] access: i64, #[case] refresh: i64) {
    let config = ServerConfig {
        access_token_ttl_secs: access,
        refresh_token_ttl_secs: refresh,
        ..ServerConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
}

#[test]
fn server_config_accepts_longest_ttl() {
    let config = ServerConfig {
        refresh_token_ttl_secs: MAX_TOKEN_TTL_SECS,
        ..ServerConfig::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn server_config_loads_partial_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.json");
    std::fs::write(&path, r#"{"bind": "127.0.0.1:4000", "access_token_ttl_secs": 60}"#).unwrap();

    let config = ServerConfig::load(Some(&path)).unwrap();
    assert_eq!(config.bind, "127.0.0.1:4000");
    assert_eq!(config.token_policy().access_ttl_secs, 60);
    assert_eq!(
        config.refresh_token_ttl_secs,
        ServerConfig::default().refresh_token_ttl_secs
    );
}

#[test]
fn server_config_load_reports_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("server.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(
        ServerConfig::load(Some(&path)),
        Err(ConfigError::SerializationError(_))
    ));
}

#[test]
fn client_config_reads_policy_and_store_from_env() {
    let mut config = ClientConfig::default();
    config
        .apply_overrides(&env(&[
            ("MEMORDO_BACKEND_URL", "https://memo.example.com"),
            ("MEMORDO_OFFLINE_POLICY", "Queue"),
            ("MEMORDO_DATA_DIR", "/data"),
        ]))
        .unwrap();
    assert_eq!(config.backend_url, "https://memo.example.com");
    assert_eq!(config.offline_policy, OfflinePolicy::Queue);
    assert_eq!(config.store_path, Some(PathBuf::from("/data/extension_storage.json")));
}

#[test]
fn client_config_rejects_unknown_policy() {
    let mut config = ClientConfig::default();
    let result = config.apply_overrides(&env(&[("MEMORDO_OFFLINE_POLICY", "hoard")]));
    assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
}

#[rstest]
#[case("ftp://memo.example.com")]
#[case("not a url")]
fn client_config_rejects_non_http_backend(#[case] url: &str) {
    let config = ClientConfig {
        backend_url: url.to_string(),
        ..ClientConfig::default()
    };
    assert!(config.validate().is_err());
}
