use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use tempfile::TempDir;

use trackhub_registry::config::{Config, ConfigLoader, HttpSettings};
use trackhub_registry::error::HubError;

#[test]
fn defaults_fill_missing_sections() {
    let config = Config {
        database_path: Some(Utf8PathBuf::from("/tmp/registry.sqlite3")),
        ..Config::default()
    };

    let resolved = ConfigLoader::resolve_config(config).unwrap();

    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.database_path, "/tmp/registry.sqlite3");
    assert_eq!(resolved.search_index, "trackhubs");
    assert!(resolved.search_url.starts_with("http://localhost:9200"));
    assert_eq!(resolved.http, HttpSettings::default());
}

#[test]
fn file_values_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trackhub-registry.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "database_path": "/var/lib/registry.sqlite3",
            "search": { "index": "hubs_v2" },
            "http": { "timeout_secs": 5, "max_retries": 0 }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();

    assert_eq!(resolved.database_path, "/var/lib/registry.sqlite3");
    assert_eq!(resolved.search_index, "hubs_v2");
    assert_eq!(
        resolved.http,
        HttpSettings {
            timeout_secs: 5,
            max_retries: 0,
        }
    );
}

#[test]
fn trailing_slash_is_trimmed_from_search_url() {
    let mut config = Config {
        database_path: Some(Utf8PathBuf::from("registry.sqlite3")),
        ..Config::default()
    };
    config.search.url = Some("http://search.internal:9200/".to_string());

    let resolved = ConfigLoader::resolve_config(config).unwrap();

    assert_eq!(resolved.search_url, "http://search.internal:9200");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();

    assert_matches!(err, HubError::ConfigRead(_));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();

    assert_matches!(err, HubError::ConfigParse(_));
}
