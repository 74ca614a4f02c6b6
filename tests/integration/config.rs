//! Loading `gcdkit.toml`.

use std::fs;

use gcdkit::{ClientConfig, ClientError, Connector, Method};
use tempfile::TempDir;

use crate::common::FakeDatastore;

#[test]
fn test_load_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gcdkit.toml");
    fs::write(
        &path,
        r#"
project_id = "from-file"
namespace_id = "tenant"
api_endpoint = "http://127.0.0.1:9000"
"#,
    )
    .unwrap();

    let config = ClientConfig::load(&path).unwrap();
    let c = Connector::new(config, FakeDatastore::new(10, 10)).unwrap();
    assert_eq!(
        c.url(Method::RunQuery),
        "http://127.0.0.1:9000/v1/projects/from-file:runQuery"
    );
    assert_eq!(c.config().namespace_id.as_deref(), Some("tenant"));
}

#[test]
fn test_default_config_file_loads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gcdkit.toml");
    fs::write(&path, ClientConfig::default_toml()).unwrap();
    let config = ClientConfig::load(&path).unwrap();
    assert_eq!(config.project_id, "my-project");
}

#[test]
fn test_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gcdkit.toml");
    fs::write(&path, "project_id = 5").unwrap();
    assert!(matches!(
        ClientConfig::load(&path),
        Err(ClientError::Config(_))
    ));
}
