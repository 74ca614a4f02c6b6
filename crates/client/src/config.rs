//! Client configuration via `gcdkit.toml`
//!
//! A config names the project, an optional default namespace and, for
//! tests or private deployments, an explicit API endpoint. When no endpoint
//! is configured and `DATASTORE_EMULATOR_HOST` is set, requests go to the
//! emulator instead of the public endpoint.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ClientError, ClientResult};

/// Public REST endpoint
pub const DEFAULT_API_ENDPOINT: &str = "https://datastore.googleapis.com";

/// Environment variable naming a local emulator as `host:port`
pub const EMULATOR_HOST_ENV: &str = "DATASTORE_EMULATOR_HOST";

/// Default cap on pages fetched by one query
pub const DEFAULT_MAX_QUERY_PAGES: usize = 10_000;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "gcdkit.toml";

/// REST methods the client calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `projects.runQuery`
    RunQuery,
    /// `projects.lookup`
    Lookup,
    /// `projects.commit`
    Commit,
}

impl Method {
    /// Method name as it appears in the URL
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::RunQuery => "runQuery",
            Method::Lookup => "lookup",
            Method::Commit => "commit",
        }
    }
}

/// Client configuration loaded from `gcdkit.toml`.
///
/// # Example
///
/// ```toml
/// project_id = "my-project"
/// namespace_id = "tenant-a"
/// # api_endpoint = "http://localhost:8081"
/// # max_query_pages = 10000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Project the client reads and writes
    pub project_id: String,
    /// Namespace applied to queries that do not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<String>,
    /// Explicit endpoint; overrides the emulator variable and the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    /// Pages a single query may fetch before failing
    #[serde(default = "default_max_query_pages")]
    pub max_query_pages: usize,
}

fn default_max_query_pages() -> usize {
    DEFAULT_MAX_QUERY_PAGES
}

impl ClientConfig {
    /// Config for a project with every other setting at its default
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            namespace_id: None,
            api_endpoint: None,
            max_query_pages: DEFAULT_MAX_QUERY_PAGES,
        }
    }

    /// Set the default namespace
    pub fn with_namespace(mut self, namespace_id: impl Into<String>) -> Self {
        self.namespace_id = Some(namespace_id.into());
        self
    }

    /// Set an explicit endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> ClientResult<Self> {
        let config: ClientConfig =
            toml::from_str(s).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file
    pub fn load(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Check the settings a client cannot run without
    pub fn validate(&self) -> ClientResult<()> {
        if self.project_id.is_empty() {
            return Err(ClientError::Config("project_id cannot be empty".into()));
        }
        if self.max_query_pages == 0 {
            return Err(ClientError::Config(
                "max_query_pages must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Endpoint requests are sent to
    pub fn resolve_endpoint(&self) -> String {
        self.endpoint_with_emulator(std::env::var(EMULATOR_HOST_ENV).ok())
    }

    fn endpoint_with_emulator(&self, emulator_host: Option<String>) -> String {
        if let Some(endpoint) = &self.api_endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }
        match emulator_host {
            Some(host) if !host.is_empty() => format!("http://{}", host),
            _ => DEFAULT_API_ENDPOINT.to_string(),
        }
    }

    /// Full URL of a REST method for this project
    pub fn method_url(&self, method: Method) -> String {
        format!(
            "{}/v1/projects/{}:{}",
            self.resolve_endpoint(),
            self.project_id,
            method.as_str()
        )
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# gcdkit client configuration
#
# Project the client reads and writes (required).
project_id = "my-project"

# Namespace applied to queries that do not name one (optional).
# namespace_id = "tenant-a"

# Explicit API endpoint (optional). When unset, DATASTORE_EMULATOR_HOST
# is honoured, then https://datastore.googleapis.com is used.
# api_endpoint = "http://localhost:8081"

# Pages a single query may fetch before failing (default 10000).
# max_query_pages = 10000
"#
    }
}
