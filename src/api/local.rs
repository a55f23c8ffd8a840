//! Purpose: Call the local code-execution server (`POST /run`).
//! Exports: `LocalServerClient`.
//! Role: Thin JSON client for the developer-side runner; no auth, no CSRF.
//! Invariants: The response body is returned as parsed JSON, untouched.
#![allow(clippy::result_large_err)]

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::http::{new_agent, post_json};
use super::{ApiConfig, ApiResult};
use crate::core::error::{Error, ErrorKind};
use crate::endpoints::{DEFAULT_LOCAL_HOST, DEFAULT_LOCAL_PORT};

#[derive(Clone)]
pub struct LocalServerClient {
    host: String,
    default_port: u16,
    agent: ureq::Agent,
}

#[derive(Serialize)]
struct RunRequest<'a> {
    code: &'a str,
    graph: &'a Value,
}

impl LocalServerClient {
    pub fn new() -> Self {
        Self {
            host: DEFAULT_LOCAL_HOST.to_string(),
            default_port: DEFAULT_LOCAL_PORT,
            agent: new_agent(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new()
            .with_host(config.local_host.clone())
            .with_default_port(config.local_port)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    pub fn run_url(&self, port: Option<u16>) -> ApiResult<Url> {
        let port = port.unwrap_or(self.default_port);
        let raw = format!("http://{}:{port}/run", self.host);
        Url::parse(&raw).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid local server address")
                .with_url(raw)
                .with_source(err)
        })
    }

    /// Posts `{code, graph}` to the runner. `graph` may be a JSON string or an object.
    pub fn local_server_caller(
        &self,
        code: &str,
        graph: &Value,
        port: Option<u16>,
    ) -> ApiResult<Value> {
        let url = self.run_url(port)?;
        debug!(url = %url, code_bytes = code.len(), "posting code to local server");
        post_json(
            self.agent.post(url.as_str()),
            &url,
            &RunRequest { code, graph },
        )
    }
}

impl Default for LocalServerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{LocalServerClient, RunRequest};
    use crate::api::ApiConfig;
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn run_url_defaults_to_localhost_7590() {
        let client = LocalServerClient::new();
        assert_eq!(
            client.run_url(None).expect("url").as_str(),
            "http://localhost:7590/run"
        );
        assert_eq!(
            client.run_url(Some(8080)).expect("url").as_str(),
            "http://localhost:8080/run"
        );
    }

    #[test]
    fn from_config_applies_host_and_port() {
        let config = ApiConfig::default()
            .with_local_host("127.0.0.1")
            .with_local_port(9101);
        let client = LocalServerClient::from_config(&config);
        assert_eq!(
            client.run_url(None).expect("url").as_str(),
            "http://127.0.0.1:9101/run"
        );
    }

    #[test]
    fn bad_host_is_usage_error() {
        let client = LocalServerClient::new().with_host("bad host");
        let err = client.run_url(None).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn request_carries_code_and_graph() {
        let graph = json!("{\"nodes\": []}");
        let body = serde_json::to_value(RunRequest {
            code: "print(1)",
            graph: &graph,
        })
        .expect("json");
        assert_eq!(body, json!({"code": "print(1)", "graph": "{\"nodes\": []}"}));
    }
}
