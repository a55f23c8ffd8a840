//! Purpose: Call the Graphery GraphQL endpoint with CSRF-token bootstrapping.
//! Exports: `ApiClient`, `GraphQlError`, `GraphQlLocation`, `GraphQlReply`.
//! Role: Gateway between callers and `GET /csrf` + `POST /graphql`.
//! Invariants: At most one token fetch per session once a token is cached.
//! Invariants: The token slot is not held across the fetch; concurrent first calls may both fetch.
//! Invariants: Single attempt per call: no retry, backoff, or timeout.
#![allow(clippy::result_large_err)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::http::{endpoint_url, get_json, new_agent, normalize_base_url, post_json};
use super::{ApiConfig, ApiResult, Session};
use crate::core::error::ErrorKind;

const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    base_url: Url,
    csrf_url: Url,
    graphql_url: Url,
    agent: ureq::Agent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphQlLocation {
    pub line: u64,
    pub column: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphQlLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// `(data, errors)` as found in the response body.
pub type GraphQlReply = (Option<Value>, Option<Vec<GraphQlError>>);

#[derive(Deserialize)]
struct CsrfEnvelope {
    #[serde(rename = "csrfToken")]
    csrf_token: String,
}

#[derive(Deserialize)]
struct GraphQlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Option<&'a Value>,
}

impl ApiClient {
    pub fn new(base_url: impl AsRef<str>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.as_ref())?;
        let csrf_url = endpoint_url(&base_url, "csrf")?;
        let graphql_url = endpoint_url(&base_url, "graphql")?;
        Ok(Self {
            inner: Arc::new(ApiClientInner {
                base_url,
                csrf_url,
                graphql_url,
                agent: new_agent(),
            }),
        })
    }

    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Fetches a fresh token without touching any session.
    pub fn fetch_csrf_token(&self) -> ApiResult<String> {
        let url = &self.inner.csrf_url;
        let envelope: CsrfEnvelope = get_json(self.inner.agent.get(url.as_str()), url)?;
        debug!(url = %url, "fetched csrf token");
        Ok(envelope.csrf_token)
    }

    pub fn ensure_csrf_token(&self, session: &Session) -> ApiResult<String> {
        if let Some(token) = session.csrf_token() {
            return Ok(token);
        }
        let token = self.fetch_csrf_token()?;
        session.set_csrf_token(token.clone());
        Ok(token)
    }

    /// Runs one GraphQL operation, bootstrapping the session's CSRF token first
    /// if none is cached.
    pub fn api_caller(
        &self,
        session: &Session,
        query: &str,
        variables: Option<&Value>,
    ) -> ApiResult<GraphQlReply> {
        let token = self.ensure_csrf_token(session)?;
        let url = &self.inner.graphql_url;
        let request = self
            .inner
            .agent
            .post(url.as_str())
            .set(CSRF_HEADER, &token);
        let envelope: GraphQlEnvelope = post_json(request, url, &GraphQlRequest { query, variables })
            .map_err(|err| {
                if err.kind() == ErrorKind::Permission {
                    err.with_hint("The CSRF token or session cookie was rejected; start a new session.")
                } else {
                    err
                }
            })?;
        if let Some(errors) = &envelope.errors {
            debug!(count = errors.len(), "graphql response carried errors");
        }
        Ok((envelope.data, envelope.errors))
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiClient, GraphQlEnvelope, GraphQlRequest};
    use crate::api::{ApiConfig, Session};
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn client_builds_endpoints_under_base() {
        let client = ApiClient::new("https://graphery.test/api").expect("client");
        assert_eq!(client.base_url().as_str(), "https://graphery.test/api/");
        assert_eq!(
            client.inner.graphql_url.as_str(),
            "https://graphery.test/api/graphql"
        );
        assert_eq!(client.inner.csrf_url.as_str(), "https://graphery.test/api/csrf");
    }

    #[test]
    fn from_config_uses_base_url() {
        let config = ApiConfig::default().with_base_url("http://127.0.0.1:9999");
        let client = ApiClient::from_config(&config).expect("client");
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9999/");
    }

    #[test]
    fn request_serializes_null_variables() {
        let body = serde_json::to_value(GraphQlRequest {
            query: "{ users { id } }",
            variables: None,
        })
        .expect("json");
        assert_eq!(body, json!({"query": "{ users { id } }", "variables": null}));
    }

    #[test]
    fn envelope_tolerates_missing_fields() {
        let envelope: GraphQlEnvelope = serde_json::from_value(json!({})).expect("envelope");
        assert!(envelope.data.is_none());
        assert!(envelope.errors.is_none());

        let envelope: GraphQlEnvelope = serde_json::from_value(json!({
            "data": null,
            "errors": [{"message": "boom", "locations": [{"line": 1, "column": 3}], "path": ["user"]}]
        }))
        .expect("envelope");
        let errors = envelope.errors.expect("errors");
        assert_eq!(errors[0].message, "boom");
        assert_eq!(errors[0].locations[0].column, 3);
    }

    #[test]
    fn cached_token_skips_network() {
        // Port 9 (discard) on loopback is never contacted when a token is cached.
        let client = ApiClient::new("http://127.0.0.1:9").expect("client");
        let session = Session::new().with_csrf_token("cached");
        assert_eq!(client.ensure_csrf_token(&session).expect("token"), "cached");
    }

    #[test]
    fn unreachable_backend_is_io_error() {
        let client = ApiClient::new("http://127.0.0.1:9").expect("client");
        let session = Session::new();
        let err = client
            .api_caller(&session, "{ ping }", None)
            .expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(session.csrf_token(), None);
    }
}
