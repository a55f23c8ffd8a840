//! Purpose: Client configuration for the API gateway.
//! Exports: `ApiConfig`.
//! Role: Collect base URL and local run-server location from defaults, env, and flags.
//! Invariants: Defaults come from `crate::endpoints` so CLI and library agree.

use super::ApiResult;
use crate::core::error::{Error, ErrorKind};
use crate::endpoints::{
    API_URL_ENV, DEFAULT_API_URL, DEFAULT_LOCAL_HOST, DEFAULT_LOCAL_PORT, EndpointResolveError,
    LOCAL_PORT_ENV, resolve_api_url, resolve_local_port,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub local_host: String,
    pub local_port: u16,
}

impl ApiConfig {
    pub fn from_env() -> ApiResult<Self> {
        Self::from_env_with_url(None)
    }

    /// Like `from_env`, with an explicit base URL taking precedence over
    /// `GRAPHERY_API_URL` unless it is blank.
    pub fn from_env_with_url(api_url: Option<&str>) -> ApiResult<Self> {
        let env_url = std::env::var(API_URL_ENV).ok();
        let local_port = std::env::var(LOCAL_PORT_ENV).ok();
        let local_port =
            resolve_local_port(None, local_port.as_deref()).map_err(map_endpoint_error)?;
        Ok(Self {
            base_url: resolve_api_url(api_url, env_url.as_deref()),
            local_host: DEFAULT_LOCAL_HOST.to_string(),
            local_port,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_local_host(mut self, host: impl Into<String>) -> Self {
        self.local_host = host.into();
        self
    }

    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            local_host: DEFAULT_LOCAL_HOST.to_string(),
            local_port: DEFAULT_LOCAL_PORT,
        }
    }
}

pub(crate) fn map_endpoint_error(err: EndpointResolveError) -> Error {
    match err {
        EndpointResolveError::InvalidPort(raw) => Error::new(ErrorKind::Usage)
            .with_message(format!("invalid local server port: {raw}"))
            .with_hint(format!("Set {LOCAL_PORT_ENV} to a port between 1 and 65535.")),
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiConfig, map_endpoint_error};
    use crate::core::error::ErrorKind;
    use crate::endpoints::EndpointResolveError;

    #[test]
    fn default_config_targets_local_dev_server() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/");
        assert_eq!(config.local_host, "localhost");
        assert_eq!(config.local_port, 7590);
    }

    #[test]
    fn builders_override_fields() {
        let config = ApiConfig::default()
            .with_base_url("https://graphery.test/api/")
            .with_local_host("127.0.0.1")
            .with_local_port(9100);
        assert_eq!(config.base_url, "https://graphery.test/api/");
        assert_eq!(config.local_host, "127.0.0.1");
        assert_eq!(config.local_port, 9100);
    }

    #[test]
    fn invalid_port_is_usage_error() {
        let err = map_endpoint_error(EndpointResolveError::InvalidPort("x".to_string()));
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.hint().is_some());
    }
}
