//! Purpose: Shared default endpoint resolution helpers.
//! Exports: default URLs/ports and `resolve_api_url`, `resolve_local_port`.
//! Role: Keep CLI and API-client endpoint defaults aligned from one source.
//! Invariants: Default API base is `http://localhost:8000/`; default run port is 7590.
//! Invariants: Explicit values win over environment variables, which win over defaults.

pub const API_URL_ENV: &str = "GRAPHERY_API_URL";
pub const LOCAL_PORT_ENV: &str = "GRAPHERY_LOCAL_PORT";
pub const DEFAULT_API_URL: &str = "http://localhost:8000/";
pub const DEFAULT_LOCAL_HOST: &str = "localhost";
pub const DEFAULT_LOCAL_PORT: u16 = 7590;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EndpointResolveError {
    InvalidPort(String),
}

/// Blank values count as unset at each level.
pub fn resolve_api_url(explicit: Option<&str>, env_value: Option<&str>) -> String {
    let non_blank = |value: &&str| !value.trim().is_empty();
    explicit
        .filter(non_blank)
        .or(env_value.filter(non_blank))
        .unwrap_or(DEFAULT_API_URL)
        .trim()
        .to_string()
}

pub fn resolve_local_port(
    explicit: Option<u16>,
    env_value: Option<&str>,
) -> Result<u16, EndpointResolveError> {
    if let Some(port) = explicit {
        return Ok(port);
    }
    match env_value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => raw
            .parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| EndpointResolveError::InvalidPort(raw.to_string())),
        None => Ok(DEFAULT_LOCAL_PORT),
    }
}
