//! Purpose: Shared HTTP/JSON plumbing for the GraphQL and local run clients.
//! Exports: URL normalization, JSON request/response helpers, status-to-kind mapping.
//! Role: Single place where `ureq` results become crate `Error`s.
//! Invariants: Transport failures map to `ErrorKind::Io`; statuses map via `error_kind_from_status`.
//! Invariants: Every error carries the request URL.
#![allow(clippy::result_large_err)]

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use super::ApiResult;
use crate::core::error::{Error, ErrorKind};

#[derive(Deserialize)]
struct ErrorsEnvelope {
    errors: Vec<ErrorsEntry>,
}

#[derive(Deserialize)]
struct ErrorsEntry {
    message: String,
}

/// The cookie store comes from ureq's `cookies` feature (see Cargo.toml); without
/// it the session and CSRF cookies are never sent back to the server.
pub(crate) fn new_agent() -> ureq::Agent {
    ureq::AgentBuilder::new().build()
}

pub(crate) fn normalize_base_url(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid api base url")
            .with_url(raw)
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("api base url must use http or https scheme")
            .with_url(raw));
    }
    if url.cannot_be_a_base() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("api base url cannot be a base")
            .with_url(raw));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Appends one path segment under the base URL's path.
pub(crate) fn endpoint_url(base_url: &Url, segment: &str) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message("api base url cannot be a base")
                .with_url(base_url.as_str())
        })?;
        path.pop_if_empty();
        path.push(segment);
    }
    Ok(url)
}

pub(crate) fn get_json<R>(request: ureq::Request, url: &Url) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let response = request.set("Accept", "application/json").call();
    handle_response(response, url)
}

pub(crate) fn post_json<T, R>(request: ureq::Request, url: &Url, body: &T) -> ApiResult<R>
where
    T: Serialize,
    R: DeserializeOwned,
{
    let payload = serde_json::to_string(body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode request json")
            .with_url(url.as_str())
            .with_source(err)
    })?;
    let response = request
        .set("Accept", "application/json")
        .set("Content-Type", "application/json")
        .send_string(&payload);
    handle_response(response, url)
}

fn handle_response<R>(response: Result<ureq::Response, ureq::Error>, url: &Url) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    match response {
        Ok(resp) => read_json_response(resp).map_err(|err| err.with_url(url.as_str())),
        Err(ureq::Error::Status(code, resp)) => {
            warn!(status = code, url = %url, "api request failed");
            Err(parse_error_response(code, resp).with_url(url.as_str()))
        }
        Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
            .with_message("request failed")
            .with_url(url.as_str())
            .with_source(err)),
    }
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    let kind = error_kind_from_status(status);
    let message = serde_json::from_str::<ErrorsEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.errors.into_iter().next())
        .map(|entry| entry.message)
        .unwrap_or_else(|| format!("remote error status {status}"));
    Error::new(kind).with_message(message).with_status(status)
}

pub(crate) fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 => ErrorKind::Usage,
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}
