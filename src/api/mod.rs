//! Purpose: Define the public Rust API boundary for Graphery clients.
//! Exports: Session, gateway clients, config, and the core record/store types.
//! Role: Public, additive-only surface used by the CLI and integration tests.
//! Invariants: All network calls go through `ApiClient` or `LocalServerClient`.
//! Invariants: Session state is passed explicitly to every call that needs it.

mod config;
mod graphql;
mod http;
mod local;
mod session;

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::record::{
    EMPTY_JSON, IdRef, Keyed, Keys, PlaceholderReason, QueryDataEntry, ResultJsonObjectRecord,
    ResultJsonRecord, ValidatedEntry,
};
pub use crate::core::store::{LoadSummary, ResultJsonStore};
pub use config::ApiConfig;
pub use graphql::{ApiClient, GraphQlError, GraphQlLocation, GraphQlReply};
pub use local::LocalServerClient;
pub use session::Session;

pub type ApiResult<T> = Result<T, Error>;
