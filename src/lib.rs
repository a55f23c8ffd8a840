//! Purpose: Shared library crate used by the `graphery` CLI and tests.
//! Exports: `core` (records, result store, errors) and `api` (session, GraphQL and local clients).
//! Role: Client-side API access and session state for the Graphery web application.
//! Invariants: Session state is passed explicitly; the crate holds no global mutable state.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
pub mod endpoints;
