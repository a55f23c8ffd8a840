//! Purpose: Hold per-session client state shared by API calls and the result store.
//! Exports: `Session`.
//! Role: Explicit replacement for application-wide state; built once per user session.
//! Invariants: One CSRF token slot per session; readers never block on network I/O.
//! Invariants: Store commands run under the session's store mutex, one at a time.
//! Notes: Poisoned locks are recovered; the guarded data has no partial-update states.

use std::sync::{Mutex, MutexGuard, RwLock};

use crate::core::store::ResultJsonStore;

#[derive(Debug, Default)]
pub struct Session {
    csrf_token: RwLock<Option<String>>,
    results: Mutex<ResultJsonStore>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_csrf_token(self, token: impl Into<String>) -> Self {
        self.set_csrf_token(token);
        self
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.csrf_token
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    pub fn set_csrf_token(&self, token: impl Into<String>) {
        *self
            .csrf_token
            .write()
            .unwrap_or_else(|poison| poison.into_inner()) = Some(token.into());
    }

    pub fn clear_csrf_token(&self) {
        *self
            .csrf_token
            .write()
            .unwrap_or_else(|poison| poison.into_inner()) = None;
    }

    pub fn results(&self) -> MutexGuard<'_, ResultJsonStore> {
        self.results
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}
