//! Random identifiers for records that have no server-side id yet.

use uuid::Uuid;

/// Returns a fresh version 4 UUID in hyphenated lowercase form.
pub fn new_model_id() -> String {
    Uuid::new_v4().to_string()
}
