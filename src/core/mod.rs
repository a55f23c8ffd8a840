// Core modules implementing the result JSON model, store, and error modeling.
pub mod error;
pub mod ids;
pub mod record;
pub mod store;
