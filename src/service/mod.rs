//! Resource engine: generic CRUD plus per-resource hooks.

mod crud;
mod validation;
pub use crud::ResourceAccessor;
pub use validation::{NoopHooks, RecordHooks, RuleHooks};
