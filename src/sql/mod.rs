//! SQL text for the PostgreSQL store: identifiers come from descriptors, values are bound.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
