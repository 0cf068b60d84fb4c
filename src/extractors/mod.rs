//! Axum extractors.

mod head;
