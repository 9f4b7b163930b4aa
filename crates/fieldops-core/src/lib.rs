//! Client-side synchronization core for the FieldOps mobile app.
//!
//! The surrounding app is thin glue over a REST API; everything with real
//! design tension lives here: paginated remote-backed lists, optimistic
//! mutations with exact rollback, debounced search with stale-result
//! protection, staged file attachments bound to a single multipart
//! submission, and the date-grouped thread projection.

pub mod attachments;
pub mod composer;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod models;
pub mod mutate;
pub mod rest;
pub mod search;
pub mod store;
pub mod timeline;

// Re-export the types nearly every caller needs at crate root
pub use config::CoreConfig;
pub use error::{ApiError, ApiResult};
pub use events::{CoreEvent, EventSink, Notice};
