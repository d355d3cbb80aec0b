pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod source;
pub mod tracing_setup;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the types a frontend needs at crate root for convenience
pub use config::CoreConfig;
pub use error::ReviewError;
pub use models::{Item, ListQuery, TriState, User};
pub use service::ReviewService;
pub use source::ActivitySource;
pub use tokio_util::sync::CancellationToken;
