//! Vinculo core — the engagement lifecycle and invariant engine of a
//! patient/professional care-coordination backend.
//!
//! Consumed as a library by a transport layer: operations take plain
//! identifiers plus a `&Connection` borrowed from [`store::Store`],
//! and return a result or a [`error::CareError`]. Authentication,
//! password hashing, and HTTP routing live outside this crate.

pub mod config;
pub mod db;
pub mod engagement;
pub mod error;
pub mod identity;
pub mod models;
pub mod mood_log;
pub mod store;

pub use error::CareError;
pub use store::Store;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the hosting process.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} core v{}", config::APP_NAME, config::APP_VERSION);
}
