//! FarmLink Client Library
//!
//! Rust client SDK for the FarmLink job-placement platform (farms,
//! graduates, students, skilled workers, admins).
//!
//! # Features
//!
//! - **Single call path**: every backend call routes through
//!   [`FarmLinkClient::request`]
//! - **Response caching**: GET responses are reused within a TTL and can be
//!   invalidated by endpoint substring after mutations
//! - **De-duplication**: concurrent identical requests collapse onto one
//!   network call
//! - **Session handling**: bearer tokens come from a pluggable
//!   [`SessionProvider`]; an authenticated 401 invalidates the session
//! - **Timeouts**: a wall-clock watchdog aborts stuck requests with a
//!   distinguishable [`Error::Timeout`]
//! - **Uploads**: `multipart/form-data` with no cache/de-dup participation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use client::{FarmLinkClient, RequestOptions};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use session::{MemorySession, SessionProvider};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// # Errors
///
/// Currently infallible; returns `Result` so future sinks can fail cleanly.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
