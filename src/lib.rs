//! # Perceptual Hash Catalogue
//!
//! Catalogues image files by perceptual hash, finds near-duplicates and
//! removes exact copies.
//!
//! ## Architecture
//! The library is split into a core engine and a thin command-line shell:
//! - `core` - Enumeration, hashing pipeline, record store, similarity, dedup
//! - `events` - Event-driven progress reporting
//! - `error` - Error types with the offending path in every message

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{CatalogError, Result};

/// Initialize tracing for the library
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks `debug` over `warn`.
/// This should be called once by the application entry point.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
