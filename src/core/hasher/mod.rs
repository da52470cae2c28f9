//! # Hasher Module
//!
//! Names the hash algorithms and wraps the capability that computes them.
//!
//! ## Supported Algorithms
//! - **aHash (Average Hash)** - Fastest, good for exact duplicates
//! - **pHash (Perceptual Hash)** - Most robust, handles edits well
//! - **dHash (Difference Hash)** - Best balance of speed and accuracy
//! - **wHash (Wavelet Hash)** and **Color Hash** - named for record
//!   compatibility; supplied by custom backends
//!
//! The bit-level algorithms live behind [`HashBackend`]. The default
//! [`ImageHasherBackend`] delegates to the `image_hasher` crate and
//! renders every hash as lowercase hex.
//!
//! ## Example
//! ```rust,ignore
//! use phash_catalog::core::hasher::{HasherConfig, HashAlgorithmKind};
//!
//! let backend = HasherConfig::new().hash_size(16).build();
//! let image = backend.open(&path)?;
//! let hash = backend.compute(&path, &image, HashAlgorithmKind::Difference)?;
//! ```

mod backend;
mod record;
mod traits;

pub use backend::{HashBackend, ImageHasherBackend};
pub use record::HashRecord;
pub use traits::{canonical_order, HashAlgorithmKind, HashString, UnknownAlgorithm};

/// Configuration builder for the default backend
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Hash size (8, 16, or 32)
    hash_size: u32,
}

impl HasherConfig {
    /// Create a new hasher configuration with defaults
    pub fn new() -> Self {
        Self { hash_size: 8 }
    }

    /// Set the hash size (8, 16, or 32)
    ///
    /// - 8: 64 bits, 16 hex characters
    /// - 16: 256 bits, 64 hex characters
    /// - 32: 1024 bits, very accurate, slower
    pub fn hash_size(mut self, size: u32) -> Self {
        self.hash_size = size;
        self
    }

    /// Build the backend
    pub fn build(self) -> ImageHasherBackend {
        ImageHasherBackend::new(self.hash_size)
    }
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self::new()
    }
}
