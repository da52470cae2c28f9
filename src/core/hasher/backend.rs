//! The hash capability consumed by the pipeline.

use super::traits::{HashAlgorithmKind, HashString};
use crate::error::{CatalogError, HashError};
use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig as ImageHasherConfig};
use std::path::Path;

/// Opens images and computes hash strings.
///
/// The pipeline only talks to this trait, so tests can swap in a
/// backend that never touches real image data.
pub trait HashBackend: Send + Sync {
    /// Open and decode the image at `path`.
    fn open(&self, path: &Path) -> Result<DynamicImage, HashError>;

    /// Compute one algorithm's hash for an already-decoded image.
    fn compute(
        &self,
        path: &Path,
        image: &DynamicImage,
        algorithm: HashAlgorithmKind,
    ) -> Result<HashString, HashError>;
}

/// Default backend built on the `image` and `image_hasher` crates.
///
/// Wavelet and color hashes have no implementation in `image_hasher`;
/// requesting them yields `HashError::Algorithm` for every asset.
pub struct ImageHasherBackend {
    average: Hasher,
    perceptual: Hasher,
    difference: Hasher,
}

impl ImageHasherBackend {
    /// Create a backend producing `hash_size` x `hash_size` bit hashes
    pub fn new(hash_size: u32) -> Self {
        let average = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Mean)
            .to_hasher();

        // pHash is the mean hash over DCT coefficients
        let perceptual = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .to_hasher();

        let difference = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Gradient)
            .to_hasher();

        Self {
            average,
            perceptual,
            difference,
        }
    }

    /// Whether this backend can compute `algorithm`
    pub fn supports(algorithm: HashAlgorithmKind) -> bool {
        matches!(
            algorithm,
            HashAlgorithmKind::Average | HashAlgorithmKind::Perceptual | HashAlgorithmKind::Difference
        )
    }

    /// Reject algorithms this backend cannot compute before any work starts
    pub fn check_algorithms(algorithms: &[HashAlgorithmKind]) -> Result<(), CatalogError> {
        match algorithms.iter().find(|a| !Self::supports(**a)) {
            Some(algorithm) => Err(CatalogError::Config(format!(
                "{algorithm} is not available in the built-in image_hasher backend; \
                 implement HashBackend and pass it to PipelineBuilder::backend to compute it"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for ImageHasherBackend {
    fn default() -> Self {
        Self::new(8)
    }
}

impl HashBackend for ImageHasherBackend {
    fn open(&self, path: &Path) -> Result<DynamicImage, HashError> {
        image::open(path).map_err(|e| match e {
            image::ImageError::IoError(source) => HashError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => HashError::Decode {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }

    fn compute(
        &self,
        path: &Path,
        image: &DynamicImage,
        algorithm: HashAlgorithmKind,
    ) -> Result<HashString, HashError> {
        let hasher = match algorithm {
            HashAlgorithmKind::Average => &self.average,
            HashAlgorithmKind::Perceptual => &self.perceptual,
            HashAlgorithmKind::Difference => &self.difference,
            HashAlgorithmKind::Wavelet | HashAlgorithmKind::Color => {
                return Err(HashError::Algorithm {
                    path: path.to_path_buf(),
                    algorithm,
                    reason: "not supported by the image_hasher backend".to_string(),
                });
            }
        };

        let hash = hasher.hash_image(image);
        Ok(HashString::from_bytes(hash.as_bytes()))
    }
}
