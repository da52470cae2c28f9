//! # phash-catalog CLI
//!
//! Command-line interface for the perceptual hash catalogue.
//!
//! ## Usage
//! ```bash
//! phash-catalog hash ~/Photos --store hashes.csv --concurrency 4
//! phash-catalog similar hashes.csv --image query.jpg --algorithm difference
//! phash-catalog dedup ~/Downloads/batch --yes
//! ```

mod cli;

use phash_catalog::Result;

fn main() -> Result<()> {
    cli::run()
}
