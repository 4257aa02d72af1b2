//! # Extractor
//!
//! Safe extraction of uploaded prototype bundles (zip archives).
//!
//! This library unpacks untrusted zip archives into a destination directory
//! with built-in protection against path traversal, a decompressed size
//! limit, and the normalizations prototype bundles usually need:
//!
//! - Entry names without the UTF-8 flag are decoded as GB18030
//! - A single enclosing root folder (`bundle/...`) is stripped so the
//!   content lands directly in the destination directory
//!
//! ## Example
//!
//! ```rust,no_run
//! use extractor::{extract, ExtractOptions};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ExtractOptions::default();
//! let stats = extract(Path::new("bundle.zip"), Path::new("output"), &options)?;
//!
//! println!("Extracted {} files ({} bytes)", stats.files_extracted, stats.bytes_written);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod names;
pub mod safety;
pub mod types;

// Re-export main types
pub use error::{ExtractError, SecurityError};
pub use types::{ExtractOptions, ExtractStats};

use std::io::{Read, Seek};
use std::path::Path;

/// Extract a zip archive file to the specified output directory.
///
/// # Arguments
///
/// * `archive_path` - Path to the archive file
/// * `output_dir` - Directory where files will be extracted
/// * `options` - Extraction options (root folder stripping, name decoding, size limit)
///
/// # Errors
///
/// Returns an error if:
/// - The archive file doesn't exist or is not a valid zip
/// - An entry resolves outside of `output_dir`
/// - The size limit is exceeded
/// - I/O errors occur
pub fn extract(
    archive_path: &Path,
    output_dir: &Path,
    options: &ExtractOptions,
) -> Result<ExtractStats, ExtractError> {
    extract::extract_archive(archive_path, output_dir, options)
}

/// Extract a zip archive held by a random-access reader, such as an
/// uploaded body wrapped in [`std::io::Cursor`].
///
/// # Errors
///
/// Same as [`extract`], minus the missing-file case.
pub fn extract_from<R: Read + Seek>(
    reader: R,
    output_dir: &Path,
    options: &ExtractOptions,
) -> Result<ExtractStats, ExtractError> {
    extract::extract_from_reader(reader, output_dir, options)
}
