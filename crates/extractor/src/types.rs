//! Type definitions for archive extraction.

use std::time::Duration;

/// Options for extracting an archive.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Strip the first top-level directory entry from every extracted path
    pub strip_root_folder: bool,

    /// Decode names of entries without the UTF-8 flag as GB18030
    pub legacy_encoding: bool,

    /// Maximum total extracted size in bytes (default: 20 GB)
    pub size_limit_bytes: Option<u64>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            strip_root_folder: true,
            legacy_encoding: true,
            size_limit_bytes: Some(20 * 1024 * 1024 * 1024), // 20 GB
        }
    }
}

/// Statistics about a completed extraction operation.
#[derive(Debug, Clone, Default)]
pub struct ExtractStats {
    /// Number of files successfully extracted
    pub files_extracted: u64,

    /// Number of directory entries created
    pub dirs_created: u64,

    /// Total bytes written to disk
    pub bytes_written: u64,

    /// Wall-clock duration of the extraction
    pub duration: Duration,

    /// Root folder that was stripped, if one was detected
    pub root_folder: Option<String>,
}
