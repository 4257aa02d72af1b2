//! Zip extraction implementation with security features.

use crate::error::ExtractError;
use crate::names::entry_name;
use crate::safety::{check_size_limits, destination_root, resolve_entry_path};
use crate::types::{ExtractOptions, ExtractStats};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};
use zip::ZipArchive;

/// Extract a zip archive on disk to the specified output directory.
///
/// See [`extract_from_reader`] for the extraction rules.
pub fn extract_archive(
    archive_path: &Path,
    output_dir: &Path,
    options: &ExtractOptions,
) -> Result<ExtractStats, ExtractError> {
    // Verify archive exists
    if !archive_path.exists() {
        return Err(ExtractError::NotFound(archive_path.to_path_buf()));
    }

    let file = File::open(archive_path)?;
    extract_from_reader(BufReader::new(file), output_dir, options)
}

/// Extract a zip archive from a random-access reader.
///
/// This function performs secure extraction with the following features:
/// - Entry names without the UTF-8 flag are decoded as GB18030
/// - The first top-level directory entry is treated as a root folder and
///   stripped from every path
/// - Path validation to prevent zip-slip attacks
/// - Size limit enforcement
///
/// Any error aborts the remaining entries. Whatever was already written to
/// `output_dir` is left in place for the caller to discard.
pub fn extract_from_reader<R: Read + Seek>(
    reader: R,
    output_dir: &Path,
    options: &ExtractOptions,
) -> Result<ExtractStats, ExtractError> {
    let start_time = Instant::now();

    // The central directory sits at the end of the stream
    let mut archive = ZipArchive::new(reader)?;

    // Create output directory if it doesn't exist
    fs::create_dir_all(output_dir)?;
    let root = destination_root(output_dir)?;

    let names = decode_entry_names(&mut archive, options)?;
    let root_folder = if options.strip_root_folder {
        detect_root_folder(&names)
    } else {
        None
    };
    if let Some(folder) = root_folder {
        debug!(root_folder = folder, "Stripping archive root folder");
    }

    let mut stats = ExtractStats {
        root_folder: root_folder.map(str::to_string),
        ..ExtractStats::default()
    };

    for (index, name) in names.iter().enumerate() {
        let relative = match root_folder {
            Some(folder) if name == folder => continue,
            Some(folder) => name.strip_prefix(folder).unwrap_or(name.as_str()),
            None => name.as_str(),
        };

        let output_path = resolve_entry_path(&root, relative)?;

        if name.ends_with('/') {
            fs::create_dir_all(&output_path)?;
            stats.dirs_created += 1;
            continue;
        }

        let mut entry = archive.by_index(index)?;

        // Check size limits against the declared size before touching disk
        check_size_limits(
            stats.bytes_written.saturating_add(entry.size()),
            options.size_limit_bytes,
        )?;

        // Create parent directories
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut output = create_output_file(&output_path, entry.unix_mode())?;
        let written = match options.size_limit_bytes {
            // Declared sizes can lie; never read more than one byte past the limit
            Some(limit) => {
                let remaining = limit.saturating_sub(stats.bytes_written);
                io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut output)?
            }
            None => io::copy(&mut entry, &mut output)?,
        };
        drop(output);

        stats.bytes_written += written;
        check_size_limits(stats.bytes_written, options.size_limit_bytes)?;
        stats.files_extracted += 1;

        debug!(entry = relative, bytes = written, "Extracted file");
    }

    stats.duration = start_time.elapsed();
    info!(
        files = stats.files_extracted,
        dirs = stats.dirs_created,
        bytes = stats.bytes_written,
        output = %output_dir.display(),
        "Extraction finished"
    );
    Ok(stats)
}

/// Decode every entry name in archive order.
fn decode_entry_names<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    options: &ExtractOptions,
) -> Result<Vec<String>, ExtractError> {
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        // Raw access skips decompression and decryption setup
        let entry = archive.by_index_raw(index)?;
        names.push(entry_name(
            entry.name_raw(),
            entry.name(),
            options.legacy_encoding,
        ));
    }
    Ok(names)
}

/// Find the archive's root folder: the first directory entry, in archive
/// order, whose name contains exactly one separator (the trailing one).
fn detect_root_folder(names: &[String]) -> Option<&str> {
    names
        .iter()
        .find(|name| name.ends_with('/') && name.matches('/').count() == 1)
        .map(String::as_str)
}

/// Create (or truncate) an output file with the entry's permission bits.
fn create_output_file(path: &Path, mode: Option<u32>) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Some(mode) = mode {
            options.mode(mode & 0o777);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_root_folder_single_top_level() {
        let list = names(&["bundle/", "bundle/index.html", "bundle/files/"]);
        assert_eq!(detect_root_folder(&list), Some("bundle/"));
    }

    #[test]
    fn test_detect_root_folder_first_match_wins() {
        let list = names(&["a/b/", "first/", "second/", "first/x.html"]);
        assert_eq!(detect_root_folder(&list), Some("first/"));
    }

    #[test]
    fn test_detect_root_folder_ignores_files_and_nested_dirs() {
        let list = names(&["index.html", "files/page/", "files/page/a.css"]);
        assert_eq!(detect_root_folder(&list), None);
    }

    #[test]
    fn test_detect_root_folder_none_without_directory_entries() {
        let list = names(&["bundle/index.html", "bundle/data.js"]);
        assert_eq!(detect_root_folder(&list), None);
    }

    #[test]
    fn test_create_output_file_truncates() {
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page.html");
        fs::write(&path, "a much longer previous body").unwrap();

        let mut file = create_output_file(&path, None).unwrap();
        io::Write::write_all(&mut file, b"new").unwrap();
        drop(file);

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn test_create_output_file_applies_mode() {
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.sh");

        create_output_file(&path, Some(0o100600)).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
