//! File utilities for reading source files and discovering them on disk.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::core::errors::{ParamdupError, Result};

/// Safe file reading with UTF-8 validation and fallback handling
pub struct FileReader;

impl FileReader {
    /// Read a file to string, handling non-UTF-8 files gracefully
    pub fn read_to_string(file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(strip_bom(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ParamdupError::input_not_found(file_path))
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                let bytes = fs::read(file_path)
                    .map_err(|err| ParamdupError::io("Failed to read file as bytes", err))?;
                warn!(
                    "File contained invalid UTF-8, converted with lossy encoding: {}",
                    file_path.display()
                );
                Ok(strip_bom(String::from_utf8_lossy(&bytes).into_owned()))
            }
            Err(e) => Err(ParamdupError::io(
                format!("Failed to read file: {}", file_path.display()),
                e,
            )),
        }
    }

    /// Write a file, creating parent directories as needed
    pub fn write(file_path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ParamdupError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }
        fs::write(file_path, contents).map_err(|e| {
            ParamdupError::io(format!("Failed to write file: {}", file_path.display()), e)
        })
    }
}

fn strip_bom(content: String) -> String {
    match content.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => content,
    }
}

/// Compile glob patterns into a matcher; `None` when the list is empty.
pub fn compile_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ParamdupError::config_field(format!("Invalid glob '{}': {}", pattern, e), "exclude_patterns")
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| ParamdupError::config(format!("Failed to build glob set: {}", e)))
}

/// Walk `root` (respecting ignore files) and return files with one of the given
/// extensions that no exclude pattern matches. The result is sorted.
pub fn discover_source_files(
    root: &Path,
    extensions: &[&str],
    exclude_patterns: &[String],
) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(ParamdupError::input_not_found(root));
    }

    let exclude = compile_globset(exclude_patterns)?;
    let mut files = Vec::new();

    for entry in WalkBuilder::new(root).hidden(false).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path during discovery: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || !has_extension(path, extensions) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude
            .as_ref()
            .map_or(false, |set| set.is_match(relative) || set.is_match(path))
        {
            debug!("Excluded by pattern: {}", path.display());
            continue;
        }

        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            extensions.iter().any(|wanted| ext.eq_ignore_ascii_case(wanted))
        })
}
