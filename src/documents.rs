//! Source document discovery and the content digest used as the index
//! manifest.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::DocumentsConfig;
use crate::error::IndexError;

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the documents directory, `/`-separated.
    pub relative: String,
}

/// List matching files under the documents directory, sorted by path.
///
/// A missing directory is not an error: it simply holds no documents.
pub fn scan_documents(config: &DocumentsConfig) -> Result<Vec<SourceFile>, IndexError> {
    let root = &config.dir;
    if !root.exists() {
        tracing::warn!(dir = %root.display(), "documents directory does not exist");
        return Ok(Vec::new());
    }

    let include_set = build_globset(&config.include_globs).map_err(|e| IndexError::Scan {
        path: root.clone(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry.map_err(|e| IndexError::Scan {
            path: root.clone(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(SourceFile {
            path: path.to_path_buf(),
            relative: rel_str,
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}

/// Hex SHA-256 over the bytes of every file, in the given order.
pub fn digest_files(files: &[SourceFile]) -> Result<String, IndexError> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    for file in files {
        let mut handle = std::fs::File::open(&file.path).map_err(|e| io_err(&file.path, e))?;
        loop {
            let n = handle.read(&mut buf).map_err(|e| io_err(&file.path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

fn io_err(path: &Path, source: std::io::Error) -> IndexError {
    IndexError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(pattern)
                .literal_separator(true)
                .case_insensitive(true)
                .build()?,
        );
    }
    builder.build()
}
