//! Content tree scanner.
//!
//! Walks the configured content root, keeps files whose extension is
//! recognized and whose modification time is strictly after the checkpoint,
//! and extracts their text into [`ContentRecord`]s.
//!
//! A file that cannot be read or parsed is skipped with a warning; the rest of
//! the scan continues. Set `ingest.fail_fast` to abort instead.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::extract;
use crate::models::{ContentKind, ContentRecord};

/// Knobs for a scan, usually built from [`Config`] with [`ScanOptions::from_config`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub extensions: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub follow_symlinks: bool,
    pub strip_front_matter: bool,
    pub fail_fast: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string(), "mdx".to_string(), "pdf".to_string()],
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            strip_front_matter: false,
            fail_fast: false,
        }
    }
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            extensions: config.content.extensions.clone(),
            exclude_globs: config.content.exclude_globs.clone(),
            follow_symlinks: config.content.follow_symlinks,
            strip_front_matter: config.content.strip_front_matter,
            fail_fast: config.ingest.fail_fast,
        }
    }
}

/// A file left out of the scan and why.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a scan: extracted records plus the files that were skipped.
#[derive(Debug, Default)]
pub struct Scan {
    pub records: Vec<ContentRecord>,
    pub skipped: Vec<SkippedFile>,
    /// Recognized files at or before the checkpoint.
    pub unchanged: usize,
}

/// Find and extract recognized files under `root` modified strictly after `since`.
pub fn scan(root: &Path, since: DateTime<Utc>, options: &ScanOptions) -> Result<Scan> {
    if !root.exists() {
        bail!("Content root does not exist: {}", root.display());
    }

    let mut excludes = vec!["**/.git/**".to_string(), "**/node_modules/**".to_string()];
    excludes.extend(options.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut out = Scan::default();

    for entry in WalkDir::new(root).follow_links(options.follow_symlinks) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                skip(&mut out, options, path, e.to_string())?;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative) {
            continue;
        }

        let Some(kind) = recognized_kind(path, &options.extensions) else {
            continue;
        };

        let modified_at = match modified_time(path) {
            Ok(t) => t,
            Err(e) => {
                skip(&mut out, options, path.to_path_buf(), e.to_string())?;
                continue;
            }
        };
        if modified_at <= since {
            out.unchanged += 1;
            continue;
        }

        match extract::extract_file(path, kind, options.strip_front_matter) {
            Ok(raw_text) => out.records.push(ContentRecord {
                path: path.to_path_buf(),
                kind,
                modified_at,
                raw_text,
            }),
            Err(e) => skip(&mut out, options, path.to_path_buf(), e.to_string())?,
        }
    }

    // Deterministic ordering regardless of directory iteration order
    out.records.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(out)
}

fn skip(out: &mut Scan, options: &ScanOptions, path: PathBuf, reason: String) -> Result<()> {
    if options.fail_fast {
        bail!("Failed to scan {}: {}", path.display(), reason);
    }
    tracing::warn!(path = %path.display(), %reason, "skipping content file");
    out.skipped.push(SkippedFile { path, reason });
    Ok(())
}

fn recognized_kind(path: &Path, extensions: &[String]) -> Option<ContentKind> {
    let ext = path.extension()?.to_str()?;
    if !extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        return None;
    }
    ContentKind::from_extension(ext)
}

fn modified_time(path: &Path) -> Result<DateTime<Utc>> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let modified = metadata.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
