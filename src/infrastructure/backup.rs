//! # Backup Archives
//!
//! Packs the data directory into a zip archive and stores archives in a local
//! directory sink. Archive names carry their UTC creation time, which is what retention
//! pruning reads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::domain::traits::BackupSink;

const ARCHIVE_PREFIX: &str = "nicebot_backup_";
const ARCHIVE_SUFFIX: &str = ".zip";
const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub fn archive_name(at: DateTime<Utc>) -> String {
    format!("{ARCHIVE_PREFIX}{}{ARCHIVE_SUFFIX}", at.format(STAMP_FORMAT))
}

/// Creation time encoded in an archive name, if it is one of ours.
pub fn archive_time(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(ARCHIVE_PREFIX)?
        .strip_suffix(ARCHIVE_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Zips every file under `data_dir`, skipping `exclude`.
/// Entries are stored under the data directory's own name, e.g. `data/quotes.json`.
pub fn build_archive(data_dir: &Path, exclude: Option<&Path>) -> Result<Vec<u8>> {
    let root_name = data_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "data".to_string());

    let mut files = Vec::new();
    if data_dir.is_dir() {
        collect_files(data_dir, exclude, &mut files)?;
    }

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let relative = path.strip_prefix(data_dir).unwrap_or(path);
        let name = format!(
            "{}/{}",
            root_name,
            relative.to_string_lossy().replace('\\', "/")
        );
        add_file(&mut writer, path, &name, options)?;
        tracing::debug!("Added to backup: {}", name);
    }

    let cursor = writer.finish().context("Failed to finish backup archive")?;
    Ok(cursor.into_inner())
}

fn collect_files(dir: &Path, exclude: Option<&Path>, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if exclude.is_some_and(|ex| path.starts_with(ex)) {
            continue;
        }
        if path.is_dir() {
            collect_files(&path, exclude, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn add_file(
    writer: &mut zip::ZipWriter<Cursor<Vec<u8>>>,
    path: &Path,
    name: &str,
    options: FileOptions,
) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    writer
        .start_file(name, options)
        .with_context(|| format!("Failed to add {} to archive", name))?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Stores archives as files in a local directory.
pub struct LocalDirectorySink {
    root: PathBuf,
}

impl LocalDirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BackupSink for LocalDirectorySink {
    async fn upload(&self, name: &str, archive: Vec<u8>) -> Result<(), String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("Failed to create {}: {}", self.root.display(), e))?;
        let path = self.root.join(name);
        tokio::fs::write(&path, archive)
            .await
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }

    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, String> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(format!("Failed to list {}: {}", self.root.display(), e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(|e| e.to_string())? {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(created) = archive_time(&name) else {
                continue;
            };
            if created < cutoff {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => {
                        removed += 1;
                        tracing::debug!("Deleted old backup: {}", name);
                    }
                    Err(e) => tracing::warn!("Failed to delete old backup {}: {}", name, e),
                }
            }
        }
        Ok(removed)
    }
}
