//! Uniform file and directory attributes
//!
//! Translates raw backend records (listing summaries and metadata headers)
//! into [`FileAttributes`] / [`DirectoryAttributes`].

use crate::core::client::{ObjectMeta, ObjectSummary, DELIMITER};
use crate::core::prefixer::PathPrefixer;
use crate::core::visibility::Visibility;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Extra-metadata key for the object ETag
pub const EXTRA_ETAG: &str = "etag";

/// Extra-metadata key for the object storage class
pub const EXTRA_STORAGE_CLASS: &str = "storage_class";

const STORAGE_CLASS_HEADER: &str = "x-oss-storage-class";

/// Attributes of a regular object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    /// Logical path, without the root prefix
    pub path: String,
    #[serde(rename = "file_size")]
    pub size: Option<u64>,
    pub visibility: Option<Visibility>,
    /// Unix timestamp in seconds
    pub last_modified: Option<i64>,
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_metadata: BTreeMap<String, String>,
}

impl FileAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        FileAttributes {
            path: path.into(),
            size: None,
            visibility: None,
            last_modified: None,
            mime_type: None,
            extra_metadata: BTreeMap::new(),
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_last_modified(mut self, timestamp: i64) -> Self {
        self.last_modified = Some(timestamp);
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Attributes of an emulated directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryAttributes {
    /// Logical path, without the root prefix or trailing delimiter
    pub path: String,
}

impl DirectoryAttributes {
    pub fn new(path: impl Into<String>) -> Self {
        DirectoryAttributes { path: path.into() }
    }
}

/// Listing entry: a file or a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageAttributes {
    #[serde(rename = "file")]
    File(FileAttributes),
    #[serde(rename = "dir")]
    Directory(DirectoryAttributes),
}

impl StorageAttributes {
    pub fn path(&self) -> &str {
        match self {
            StorageAttributes::File(file) => &file.path,
            StorageAttributes::Directory(dir) => &dir.path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, StorageAttributes::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, StorageAttributes::Directory(_))
    }

    pub fn as_file(&self) -> Option<&FileAttributes> {
        match self {
            StorageAttributes::File(file) => Some(file),
            StorageAttributes::Directory(_) => None,
        }
    }
}

/// Parse a backend date string into a unix timestamp
///
/// Accepts RFC 3339 (listing bodies, e.g. `2024-01-02T03:04:05.000Z`),
/// RFC 2822 (HTTP headers, e.g. `Tue, 02 Jan 2024 03:04:05 GMT`) and a bare
/// `YYYY-MM-DD HH:MM:SS` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

/// Translate one listed object into an entry
///
/// Keys ending with the delimiter are directory markers. Files carry size
/// and timestamp only; content type and ETag need the metadata call.
pub fn from_summary(prefixer: &PathPrefixer, summary: &ObjectSummary) -> StorageAttributes {
    if summary.key.ends_with(DELIMITER) {
        return StorageAttributes::Directory(DirectoryAttributes::new(
            prefixer.strip_directory_prefix(&summary.key),
        ));
    }

    let mut file =
        FileAttributes::new(prefixer.strip_prefix(&summary.key)).with_size(summary.size);
    match parse_timestamp(&summary.last_modified) {
        Some(ts) => file.last_modified = Some(ts),
        None if !summary.last_modified.is_empty() => {
            warn!(
                "Unparseable last-modified '{}' for {}",
                summary.last_modified, summary.key
            );
        }
        None => {}
    }
    StorageAttributes::File(file)
}

/// Translate a common prefix into a directory entry
pub fn from_common_prefix(prefixer: &PathPrefixer, prefix: &str) -> StorageAttributes {
    StorageAttributes::Directory(DirectoryAttributes::new(
        prefixer.strip_directory_prefix(prefix),
    ))
}

/// Translate metadata headers into file attributes
///
/// Missing fields fall back to zero size, timestamp 0 and an empty mime type.
pub fn from_meta(path: &str, meta: &ObjectMeta) -> FileAttributes {
    let size = meta
        .get("content-length")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    let last_modified = match meta.get("last-modified") {
        Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
            warn!("Unparseable last-modified header '{}' for {}", raw, path);
            0
        }),
        None => 0,
    };

    let mime_type = meta.get("content-type").cloned().unwrap_or_default();

    let mut file = FileAttributes::new(path)
        .with_size(size)
        .with_last_modified(last_modified)
        .with_mime_type(mime_type);

    if let Some(etag) = meta.get("etag") {
        file.extra_metadata
            .insert(EXTRA_ETAG.to_string(), etag.trim_matches('"').to_string());
    }
    if let Some(class) = meta.get(STORAGE_CLASS_HEADER) {
        file.extra_metadata
            .insert(EXTRA_STORAGE_CLASS.to_string(), class.clone());
    }
    file
}
