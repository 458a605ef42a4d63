//! Backend object-storage client surface
//!
//! The adapter never talks to the network itself. Everything it needs from the
//! backing store is expressed by [`ObjectClient`]; transport, request signing,
//! connection handling and retries belong to the implementation.

use crate::core::visibility::ObjectAcl;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::time::Duration;
use thiserror::Error;

/// Maximum number of keys a single batch delete may carry
pub const DELETE_BATCH_LIMIT: usize = 1000;

/// Maximum page size a listing request may ask for
pub const MAX_LIST_KEYS: usize = 1000;

/// Hierarchy delimiter used for directory emulation
pub const DELIMITER: &str = "/";

/// Request header carrying the object ACL on writes
pub const ACL_HEADER: &str = "x-oss-object-acl";

/// Request header carrying the object content type on writes
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// Failure reported by the backend client
///
/// Carries the backend's own error code and message untouched so callers can
/// inspect them through the adapter's error chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ClientError {
    /// Backend error code (e.g. `NoSuchKey`, `AccessDenied`)
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
}

impl ClientError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError {
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// The object does not exist
    pub fn no_such_key(key: &str) -> Self {
        ClientError::new("NoSuchKey", format!("The specified key does not exist: {}", key))
            .with_status(404)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::new("IoError", err.to_string())
    }
}

/// Raw options bag merged under every backend call
///
/// `headers` become request headers; `extra` is passed through to the client
/// untouched (endpoint-specific switches, query parameters, and the like).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing one whatever its case
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Overlay `other` on top of `self`, key by key
    pub fn merge(&mut self, other: &RequestOptions) {
        for (k, v) in &other.headers {
            self.set_header(k, v);
        }
        for (k, v) in &other.extra {
            self.extra.insert(k.clone(), v.clone());
        }
    }
}

/// One listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub prefix: String,
    /// Continuation token; `None` starts at the beginning of the prefix
    pub marker: Option<String>,
    /// Empty string requests a flat listing
    pub delimiter: String,
    pub max_keys: usize,
}

/// Object record as returned by a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    /// Backend date string, e.g. `2024-01-02T03:04:05.000Z`
    pub last_modified: String,
    pub etag: String,
    pub storage_class: String,
}

/// One page of a listing response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    /// Delimiter-bounded prefixes one level below the request prefix
    pub common_prefixes: Vec<String>,
    pub next_marker: Option<String>,
    pub is_truncated: bool,
}

impl ListPage {
    /// Continuation token for the following page
    ///
    /// Falls back to the greatest key or prefix on the page when the backend
    /// reports truncation without handing out a marker. Returns `None` once
    /// the page is the last one.
    pub fn continuation(&self) -> Option<String> {
        if !self.is_truncated {
            return None;
        }
        if let Some(marker) = self.next_marker.as_ref().filter(|m| !m.is_empty()) {
            return Some(marker.clone());
        }
        let last_object = self.objects.iter().map(|o| o.key.as_str()).max();
        let last_prefix = self.common_prefixes.iter().map(String::as_str).max();
        last_object.max(last_prefix).map(str::to_string)
    }
}

/// Raw metadata headers returned by a HEAD-style call, names lower-cased
pub type ObjectMeta = BTreeMap<String, String>;

/// HTTP method a signed URL is valid for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMethod {
    Get,
    Put,
}

impl SignMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignMethod::Get => "GET",
            SignMethod::Put => "PUT",
        }
    }
}

/// Capability set the adapter consumes from an object-storage client
///
/// Implementations decide their own thread-safety; the adapter adds no
/// locking on top of whatever the client provides.
pub trait ObjectClient {
    fn object_exists(
        &self,
        bucket: &str,
        key: &str,
        options: &RequestOptions,
    ) -> Result<bool, ClientError>;

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        options: &RequestOptions,
    ) -> Result<(), ClientError>;

    /// Upload from a reader
    ///
    /// The default buffers the whole source and delegates to [`put_object`].
    ///
    /// [`put_object`]: ObjectClient::put_object
    fn put_object_from(
        &self,
        bucket: &str,
        key: &str,
        source: &mut dyn Read,
        options: &RequestOptions,
    ) -> Result<(), ClientError> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        self.put_object(bucket, key, &data, options)
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
        options: &RequestOptions,
    ) -> Result<Vec<u8>, ClientError>;

    /// Download into a caller-supplied sink, returning the bytes written
    fn get_object_to(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut dyn Write,
        options: &RequestOptions,
    ) -> Result<u64, ClientError> {
        let data = self.get_object(bucket, key, options)?;
        sink.write_all(&data)?;
        Ok(data.len() as u64)
    }

    fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        options: &RequestOptions,
    ) -> Result<(), ClientError>;

    /// Delete up to [`DELETE_BATCH_LIMIT`] keys in one request
    ///
    /// Keys that do not exist are not an error.
    fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
        options: &RequestOptions,
    ) -> Result<(), ClientError>;

    fn list_objects(
        &self,
        bucket: &str,
        request: &ListRequest,
        options: &RequestOptions,
    ) -> Result<ListPage, ClientError>;

    fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
        options: &RequestOptions,
    ) -> Result<(), ClientError>;

    fn get_object_meta(
        &self,
        bucket: &str,
        key: &str,
        options: &RequestOptions,
    ) -> Result<ObjectMeta, ClientError>;

    fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        acl: &ObjectAcl,
        options: &RequestOptions,
    ) -> Result<(), ClientError>;

    fn get_object_acl(
        &self,
        bucket: &str,
        key: &str,
        options: &RequestOptions,
    ) -> Result<ObjectAcl, ClientError>;

    fn sign_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
        method: SignMethod,
        options: &RequestOptions,
    ) -> Result<String, ClientError>;
}
