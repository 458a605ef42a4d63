//! In-memory object store implementing [`ObjectClient`]
//!
//! Follows the listing contract of OSS/S3 v1 listings: keys come back in
//! lexicographic order, delimiter groups count once toward `max-keys`, and a
//! marker equal to a common prefix skips that whole group. Batch deletes are
//! capped at [`DELETE_BATCH_LIMIT`] keys.
//!
//! Besides serving as a local stand-in backend, it counts calls per
//! [`Operation`] and can fail a chosen call, which is how the adapter's error
//! paths are tested.

use crate::core::client::{
    ClientError, ListPage, ListRequest, ObjectClient, ObjectMeta, ObjectSummary, RequestOptions,
    SignMethod, ACL_HEADER, CONTENT_TYPE_HEADER, DELETE_BATCH_LIMIT,
};
use crate::core::visibility::ObjectAcl;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::time::Duration;
use tracing::debug;

const STORAGE_CLASS_HEADER: &str = "x-oss-storage-class";
const DEFAULT_STORAGE_CLASS: &str = "Standard";

/// Backend call kinds, for counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ObjectExists,
    PutObject,
    GetObject,
    DeleteObject,
    DeleteObjects,
    ListObjects,
    CopyObject,
    GetObjectMeta,
    PutObjectAcl,
    GetObjectAcl,
    SignUrl,
}

/// One stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: String,
    pub acl: ObjectAcl,
    pub storage_class: String,
}

impl MemoryObject {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let etag = compute_etag(&data);
        MemoryObject {
            data,
            content_type: None,
            last_modified: Some(Utc::now()),
            etag,
            acl: ObjectAcl::Default,
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_last_modified(mut self, last_modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn with_acl(mut self, acl: ObjectAcl) -> Self {
        self.acl = acl;
        self
    }
}

/// ETag as upper-case hex SHA-256 of the content
pub fn compute_etag(data: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(data))
}

struct PlannedFailure {
    operation: Operation,
    remaining: usize,
    error: ClientError,
}

/// Thread-safe in-memory backend
#[derive(Default)]
pub struct MemoryClient {
    buckets: RwLock<HashMap<String, BTreeMap<String, MemoryObject>>>,
    calls: Mutex<HashMap<Operation, usize>>,
    failures: Mutex<Vec<PlannedFailure>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object as-is, bypassing header handling
    pub fn insert_object(&self, bucket: &str, key: &str, object: MemoryObject) {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<MemoryObject> {
        self.buckets
            .read()
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    /// All keys in a bucket, in order
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of calls made for `operation`, failed ones included
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls.lock().get(&operation).copied().unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// Fail the next call of `operation`
    pub fn fail_next(&self, operation: Operation, error: ClientError) {
        self.fail_nth(operation, 0, error);
    }

    /// Let `skip` calls of `operation` through, then fail the following one
    pub fn fail_nth(&self, operation: Operation, skip: usize, error: ClientError) {
        self.failures.lock().push(PlannedFailure {
            operation,
            remaining: skip,
            error,
        });
    }

    fn record(&self, operation: Operation) -> Result<(), ClientError> {
        *self.calls.lock().entry(operation).or_insert(0) += 1;

        let mut failures = self.failures.lock();
        if let Some(idx) = failures
            .iter()
            .position(|f| f.operation == operation && f.remaining == 0)
        {
            let planned = failures.remove(idx);
            debug!("Injected failure for {:?}: {}", operation, planned.error);
            return Err(planned.error);
        }
        for planned in failures.iter_mut().filter(|f| f.operation == operation) {
            planned.remaining -= 1;
        }
        Ok(())
    }

    fn with_object<T>(
        &self,
        bucket: &str,
        key: &str,
        f: impl FnOnce(&MemoryObject) -> T,
    ) -> Result<T, ClientError> {
        let buckets = self.buckets.read();
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(f)
            .ok_or_else(|| ClientError::no_such_key(key))
    }
}

fn content_type_for(key: &str, options: &RequestOptions) -> String {
    match options.header(CONTENT_TYPE_HEADER) {
        Some(explicit) => explicit.to_string(),
        None => mime_guess::from_path(key)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

fn acl_for(options: &RequestOptions) -> ObjectAcl {
    options
        .header(ACL_HEADER)
        .map(ObjectAcl::parse)
        .unwrap_or(ObjectAcl::Default)
}

impl ObjectClient for MemoryClient {
    fn object_exists(
        &self,
        bucket: &str,
        key: &str,
        _options: &RequestOptions,
    ) -> Result<bool, ClientError> {
        self.record(Operation::ObjectExists)?;
        Ok(self.object(bucket, key).is_some())
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        options: &RequestOptions,
    ) -> Result<(), ClientError> {
        self.record(Operation::PutObject)?;
        let mut object = MemoryObject::new(data)
            .with_content_type(content_type_for(key, options))
            .with_acl(acl_for(options));
        if let Some(class) = options.header(STORAGE_CLASS_HEADER) {
            object.storage_class = class.to_string();
        }
        debug!("Memory PUT {}/{} ({} bytes)", bucket, key, data.len());
        self.insert_object(bucket, key, object);
        Ok(())
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
        _options: &RequestOptions,
    ) -> Result<Vec<u8>, ClientError> {
        self.record(Operation::GetObject)?;
        self.with_object(bucket, key, |object| object.data.clone())
    }

    fn delete_object(
        &self,
        bucket: &str,
        key: &str,
        _options: &RequestOptions,
    ) -> Result<(), ClientError> {
        self.record(Operation::DeleteObject)?;
        if let Some(objects) = self.buckets.write().get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
        _options: &RequestOptions,
    ) -> Result<(), ClientError> {
        self.record(Operation::DeleteObjects)?;
        if keys.is_empty() || keys.len() > DELETE_BATCH_LIMIT {
            return Err(ClientError::new(
                "MalformedXML",
                format!(
                    "Batch delete must carry 1 to {} keys, got {}",
                    DELETE_BATCH_LIMIT,
                    keys.len()
                ),
            )
            .with_status(400));
        }
        if let Some(objects) = self.buckets.write().get_mut(bucket) {
            for key in keys {
                objects.remove(key);
            }
        }
        debug!("Memory batch DELETE {} keys from {}", keys.len(), bucket);
        Ok(())
    }

    fn list_objects(
        &self,
        bucket: &str,
        request: &ListRequest,
        _options: &RequestOptions,
    ) -> Result<ListPage, ClientError> {
        self.record(Operation::ListObjects)?;

        let buckets = self.buckets.read();
        let mut page = ListPage::default();
        let objects = match buckets.get(bucket) {
            Some(objects) => objects,
            None => return Ok(page),
        };

        let prefix = request.prefix.as_str();
        let marker = request.marker.as_deref().filter(|m| !m.is_empty());
        let lower = match marker {
            Some(m) => Bound::Excluded(m),
            None => Bound::Unbounded,
        };

        let mut count = 0usize;
        let mut last_entry: Option<String> = None;
        let mut last_prefix: Option<String> = None;

        for (key, object) in objects.range::<str, _>((lower, Bound::Unbounded)) {
            if !key.starts_with(prefix) {
                if key.as_str() > prefix {
                    break;
                }
                continue;
            }

            let group = if request.delimiter.is_empty() {
                None
            } else {
                let rest = &key[prefix.len()..];
                rest.find(request.delimiter.as_str())
                    .map(|idx| format!("{}{}", prefix, &rest[..idx + request.delimiter.len()]))
            };

            if let Some(common) = &group {
                if marker.is_some_and(|m| common.as_str() <= m)
                    || last_prefix.as_deref() == Some(common.as_str())
                {
                    continue;
                }
            }

            if count == request.max_keys {
                page.is_truncated = true;
                break;
            }
            count += 1;

            match group {
                Some(common) => {
                    last_entry = Some(common.clone());
                    last_prefix = Some(common.clone());
                    page.common_prefixes.push(common);
                }
                None => {
                    last_entry = Some(key.clone());
                    page.objects.push(ObjectSummary {
                        key: key.clone(),
                        size: object.data.len() as u64,
                        last_modified: object
                            .last_modified
                            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
                            .unwrap_or_default(),
                        etag: format!("\"{}\"", object.etag),
                        storage_class: object.storage_class.clone(),
                    });
                }
            }
        }

        if page.is_truncated {
            page.next_marker = last_entry;
        }
        Ok(page)
    }

    fn copy_object(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
        options: &RequestOptions,
    ) -> Result<(), ClientError> {
        self.record(Operation::CopyObject)?;
        let mut object = self.with_object(source_bucket, source_key, MemoryObject::clone)?;
        object.last_modified = Some(Utc::now());
        object.acl = acl_for(options);
        if let Some(content_type) = options.header(CONTENT_TYPE_HEADER) {
            object.content_type = Some(content_type.to_string());
        }
        self.insert_object(dest_bucket, dest_key, object);
        Ok(())
    }

    fn get_object_meta(
        &self,
        bucket: &str,
        key: &str,
        _options: &RequestOptions,
    ) -> Result<ObjectMeta, ClientError> {
        self.record(Operation::GetObjectMeta)?;
        self.with_object(bucket, key, |object| {
            let mut meta = ObjectMeta::new();
            meta.insert("content-length".to_string(), object.data.len().to_string());
            meta.insert("etag".to_string(), format!("\"{}\"", object.etag));
            meta.insert(STORAGE_CLASS_HEADER.to_string(), object.storage_class.clone());
            if let Some(content_type) = &object.content_type {
                meta.insert("content-type".to_string(), content_type.clone());
            }
            if let Some(last_modified) = object.last_modified {
                meta.insert(
                    "last-modified".to_string(),
                    last_modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
                );
            }
            meta
        })
    }

    fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        acl: &ObjectAcl,
        _options: &RequestOptions,
    ) -> Result<(), ClientError> {
        self.record(Operation::PutObjectAcl)?;
        let mut buckets = self.buckets.write();
        let object = buckets
            .get_mut(bucket)
            .and_then(|objects| objects.get_mut(key))
            .ok_or_else(|| ClientError::no_such_key(key))?;
        object.acl = acl.clone();
        Ok(())
    }

    fn get_object_acl(
        &self,
        bucket: &str,
        key: &str,
        _options: &RequestOptions,
    ) -> Result<ObjectAcl, ClientError> {
        self.record(Operation::GetObjectAcl)?;
        self.with_object(bucket, key, |object| object.acl.clone())
    }

    fn sign_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
        method: SignMethod,
        _options: &RequestOptions,
    ) -> Result<String, ClientError> {
        self.record(Operation::SignUrl)?;
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp().saturating_add(ttl);
        let signature = compute_etag(format!("{}:{}:{}:{}", method.as_str(), bucket, key, expires).as_bytes());
        Ok(format!(
            "memory://{}/{}?Expires={}&Method={}&Signature={}",
            bucket,
            key,
            expires,
            method.as_str(),
            &signature[..16]
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &str = "bucket";

    fn client_with(keys: &[&str]) -> MemoryClient {
        let client = MemoryClient::new();
        for key in keys {
            client.insert_object(BUCKET, key, MemoryObject::new(b"x".to_vec()));
        }
        client
    }

    fn request(prefix: &str, marker: Option<&str>, delimiter: &str, max_keys: usize) -> ListRequest {
        ListRequest {
            prefix: prefix.to_string(),
            marker: marker.map(str::to_string),
            delimiter: delimiter.to_string(),
            max_keys,
        }
    }

    fn keys_of(page: &ListPage) -> Vec<&str> {
        page.objects.iter().map(|o| o.key.as_str()).collect()
    }

    #[test]
    fn test_list_prefix_and_delimiter() {
        let client = client_with(&["a/1", "a/b/2", "a/b/3", "a/c/4", "b/5"]);
        let page = client
            .list_objects(BUCKET, &request("a/", None, "/", 100), &RequestOptions::new())
            .unwrap();
        assert_eq!(keys_of(&page), vec!["a/1"]);
        assert_eq!(page.common_prefixes, vec!["a/b/", "a/c/"]);
        assert!(!page.is_truncated);
        assert_eq!(page.next_marker, None);
    }

    #[test]
    fn test_list_common_prefix_counts_once_and_marker_skips_group() {
        let client = client_with(&["a/b/1", "a/b/2", "a/b/3", "a/c"]);
        let options = RequestOptions::new();

        let first = client
            .list_objects(BUCKET, &request("a/", None, "/", 1), &options)
            .unwrap();
        assert_eq!(first.common_prefixes, vec!["a/b/"]);
        assert!(first.is_truncated);
        assert_eq!(first.next_marker.as_deref(), Some("a/b/"));

        let second = client
            .list_objects(BUCKET, &request("a/", Some("a/b/"), "/", 1), &options)
            .unwrap();
        assert_eq!(keys_of(&second), vec!["a/c"]);
        assert!(second.common_prefixes.is_empty());
        assert!(!second.is_truncated);
    }

    #[test]
    fn test_list_flat_pagination() {
        let client = client_with(&["p/1", "p/2", "p/3"]);
        let options = RequestOptions::new();
        let page = client
            .list_objects(BUCKET, &request("p/", None, "", 2), &options)
            .unwrap();
        assert_eq!(keys_of(&page), vec!["p/1", "p/2"]);
        assert!(page.is_truncated);

        let page = client
            .list_objects(BUCKET, &request("p/", page.next_marker.as_deref(), "", 2), &options)
            .unwrap();
        assert_eq!(keys_of(&page), vec!["p/3"]);
        assert!(!page.is_truncated);
    }

    #[test]
    fn test_exact_page_is_not_truncated() {
        let client = client_with(&["p/1", "p/2"]);
        let page = client
            .list_objects(BUCKET, &request("p/", None, "", 2), &RequestOptions::new())
            .unwrap();
        assert_eq!(page.objects.len(), 2);
        assert!(!page.is_truncated);
    }

    #[test]
    fn test_batch_delete_limits() {
        let client = client_with(&["k"]);
        let options = RequestOptions::new();
        let too_many: Vec<String> = (0..=DELETE_BATCH_LIMIT).map(|i| i.to_string()).collect();
        let err = client.delete_objects(BUCKET, &too_many, &options).unwrap_err();
        assert_eq!(err.code, "MalformedXML");
        assert!(client.delete_objects(BUCKET, &[], &options).is_err());

        // Missing keys are not an error
        client
            .delete_objects(BUCKET, &["k".to_string(), "gone".to_string()], &options)
            .unwrap();
        assert!(client.keys(BUCKET).is_empty());
    }

    #[test]
    fn test_put_guesses_content_type_and_reads_acl_header() {
        let client = MemoryClient::new();
        let mut options = RequestOptions::new();
        options
            .headers
            .insert(ACL_HEADER.to_string(), "public-read".to_string());
        client.put_object(BUCKET, "a/b.txt", b"hello", &options).unwrap();

        let object = client.object(BUCKET, "a/b.txt").unwrap();
        assert_eq!(object.content_type.as_deref(), Some("text/plain"));
        assert_eq!(object.acl, ObjectAcl::PublicRead);
        assert_eq!(object.etag, compute_etag(b"hello"));
    }

    #[test]
    fn test_meta_omits_missing_last_modified() {
        let client = MemoryClient::new();
        client.insert_object(
            BUCKET,
            "old.bin",
            MemoryObject::new(vec![0u8; 3]).with_last_modified(None),
        );
        let meta = client
            .get_object_meta(BUCKET, "old.bin", &RequestOptions::new())
            .unwrap();
        assert_eq!(meta["content-length"], "3");
        assert!(!meta.contains_key("last-modified"));
        assert!(!meta.contains_key("content-type"));
    }

    #[test]
    fn test_missing_object_errors() {
        let client = MemoryClient::new();
        let options = RequestOptions::new();
        assert_eq!(
            client.get_object(BUCKET, "nope", &options).unwrap_err().code,
            "NoSuchKey"
        );
        assert!(client.get_object_meta(BUCKET, "nope", &options).is_err());
        assert!(client
            .put_object_acl(BUCKET, "nope", &ObjectAcl::Private, &options)
            .is_err());
        assert!(!client.object_exists(BUCKET, "nope", &options).unwrap());
    }

    #[test]
    fn test_failure_injection_and_counters() {
        let client = client_with(&["k"]);
        let options = RequestOptions::new();
        client.fail_nth(Operation::GetObject, 1, ClientError::new("Boom", "injected"));

        assert!(client.get_object(BUCKET, "k", &options).is_ok());
        assert_eq!(client.get_object(BUCKET, "k", &options).unwrap_err().code, "Boom");
        assert!(client.get_object(BUCKET, "k", &options).is_ok());
        assert_eq!(client.calls(Operation::GetObject), 3);

        client.reset_calls();
        assert_eq!(client.calls(Operation::GetObject), 0);
    }

    #[test]
    fn test_sign_url_mentions_expiry() {
        let client = MemoryClient::new();
        let url = client
            .sign_url(BUCKET, "a.txt", Duration::from_secs(60), SignMethod::Get, &RequestOptions::new())
            .unwrap();
        assert!(url.starts_with("memory://bucket/a.txt?Expires="));
        assert!(url.contains("Method=GET"));
    }

    #[test]
    fn test_sign_url_saturates_huge_ttl() {
        let client = MemoryClient::new();
        let url = client
            .sign_url(BUCKET, "a.txt", Duration::MAX, SignMethod::Put, &RequestOptions::new())
            .unwrap();
        assert!(url.contains(&format!("Expires={}&", i64::MAX)));
        assert!(url.contains("Method=PUT"));
    }
}
