//! # bucketfs - Hierarchical Filesystem over Flat Object Storage
//!
//! `bucketfs` presents a key-addressed object store (OSS, S3 and friends) as a
//! filesystem with files, directories and listings:
//!
//! - **Directory emulation**: zero-byte `path/` markers, implicit directories,
//!   recursive deletion in bounded batches
//! - **Lazy listings**: paginated, shallow or deep, pulled on demand
//! - **Uniform attributes**: size, timestamp, mime type and visibility mapped
//!   from backend records and ACLs
//! - **Pluggable backend**: anything implementing [`ObjectClient`]
//!
//! ## Quick Start
//!
//! ```rust
//! use bucketfs::{Config, FilesystemBuilder, MemoryClient};
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let fs = FilesystemBuilder::new("media-assets")
//!     .prefix("uploads")
//!     .build(MemoryClient::new())?;
//!
//! fs.write("documents/report.txt", b"Hello, World!", &Config::new())?;
//! let content = fs.read("documents/report.txt")?;
//! assert_eq!(content, b"Hello, World!");
//!
//! for entry in fs.list_contents("documents", true) {
//!     println!("{}", entry?.path());
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::{
    attributes::{DirectoryAttributes, FileAttributes, StorageAttributes},
    client::{
        ClientError, ListPage, ListRequest, ObjectClient, ObjectMeta, ObjectSummary,
        RequestOptions, SignMethod, DELETE_BATCH_LIMIT,
    },
    config::{AdapterConfig, ConfigError, Credentials},
    error::{ErrorKind, FilesystemError, Result},
    listing::{Listing, ListingSettings, TraversalMode},
    memory::{MemoryClient, MemoryObject, Operation},
    options::Config,
    prefixer::PathPrefixer,
    visibility::{ObjectAcl, Visibility, VisibilityConverter},
};

use crate::core::attributes;
use crate::core::directory::DirectoryOperations;
use crate::core::listing::ListingEngine;
use crate::core::options::OptionsHolder;
use crate::core::scope::StoreScope;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;
use tracing::{debug, info};
use validator::Validate;

/// Filesystem view of one bucket
///
/// Owns the backend client and the configuration fixed at construction:
/// root prefix, visibility mapping and the options bag. Every method is a
/// best-effort sequence of blocking backend calls; nothing is cached and no
/// locks are taken.
///
/// # Examples
///
/// ```rust
/// use bucketfs::{AdapterConfig, Config, MemoryClient, ObjectFilesystem, Visibility};
///
/// # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
/// let config = AdapterConfig::from_toml_str(r#"bucket = "media-assets""#)?;
/// let fs = ObjectFilesystem::new(MemoryClient::new(), config)?;
///
/// fs.write("a/b.txt", b"hello", &Config::new().with_visibility(Visibility::Public))?;
/// assert!(fs.file_exists("a/b.txt")?);
/// assert!(fs.directory_exists("a")?);
/// # Ok(())
/// # }
/// ```
pub struct ObjectFilesystem<C> {
    client: C,
    bucket: String,
    scheme: String,
    host: String,
    is_cname: bool,
    cdn_url: Option<String>,
    prefixer: PathPrefixer,
    visibility: VisibilityConverter,
    options: OptionsHolder,
    listing: ListingSettings,
    directory_visibility: Option<Visibility>,
}

impl<C: ObjectClient> ObjectFilesystem<C> {
    /// Build the adapter from a validated configuration
    pub fn new(client: C, config: AdapterConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let (scheme, host) = config.endpoint_parts();
        let (scheme, host) = (scheme.to_string(), host.to_string());
        let mut visibility = VisibilityConverter::new();
        if let Some(fallback) = config.visibility_fallback {
            visibility = visibility.with_fallback(fallback);
        }

        info!(
            "Initializing filesystem for bucket '{}' at {} (root: '{}')",
            config.bucket, host, config.prefix
        );

        Ok(ObjectFilesystem {
            client,
            scheme,
            host,
            listing: config.listing_settings(),
            prefixer: PathPrefixer::new(&config.prefix),
            options: OptionsHolder::new(config.options),
            bucket: config.bucket,
            is_cname: config.is_cname,
            cdn_url: config.cdn_url,
            visibility,
            directory_visibility: config.directory_visibility,
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefixer(&self) -> &PathPrefixer {
        &self.prefixer
    }

    pub fn visibility_converter(&self) -> &VisibilityConverter {
        &self.visibility
    }

    fn scope(&self) -> StoreScope<'_, C> {
        StoreScope::new(&self.client, &self.bucket, &self.prefixer, &self.options)
    }

    fn listing_engine(&self) -> ListingEngine<'_, C> {
        ListingEngine::new(self.scope(), self.listing)
    }

    fn base_options(&self) -> &RequestOptions {
        self.options.options()
    }

    /// Whether a file exists at `path`
    pub fn file_exists(&self, path: &str) -> Result<bool> {
        let key = self.prefixer.prefix_path(path);
        self.client
            .object_exists(&self.bucket, &key, self.base_options())
            .map_err(|source| FilesystemError::ExistenceCheck {
                path: path.to_string(),
                source,
            })
    }

    /// Whether a directory exists at `path`, marked or implicit
    pub fn directory_exists(&self, path: &str) -> Result<bool> {
        let listing = self.listing_engine();
        DirectoryOperations::new(
            self.scope(),
            &listing,
            &self.visibility,
            self.directory_visibility,
        )
        .exists(path)
    }

    /// Whether a file or a directory exists at `path`
    pub fn has(&self, path: &str) -> Result<bool> {
        Ok(self.file_exists(path)? || self.directory_exists(path)?)
    }

    /// Write `contents`, replacing any existing object
    pub fn write(&self, path: &str, contents: &[u8], config: &Config) -> Result<()> {
        let key = self.prefixer.prefix_path(path);
        debug!("Writing {} bytes to {}", contents.len(), key);
        let options = self.options.merge_config(config, &self.visibility);
        self.client
            .put_object(&self.bucket, &key, contents, &options)
            .map_err(|source| FilesystemError::Write {
                path: path.to_string(),
                source,
            })
    }

    /// Write from a reader, replacing any existing object
    pub fn write_stream(&self, path: &str, contents: &mut dyn Read, config: &Config) -> Result<()> {
        let key = self.prefixer.prefix_path(path);
        debug!("Streaming upload to {}", key);
        let options = self.options.merge_config(config, &self.visibility);
        self.client
            .put_object_from(&self.bucket, &key, contents, &options)
            .map_err(|source| FilesystemError::Write {
                path: path.to_string(),
                source,
            })
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let key = self.prefixer.prefix_path(path);
        debug!("Reading {}", key);
        self.client
            .get_object(&self.bucket, &key, self.base_options())
            .map_err(|source| FilesystemError::Read {
                path: path.to_string(),
                source,
            })
    }

    /// Download into an anonymous temporary file, rewound to the start
    pub fn read_stream(&self, path: &str) -> Result<File> {
        let key = self.prefixer.prefix_path(path);
        debug!("Streaming download of {}", key);

        let spool = || -> std::result::Result<File, ClientError> {
            let mut file = tempfile::tempfile()?;
            self.client
                .get_object_to(&self.bucket, &key, &mut file, self.base_options())?;
            file.seek(SeekFrom::Start(0))?;
            Ok(file)
        };

        spool().map_err(|source| FilesystemError::Read {
            path: path.to_string(),
            source,
        })
    }

    /// Delete a single file; deleting a missing file is up to the backend
    pub fn delete(&self, path: &str) -> Result<()> {
        let key = self.prefixer.prefix_path(path);
        debug!("Deleting {}", key);
        self.client
            .delete_object(&self.bucket, &key, self.base_options())
            .map_err(|source| FilesystemError::Delete {
                path: path.to_string(),
                source,
            })
    }

    /// Delete a directory and everything below it
    pub fn delete_directory(&self, path: &str) -> Result<()> {
        let listing = self.listing_engine();
        DirectoryOperations::new(
            self.scope(),
            &listing,
            &self.visibility,
            self.directory_visibility,
        )
        .delete(path)
    }

    /// Create a directory marker; existing directories are left as they are
    pub fn create_directory(&self, path: &str, config: &Config) -> Result<()> {
        let listing = self.listing_engine();
        DirectoryOperations::new(
            self.scope(),
            &listing,
            &self.visibility,
            self.directory_visibility,
        )
        .create(path, config)
    }

    pub fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let key = self.prefixer.prefix_path(path);
        let acl = self.visibility.visibility_to_acl(visibility);
        debug!("Setting ACL of {} to {}", key, acl);
        self.client
            .put_object_acl(&self.bucket, &key, &acl, self.base_options())
            .map_err(|source| FilesystemError::SetVisibility {
                path: path.to_string(),
                source,
            })
    }

    /// Visibility of a file, as attributes carrying only the visibility
    pub fn visibility(&self, path: &str) -> Result<FileAttributes> {
        let key = self.prefixer.prefix_path(path);
        let acl = self
            .client
            .get_object_acl(&self.bucket, &key, self.base_options())
            .map_err(|source| FilesystemError::Visibility {
                path: path.to_string(),
                source,
            })?;
        Ok(FileAttributes::new(path).with_visibility(self.visibility.acl_to_visibility(&acl)))
    }

    /// Size, timestamp, mime type, ETag and storage class in one call
    pub fn metadata(&self, path: &str) -> Result<FileAttributes> {
        self.fetch_metadata(path, "metadata")
    }

    pub fn mime_type(&self, path: &str) -> Result<FileAttributes> {
        self.fetch_metadata(path, "mime_type")
    }

    pub fn last_modified(&self, path: &str) -> Result<FileAttributes> {
        self.fetch_metadata(path, "last_modified")
    }

    pub fn file_size(&self, path: &str) -> Result<FileAttributes> {
        self.fetch_metadata(path, "file_size")
    }

    fn fetch_metadata(&self, path: &str, attribute: &'static str) -> Result<FileAttributes> {
        let key = self.prefixer.prefix_path(path);
        let meta = self
            .client
            .get_object_meta(&self.bucket, &key, self.base_options())
            .map_err(|source| FilesystemError::Metadata {
                path: path.to_string(),
                attribute,
                source,
            })?;
        Ok(attributes::from_meta(path, &meta))
    }

    /// Lazily list the contents of a directory
    ///
    /// Each item pulled may fetch another page. An error ends the sequence.
    ///
    /// With [`TraversalMode::Flat`] a deep listing is one listing without a
    /// delimiter: it reports every object and every directory marker, but not
    /// implicit directories (prefixes no marker object exists for). A shallow
    /// listing, or a deep one with [`TraversalMode::Walk`], does report them.
    pub fn list_contents(&self, path: &str, deep: bool) -> Listing<'_, C> {
        self.listing_engine().list(path, deep)
    }

    pub fn copy(&self, source: &str, destination: &str, config: &Config) -> Result<()> {
        let source_key = self.prefixer.prefix_path(source);
        let destination_key = self.prefixer.prefix_path(destination);
        debug!("Copying object: {} -> {}", source_key, destination_key);

        let options = self.options.merge_config(config, &self.visibility);
        self.client
            .copy_object(
                &self.bucket,
                &source_key,
                &self.bucket,
                &destination_key,
                &options,
            )
            .map_err(|e| FilesystemError::Copy {
                source_path: source.to_string(),
                destination: destination.to_string(),
                source: e,
            })
    }

    /// Copy, then delete the source
    ///
    /// Not atomic. A failed copy leaves the source alone; a failed delete
    /// after a successful copy is reported as
    /// [`FilesystemError::MoveSourceNotDeleted`] with both objects in place.
    /// Moving a file onto its own key is a no-op.
    pub fn move_file(&self, source: &str, destination: &str, config: &Config) -> Result<()> {
        let source_key = self.prefixer.prefix_path(source);
        if source_key == self.prefixer.prefix_path(destination) {
            debug!("Move of {} onto itself skipped", source_key);
            return Ok(());
        }

        self.copy(source, destination, config)?;

        self.client
            .delete_object(&self.bucket, &source_key, self.base_options())
            .map_err(|e| FilesystemError::MoveSourceNotDeleted {
                source_path: source.to_string(),
                destination: destination.to_string(),
                source: e,
            })?;

        info!("Object moved: {} -> {}", source, destination);
        Ok(())
    }

    /// Public URL of a file; no backend call
    ///
    /// Uses the CDN base URL when configured, else the custom domain when the
    /// endpoint is a CNAME, else `bucket.endpoint`.
    pub fn public_url(&self, path: &str) -> String {
        let key = encode_key(&self.prefixer.prefix_path(path));
        match &self.cdn_url {
            Some(cdn) => format!("{}/{}", cdn.trim_end_matches('/'), key),
            None if self.is_cname => format!("{}://{}/{}", self.scheme, self.host, key),
            None => format!("{}://{}.{}/{}", self.scheme, self.bucket, self.host, key),
        }
    }

    /// Signed GET URL valid for `ttl`, produced by the backend client
    pub fn temporary_url(&self, path: &str, ttl: Duration, config: &Config) -> Result<String> {
        let key = self.prefixer.prefix_path(path);
        let options = self.options.merge_config(config, &self.visibility);
        self.client
            .sign_url(&self.bucket, &key, ttl, SignMethod::Get, &options)
            .map_err(|source| FilesystemError::TemporaryUrl {
                path: path.to_string(),
                source,
            })
    }
}

/// Percent-encode each key segment, keeping the delimiters
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Builder for customizing filesystem construction
///
/// # Examples
///
/// ```rust
/// use bucketfs::{FilesystemBuilder, MemoryClient, TraversalMode};
///
/// let fs = FilesystemBuilder::new("media-assets")
///     .endpoint("oss-eu-central-1.aliyuncs.com")
///     .prefix("uploads")
///     .traversal(TraversalMode::Walk)
///     .build(MemoryClient::new())
///     .unwrap();
/// assert_eq!(fs.prefixer().prefix(), "uploads/");
/// ```
pub struct FilesystemBuilder {
    config: AdapterConfig,
}

impl FilesystemBuilder {
    pub fn new(bucket: impl Into<String>) -> Self {
        FilesystemBuilder {
            config: AdapterConfig::new(bucket),
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn credentials(mut self, access_id: impl Into<String>, access_secret: impl Into<String>) -> Self {
        self.config.credentials = Credentials {
            access_id: access_id.into(),
            access_secret: access_secret.into(),
        };
        self
    }

    /// Root prefix all logical paths live under
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.config.options = options;
        self
    }

    /// Treat the endpoint as a custom domain bound to the bucket
    pub fn cname(mut self, is_cname: bool) -> Self {
        self.config.is_cname = is_cname;
        self
    }

    pub fn cdn_url(mut self, cdn_url: impl Into<String>) -> Self {
        self.config.cdn_url = Some(cdn_url.into());
        self
    }

    pub fn list_page_size(mut self, page_size: usize) -> Self {
        self.config.list_page_size = page_size;
        self
    }

    pub fn traversal(mut self, traversal: TraversalMode) -> Self {
        self.config.traversal = traversal;
        self
    }

    pub fn directory_visibility(mut self, visibility: Visibility) -> Self {
        self.config.directory_visibility = Some(visibility);
        self
    }

    pub fn visibility_fallback(mut self, visibility: Visibility) -> Self {
        self.config.visibility_fallback = Some(visibility);
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn build<C: ObjectClient>(self, client: C) -> std::result::Result<ObjectFilesystem<C>, ConfigError> {
        ObjectFilesystem::new(client, self.config)
    }
}
