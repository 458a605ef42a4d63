//! Adapter construction settings
//!
//! Loaded from TOML or from a JSON object and validated before the adapter is
//! built. Credentials are carried for the caller's client construction only;
//! the adapter itself never reads them.

use crate::core::client::{RequestOptions, MAX_LIST_KEYS};
use crate::core::listing::{ListingSettings, TraversalMode};
use crate::core::visibility::Visibility;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "oss-cn-hangzhou.aliyuncs.com";

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration rejected: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Access credentials, opaque to the adapter
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_id: String,
    #[serde(default)]
    pub access_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &self.access_id)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

/// Settings the adapter is built from
///
/// # Examples
///
/// ```
/// use bucketfs::AdapterConfig;
///
/// let config = AdapterConfig::from_toml_str(r#"
///     bucket = "media-assets"
///     prefix = "uploads"
///     cdn_url = "https://cdn.example.com"
/// "#).unwrap();
/// assert_eq!(config.list_page_size, 1000);
/// ```
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdapterConfig {
    #[validate(custom(function = "validate_bucket_name"))]
    pub bucket: String,

    /// Endpoint host, optionally with an `http://` or `https://` scheme
    #[serde(default = "default_endpoint")]
    #[validate(length(min = 1))]
    pub endpoint: String,

    #[serde(flatten)]
    pub credentials: Credentials,

    /// Root prefix all logical paths live under
    #[serde(default)]
    pub prefix: String,

    /// Options merged into every backend call
    #[serde(default)]
    pub options: RequestOptions,

    /// Endpoint is a custom domain bound to the bucket
    #[serde(default)]
    pub is_cname: bool,

    /// Base URL overriding generated public URLs
    #[serde(default)]
    #[validate(url)]
    pub cdn_url: Option<String>,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub list_page_size: usize,

    #[serde(default)]
    pub traversal: TraversalMode,

    /// Visibility applied to created directories when the call sets none
    #[serde(default)]
    pub directory_visibility: Option<Visibility>,

    /// Visibility reported for ACLs that are neither public nor private
    #[serde(default)]
    pub visibility_fallback: Option<Visibility>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_page_size() -> usize {
    MAX_LIST_KEYS
}

impl AdapterConfig {
    /// Minimal configuration for a bucket, everything else defaulted
    pub fn new(bucket: impl Into<String>) -> Self {
        AdapterConfig {
            bucket: bucket.into(),
            endpoint: default_endpoint(),
            credentials: Credentials::default(),
            prefix: String::new(),
            options: RequestOptions::default(),
            is_cname: false,
            cdn_url: None,
            list_page_size: default_page_size(),
            traversal: TraversalMode::default(),
            directory_visibility: None,
            visibility_fallback: None,
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AdapterConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: AdapterConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn listing_settings(&self) -> ListingSettings {
        ListingSettings::new(self.list_page_size, self.traversal)
    }

    /// URL scheme and bare host of the endpoint
    pub fn endpoint_parts(&self) -> (&str, &str) {
        let endpoint = self.endpoint.trim();
        let (scheme, host) = if let Some(host) = endpoint.strip_prefix("https://") {
            ("https", host)
        } else if let Some(host) = endpoint.strip_prefix("http://") {
            ("http", host)
        } else {
            ("https", endpoint)
        };
        (scheme, host.trim_end_matches('/'))
    }
}

fn bucket_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9.-]*[a-z0-9]$").expect("bucket name pattern is valid")
    })
}

/// Bucket naming rules
///
/// - 3-63 characters
/// - Lowercase letters, numbers, dots, hyphens
/// - Must start and end with letter or number
/// - No consecutive dots
pub fn validate_bucket_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |message: &'static str| {
        let mut err = ValidationError::new("bucket_name");
        err.message = Some(message.into());
        err
    };

    if name.len() < 3 || name.len() > 63 {
        return Err(invalid("bucket name must be 3-63 characters"));
    }
    if !bucket_pattern().is_match(name) {
        return Err(invalid(
            "bucket name must use lowercase letters, numbers, dots and hyphens, \
             and start and end with a letter or number",
        ));
    }
    if name.contains("..") {
        return Err(invalid("bucket name cannot contain consecutive dots"));
    }
    Ok(())
}
