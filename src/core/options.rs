//! Per-call configuration and the adapter-wide options bag

use crate::core::client::{RequestOptions, ACL_HEADER};
use crate::core::visibility::{Visibility, VisibilityConverter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-call option bag for write-style operations
///
/// Constructed by the caller for one operation and consumed immediately.
///
/// # Examples
///
/// ```
/// use bucketfs::{Config, Visibility};
///
/// let config = Config::new()
///     .with_visibility(Visibility::Public)
///     .with_header("Cache-Control", "max-age=60");
/// assert_eq!(config.visibility, Some(Visibility::Public));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Raw options merged over the adapter-wide options
    #[serde(default)]
    pub options: RequestOptions,
    /// Request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Sets the ACL header for the written object
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.extra.insert(name.into(), value);
        self
    }

    /// Build from a JSON object with `options`, `headers` and `visibility` keys
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Adapter-wide options, fixed at construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsHolder {
    options: RequestOptions,
}

impl OptionsHolder {
    pub fn new(options: RequestOptions) -> Self {
        OptionsHolder { options }
    }

    /// Options for calls that take no per-call config
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Options for a write-style call
    ///
    /// Layers, later wins per key: adapter options, `config.options`,
    /// `config.headers`, then the ACL header derived from `config.visibility`.
    pub fn merge_config(&self, config: &Config, converter: &VisibilityConverter) -> RequestOptions {
        let mut merged = self.options.clone();
        merged.merge(&config.options);

        for (name, value) in &config.headers {
            merged.set_header(name, value);
        }

        if let Some(visibility) = config.visibility {
            merged.set_header(ACL_HEADER, converter.visibility_to_acl(visibility).as_str());
        }

        merged
    }
}
