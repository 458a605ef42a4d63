//! Visibility and object ACL translation
//!
//! The adapter exposes a two-valued visibility model. Backends speak in canned
//! ACLs instead:
//! - `private`: owner-only access
//! - `public-read`: anonymous read
//! - `public-read-write`: anonymous read and write
//! - `default`: inherit the bucket ACL
//!
//! Anything else a backend may return is kept verbatim as [`ObjectAcl::Custom`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Uniform visibility of a file or directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility '{}'", other)),
        }
    }
}

/// Canned object ACL as understood by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectAcl {
    Default,
    Private,
    PublicRead,
    PublicReadWrite,
    /// Backend-specific value outside the canned set
    Custom(String),
}

impl ObjectAcl {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectAcl::Default => "default",
            ObjectAcl::Private => "private",
            ObjectAcl::PublicRead => "public-read",
            ObjectAcl::PublicReadWrite => "public-read-write",
            ObjectAcl::Custom(value) => value,
        }
    }

    /// Parse a backend ACL value; never fails
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "default" => ObjectAcl::Default,
            "private" => ObjectAcl::Private,
            "public-read" => ObjectAcl::PublicRead,
            "public-read-write" => ObjectAcl::PublicReadWrite,
            other => ObjectAcl::Custom(other.to_string()),
        }
    }

    /// Grants anonymous read access
    pub fn is_public(&self) -> bool {
        matches!(self, ObjectAcl::PublicRead | ObjectAcl::PublicReadWrite)
    }
}

impl fmt::Display for ObjectAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectAcl {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ObjectAcl::parse(s))
    }
}

/// Bidirectional visibility <-> ACL mapping
///
/// Both directions are total. ACL values that grant no anonymous read access
/// (including `default` and custom values) map to the configured fallback,
/// which is [`Visibility::Private`] unless overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityConverter {
    fallback: Visibility,
}

impl VisibilityConverter {
    pub fn new() -> Self {
        VisibilityConverter {
            fallback: Visibility::Private,
        }
    }

    /// Visibility reported for ACLs that are not explicitly public or private
    pub fn with_fallback(mut self, fallback: Visibility) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> Visibility {
        self.fallback
    }

    pub fn visibility_to_acl(&self, visibility: Visibility) -> ObjectAcl {
        match visibility {
            Visibility::Public => ObjectAcl::PublicRead,
            Visibility::Private => ObjectAcl::Private,
        }
    }

    pub fn acl_to_visibility(&self, acl: &ObjectAcl) -> Visibility {
        match acl {
            acl if acl.is_public() => Visibility::Public,
            ObjectAcl::Private => Visibility::Private,
            _ => self.fallback,
        }
    }
}

impl Default for VisibilityConverter {
    fn default() -> Self {
        Self::new()
    }
}
