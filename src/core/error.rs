//! Error types for filesystem operations

use crate::core::client::ClientError;
use thiserror::Error;

/// Filesystem operation result type
pub type Result<T> = std::result::Result<T, FilesystemError>;

/// Failure category of a [`FilesystemError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ExistenceCheckFailed,
    ReadFailed,
    WriteFailed,
    DeleteFailed,
    DeleteDirectoryFailed,
    CreateDirectoryFailed,
    CopyFailed,
    MoveFailed,
    MetadataRetrievalFailed,
    VisibilitySetFailed,
    VisibilityRetrievalFailed,
    ListingFailed,
    UrlGenerationFailed,
}

/// Filesystem operation errors
///
/// Every variant carries the logical path(s) involved and the backend failure
/// that caused it.
#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("Unable to check existence for: {path}")]
    ExistenceCheck {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("Unable to read file from location: {path}")]
    Read {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("Unable to write file at location: {path}")]
    Write {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("Unable to delete file located at: {path}")]
    Delete {
        path: String,
        #[source]
        source: ClientError,
    },

    /// Batches that completed before the failure stay deleted
    #[error("Unable to delete directory located at: {path}")]
    DeleteDirectory {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("Unable to create directory at location: {path}")]
    CreateDirectory {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("Unable to copy file from {source_path} to {destination}")]
    Copy {
        source_path: String,
        destination: String,
        #[source]
        source: ClientError,
    },

    /// The copy succeeded; both source and destination now exist
    #[error("Moved {source_path} to {destination} but could not delete the source")]
    MoveSourceNotDeleted {
        source_path: String,
        destination: String,
        #[source]
        source: ClientError,
    },

    #[error("Unable to retrieve the {attribute} for file at location: {path}")]
    Metadata {
        path: String,
        attribute: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("Unable to set visibility for file {path}")]
    SetVisibility {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("Unable to retrieve the visibility for file at location: {path}")]
    Visibility {
        path: String,
        #[source]
        source: ClientError,
    },

    /// Entries already yielded by the listing remain valid
    #[error("Unable to list contents of: {path}")]
    Listing {
        path: String,
        #[source]
        source: ClientError,
    },

    #[error("Unable to generate temporary url for: {path}")]
    TemporaryUrl {
        path: String,
        #[source]
        source: ClientError,
    },
}

impl FilesystemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FilesystemError::ExistenceCheck { .. } => ErrorKind::ExistenceCheckFailed,
            FilesystemError::Read { .. } => ErrorKind::ReadFailed,
            FilesystemError::Write { .. } => ErrorKind::WriteFailed,
            FilesystemError::Delete { .. } => ErrorKind::DeleteFailed,
            FilesystemError::DeleteDirectory { .. } => ErrorKind::DeleteDirectoryFailed,
            FilesystemError::CreateDirectory { .. } => ErrorKind::CreateDirectoryFailed,
            FilesystemError::Copy { .. } => ErrorKind::CopyFailed,
            FilesystemError::MoveSourceNotDeleted { .. } => ErrorKind::MoveFailed,
            FilesystemError::Metadata { .. } => ErrorKind::MetadataRetrievalFailed,
            FilesystemError::SetVisibility { .. } => ErrorKind::VisibilitySetFailed,
            FilesystemError::Visibility { .. } => ErrorKind::VisibilityRetrievalFailed,
            FilesystemError::Listing { .. } => ErrorKind::ListingFailed,
            FilesystemError::TemporaryUrl { .. } => ErrorKind::UrlGenerationFailed,
        }
    }

    /// Logical path the failure refers to (the source path for copy/move)
    pub fn path(&self) -> &str {
        match self {
            FilesystemError::ExistenceCheck { path, .. }
            | FilesystemError::Read { path, .. }
            | FilesystemError::Write { path, .. }
            | FilesystemError::Delete { path, .. }
            | FilesystemError::DeleteDirectory { path, .. }
            | FilesystemError::CreateDirectory { path, .. }
            | FilesystemError::Metadata { path, .. }
            | FilesystemError::SetVisibility { path, .. }
            | FilesystemError::Visibility { path, .. }
            | FilesystemError::Listing { path, .. }
            | FilesystemError::TemporaryUrl { path, .. } => path,
            FilesystemError::Copy { source_path, .. }
            | FilesystemError::MoveSourceNotDeleted { source_path, .. } => source_path,
        }
    }

    /// The backend failure underneath
    pub fn client_error(&self) -> &ClientError {
        match self {
            FilesystemError::ExistenceCheck { source, .. }
            | FilesystemError::Read { source, .. }
            | FilesystemError::Write { source, .. }
            | FilesystemError::Delete { source, .. }
            | FilesystemError::DeleteDirectory { source, .. }
            | FilesystemError::CreateDirectory { source, .. }
            | FilesystemError::Copy { source, .. }
            | FilesystemError::MoveSourceNotDeleted { source, .. }
            | FilesystemError::Metadata { source, .. }
            | FilesystemError::SetVisibility { source, .. }
            | FilesystemError::Visibility { source, .. }
            | FilesystemError::Listing { source, .. }
            | FilesystemError::TemporaryUrl { source, .. } => source,
        }
    }

    /// Backend error code, e.g. `NoSuchKey`
    pub fn code(&self) -> &str {
        &self.client_error().code
    }
}
