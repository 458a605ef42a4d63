//! Directory emulation over a flat key space
//!
//! A directory is a naming convention, not a backend entity: it exists when
//! its zero-byte marker (`path/`) exists or when any key lives under it.
//!
//! Recursive deletion lists the directory flat (no delimiter), so nested
//! objects and nested markers arrive in the same pages, and deletes each page
//! in batches of at most [`DELETE_BATCH_LIMIT`] keys. Should a backend still
//! report common prefixes, they are queued and listed as well; keys seen twice
//! that way are deleted twice, which backends treat as a no-op.

use crate::core::client::{ClientError, ListRequest, ObjectClient, DELETE_BATCH_LIMIT, DELIMITER};
use crate::core::error::{FilesystemError, Result};
use crate::core::listing::ListingEngine;
use crate::core::options::Config;
use crate::core::scope::StoreScope;
use crate::core::visibility::{Visibility, VisibilityConverter};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};

/// Directory existence, creation and recursive deletion
pub struct DirectoryOperations<'a, C: ?Sized> {
    scope: StoreScope<'a, C>,
    listing: &'a ListingEngine<'a, C>,
    converter: &'a VisibilityConverter,
    default_visibility: Option<Visibility>,
}

impl<'a, C: ObjectClient + ?Sized> DirectoryOperations<'a, C> {
    pub fn new(
        scope: StoreScope<'a, C>,
        listing: &'a ListingEngine<'a, C>,
        converter: &'a VisibilityConverter,
        default_visibility: Option<Visibility>,
    ) -> Self {
        DirectoryOperations {
            scope,
            listing,
            converter,
            default_visibility,
        }
    }

    /// Whether the directory marker, or any key below the directory, exists
    pub fn exists(&self, path: &str) -> Result<bool> {
        // The adapter root exists whether or not anything lives under it
        if path.trim_matches('/').is_empty() {
            return Ok(true);
        }
        let key = self.scope.prefixer.prefix_directory_path(path);

        let check = || -> std::result::Result<bool, ClientError> {
            let options = self.scope.options.options();
            if self.scope.client.object_exists(self.scope.bucket, &key, options)? {
                return Ok(true);
            }
            let probe = ListRequest {
                prefix: key.clone(),
                marker: None,
                delimiter: DELIMITER.to_string(),
                max_keys: 1,
            };
            let page = self
                .scope
                .client
                .list_objects(self.scope.bucket, &probe, options)?;
            Ok(!page.objects.is_empty() || !page.common_prefixes.is_empty())
        };

        check().map_err(|source| FilesystemError::ExistenceCheck {
            path: path.to_string(),
            source,
        })
    }

    /// Write the zero-byte marker; creating an existing directory succeeds
    pub fn create(&self, path: &str, config: &Config) -> Result<()> {
        let key = self.scope.prefixer.prefix_directory_path(path);
        if key.is_empty() {
            return Ok(());
        }

        let options = match (config.visibility, self.default_visibility) {
            (None, Some(visibility)) => {
                let config = config.clone().with_visibility(visibility);
                self.scope.options.merge_config(&config, self.converter)
            }
            _ => self.scope.options.merge_config(config, self.converter),
        };

        self.scope
            .client
            .put_object(self.scope.bucket, &key, &[], &options)
            .map_err(|source| FilesystemError::CreateDirectory {
                path: path.to_string(),
                source,
            })?;

        info!("Directory created: {}", key);
        Ok(())
    }

    /// Delete every key under the directory, including its marker
    ///
    /// A missing directory is a no-op. On failure, batches already sent stay
    /// deleted.
    pub fn delete(&self, path: &str) -> Result<()> {
        let root = self.scope.prefixer.prefix_directory_path(path);
        let fail = |source: ClientError| FilesystemError::DeleteDirectory {
            path: path.to_string(),
            source,
        };

        let mut worklist = VecDeque::from([root.clone()]);
        let mut visited: HashSet<String> = HashSet::from([root]);
        let mut deleted = 0usize;
        let mut batches = 0usize;

        while let Some(prefix) = worklist.pop_front() {
            for page in self.listing.pages(prefix.clone(), "") {
                let page = page.map_err(fail)?;

                let keys: Vec<String> = page.objects.into_iter().map(|o| o.key).collect();
                for batch in keys.chunks(DELETE_BATCH_LIMIT) {
                    debug!("Deleting batch of {} keys under {}", batch.len(), prefix);
                    self.scope
                        .client
                        .delete_objects(self.scope.bucket, batch, self.scope.options.options())
                        .map_err(fail)?;
                    deleted += batch.len();
                    batches += 1;
                }

                for common in page.common_prefixes {
                    if common != prefix && visited.insert(common.clone()) {
                        worklist.push_back(common);
                    }
                }
            }
        }

        info!(
            "Directory deleted: {} ({} keys in {} batches)",
            path, deleted, batches
        );
        Ok(())
    }
}
