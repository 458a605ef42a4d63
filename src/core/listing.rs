//! Paginated, optionally recursive enumeration of a directory
//!
//! ## Traversal
//!
//! - **Shallow**: one delimited listing of the directory key; objects become
//!   files (or directory markers), common prefixes become directories.
//! - **Deep, flat** ([`TraversalMode::Flat`]): one listing with an empty
//!   delimiter, so the backend returns every nested key in a single flat
//!   key space.
//! - **Deep, walk** ([`TraversalMode::Walk`]): a delimited listing per level.
//!   Each common prefix is reported as a directory and queued on an explicit
//!   worklist, so tree depth never turns into call-stack depth.
//!
//! Either way, common prefixes the backend returns during a deep listing are
//! descended into, except a prefix equal to the one being listed.
//!
//! [`Listing`] is lazy: each `next()` may issue one page request. Nothing is
//! cached between listings.

use crate::core::attributes::{self, StorageAttributes};
use crate::core::client::{ClientError, ListPage, ListRequest, ObjectClient, DELIMITER, MAX_LIST_KEYS};
use crate::core::error::{FilesystemError, Result};
use crate::core::scope::StoreScope;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::iter::FusedIterator;
use tracing::{debug, warn};

/// How deep listings traverse the key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    /// Single listing without delimiter
    #[default]
    Flat,
    /// Delimited listing per directory level
    Walk,
}

/// Listing tunables, fixed at adapter construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSettings {
    page_size: usize,
    pub traversal: TraversalMode,
}

impl ListingSettings {
    /// `page_size` is clamped to `1..=1000`
    pub fn new(page_size: usize, traversal: TraversalMode) -> Self {
        ListingSettings {
            page_size: page_size.clamp(1, MAX_LIST_KEYS),
            traversal,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl Default for ListingSettings {
    fn default() -> Self {
        ListingSettings::new(MAX_LIST_KEYS, TraversalMode::default())
    }
}

/// Pages of one prefix, following continuation markers until the backend
/// reports the listing is complete
pub struct PageWalk<'a, C: ?Sized> {
    scope: StoreScope<'a, C>,
    prefix: String,
    delimiter: &'static str,
    page_size: usize,
    marker: Option<String>,
    finished: bool,
}

impl<'a, C: ObjectClient + ?Sized> PageWalk<'a, C> {
    pub fn new(
        scope: StoreScope<'a, C>,
        prefix: String,
        delimiter: &'static str,
        page_size: usize,
    ) -> Self {
        PageWalk {
            scope,
            prefix,
            delimiter,
            page_size,
            marker: None,
            finished: false,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl<C: ObjectClient + ?Sized> Iterator for PageWalk<'_, C> {
    type Item = std::result::Result<ListPage, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let request = ListRequest {
            prefix: self.prefix.clone(),
            marker: self.marker.clone(),
            delimiter: self.delimiter.to_string(),
            max_keys: self.page_size,
        };
        debug!(
            "Listing prefix '{}' (marker: {:?}, delimiter: '{}')",
            request.prefix, request.marker, request.delimiter
        );

        let page = match self
            .scope
            .client
            .list_objects(self.scope.bucket, &request, self.scope.options.options())
        {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        match page.continuation() {
            Some(next) if self.marker.as_deref() == Some(next.as_str()) => {
                warn!(
                    "Listing of '{}' stalled at marker '{}', stopping",
                    self.prefix, next
                );
                self.finished = true;
            }
            Some(next) => self.marker = Some(next),
            None => self.finished = true,
        }

        Some(Ok(page))
    }
}

impl<C: ObjectClient + ?Sized> FusedIterator for PageWalk<'_, C> {}

/// Lazy listing of a directory
///
/// Yields entries in backend order per page. After an error the sequence
/// ends; entries already yielded stay valid.
pub struct Listing<'a, C: ?Sized> {
    scope: StoreScope<'a, C>,
    path: String,
    recursive: bool,
    settings: ListingSettings,
    current: Option<PageWalk<'a, C>>,
    pending: VecDeque<String>,
    visited: HashSet<String>,
    buffer: VecDeque<StorageAttributes>,
    done: bool,
}

impl<'a, C: ObjectClient + ?Sized> Listing<'a, C> {
    fn new(
        scope: StoreScope<'a, C>,
        path: &str,
        recursive: bool,
        settings: ListingSettings,
    ) -> Self {
        let root = scope.prefixer.prefix_directory_path(path);
        let mut visited = HashSet::new();
        visited.insert(root.clone());
        Listing {
            scope,
            path: path.to_string(),
            recursive,
            settings,
            current: None,
            pending: VecDeque::from([root]),
            visited,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    fn delimiter(&self) -> &'static str {
        if self.recursive && self.settings.traversal == TraversalMode::Flat {
            ""
        } else {
            DELIMITER
        }
    }

    fn absorb(&mut self, prefix: &str, page: ListPage) {
        for object in &page.objects {
            // The directory's own marker is not part of its contents
            if object.key == prefix {
                continue;
            }
            self.buffer
                .push_back(attributes::from_summary(self.scope.prefixer, object));
        }

        for common in page.common_prefixes {
            if common == prefix {
                continue;
            }
            self.buffer
                .push_back(attributes::from_common_prefix(self.scope.prefixer, &common));
            if self.recursive && self.visited.insert(common.clone()) {
                self.pending.push_back(common);
            }
        }
    }
}

impl<C: ObjectClient + ?Sized> Iterator for Listing<'_, C> {
    type Item = Result<StorageAttributes>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.done {
                return None;
            }

            if self.current.is_none() {
                match self.pending.pop_front() {
                    Some(prefix) => {
                        let delimiter = self.delimiter();
                        self.current = Some(PageWalk::new(
                            self.scope,
                            prefix,
                            delimiter,
                            self.settings.page_size(),
                        ));
                    }
                    None => {
                        self.done = true;
                        return None;
                    }
                }
            }

            let (prefix, step) = match self.current.as_mut() {
                Some(walk) => (walk.prefix().to_string(), walk.next()),
                None => continue,
            };

            match step {
                Some(Ok(page)) => self.absorb(&prefix, page),
                Some(Err(source)) => {
                    self.done = true;
                    self.current = None;
                    self.pending.clear();
                    return Some(Err(FilesystemError::Listing {
                        path: self.path.clone(),
                        source,
                    }));
                }
                None => self.current = None,
            }
        }
    }
}

impl<C: ObjectClient + ?Sized> FusedIterator for Listing<'_, C> {}

/// Entry point for listings under one adapter configuration
pub struct ListingEngine<'a, C: ?Sized> {
    scope: StoreScope<'a, C>,
    settings: ListingSettings,
}

impl<'a, C: ObjectClient + ?Sized> ListingEngine<'a, C> {
    pub fn new(scope: StoreScope<'a, C>, settings: ListingSettings) -> Self {
        ListingEngine { scope, settings }
    }

    /// Lazily list the contents of `path`
    pub fn list(&self, path: &str, recursive: bool) -> Listing<'a, C> {
        Listing::new(self.scope, path, recursive, self.settings)
    }

    /// Raw pages under a storage prefix
    pub fn pages(&self, prefix: String, delimiter: &'static str) -> PageWalk<'a, C> {
        PageWalk::new(self.scope, prefix, delimiter, self.settings.page_size())
    }
}
