// src/catalog.rs

//! Loaded indexes, one per remote
//!
//! Each remote's index is held as an `Arc<RemoteIndex>`. Reloading a remote
//! swaps in a new tree; anyone still holding the previous `Arc` keeps reading
//! the old tree until they drop it. A failed reload leaves the previous tree
//! (and every other remote) untouched.

use crate::error::{Error, Result};
use crate::index::RemoteIndex;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Set of parsed indexes keyed by remote name
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    indexes: BTreeMap<String, Arc<RemoteIndex>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location of a remote's cached index file
    pub fn index_path(cache_dir: &Path, remote: &str) -> PathBuf {
        cache_dir.join(format!("{}.xml", remote))
    }

    /// Add or replace an index, returning the one it replaces
    pub fn insert(&mut self, index: RemoteIndex) -> Option<Arc<RemoteIndex>> {
        self.indexes
            .insert(index.name().to_string(), Arc::new(index))
    }

    /// Parse and insert index data for a remote
    ///
    /// On failure the previously loaded index, if any, stays in place.
    pub fn load(&mut self, remote: &str, xml: &str) -> Result<Arc<RemoteIndex>> {
        match RemoteIndex::load(remote, xml) {
            Ok(index) => {
                self.insert(index);
                self.get(remote)
                    .ok_or_else(|| Error::NotFound(format!("index '{}'", remote)))
            }
            Err(e) => {
                warn!("Keeping previous index of '{}': {}", remote, e);
                Err(e)
            }
        }
    }

    /// Parse the cached index files of several remotes in parallel
    ///
    /// Successfully parsed indexes are inserted; failures are returned with
    /// the name of their remote.
    pub fn load_dir(&mut self, cache_dir: &Path, remotes: &[String]) -> Vec<(String, Error)> {
        debug!(
            "Loading {} index file(s) from {}",
            remotes.len(),
            cache_dir.display()
        );

        let results: Vec<(String, Result<RemoteIndex>)> = remotes
            .par_iter()
            .map(|name| {
                let path = Self::index_path(cache_dir, name);
                (name.clone(), RemoteIndex::load_file(name, &path))
            })
            .collect();

        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(index) => {
                    self.insert(index);
                }
                Err(e) => {
                    warn!("Could not load index of '{}': {}", name, e);
                    failures.push((name, e));
                }
            }
        }

        info!("{} index(es) loaded", self.indexes.len());
        failures
    }

    pub fn get(&self, remote: &str) -> Option<Arc<RemoteIndex>> {
        self.indexes.get(remote).cloned()
    }

    pub fn remove(&mut self, remote: &str) -> Option<Arc<RemoteIndex>> {
        self.indexes.remove(remote)
    }

    /// Indexes ordered by remote name
    pub fn iter(&self) -> impl Iterator<Item = &RemoteIndex> {
        self.indexes.values().map(|i| i.as_ref())
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}
