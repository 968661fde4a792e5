// src/registry.rs

//! Registry of installed packages
//!
//! The registry maps each installed (remote, category, package) identity to
//! the version recorded as installed, and tracks which entry owns every
//! installed path. A path is owned by at most one entry.
//!
//! The registry records intended ownership only: it never touches the files
//! themselves. Mutations are expected to come from a single thread.

use crate::db::models::{OwnedFile, Remote};
use crate::db::{self, schema};
use crate::error::{Error, Result};
use crate::index::{PackageRef, VersionRef};
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

pub use crate::db::models::Entry;

/// Persistent store of installed packages
pub struct Registry {
    conn: Connection,
}

impl Registry {
    /// Open (creating if needed) the registry database at `db_path`
    pub fn open(db_path: &str) -> Result<Self> {
        db::init(db_path)?;
        Self::with_connection(db::open(db_path)?)
    }

    /// Open an empty registry that lives only as long as the value
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(db::open_in_memory()?)
    }

    /// Wrap an existing connection, migrating its schema if needed
    pub fn with_connection(conn: Connection) -> Result<Self> {
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Underlying connection, for remotes and settings
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Entry of an index package, or the sentinel if it is not installed
    pub fn get_entry(&self, package: PackageRef<'_>) -> Result<Entry> {
        let entry = Entry::find_by_identity(
            &self.conn,
            package.index().name(),
            package.category().name(),
            package.name(),
        )?;

        Ok(entry.unwrap_or_default())
    }

    /// Entry with the given id, or the sentinel
    pub fn get_entry_by_id(&self, id: i64) -> Result<Entry> {
        Ok(Entry::find_by_id(&self.conn, id)?.unwrap_or_default())
    }

    /// Record `version` as the installed version of its package
    ///
    /// Fails without writing anything when a target path of `version` is
    /// owned by another entry. When `conflicts` is given the offending paths
    /// are appended to it and the sentinel entry is returned; otherwise the
    /// call fails with [`Error::Conflict`].
    ///
    /// Paths owned by the same package (from the previously installed
    /// version) are not conflicts. Paths the new version no longer installs
    /// are released.
    pub fn push(
        &mut self,
        version: VersionRef<'_>,
        conflicts: Option<&mut Vec<String>>,
    ) -> Result<Entry> {
        let package = version.package();

        if version.source_count() == 0 {
            return Err(Error::Validation(format!(
                "version {} of {} has no sources",
                version.name(),
                package.name()
            )));
        }

        // Several sources may target the same path (one per platform)
        let mut files: BTreeMap<String, bool> = BTreeMap::new();
        for source in version.sources() {
            *files.entry(source.target_path()?).or_insert(false) |= source.is_main();
        }

        let result = db::transaction(&mut self.conn, |tx| {
            let existing = Entry::find_by_identity(
                tx,
                package.index().name(),
                package.category().name(),
                package.name(),
            )?
            .unwrap_or_default();

            let mut found = Vec::new();
            for path in files.keys() {
                match OwnedFile::find_owner(tx, path)? {
                    Some(owner) if owner != existing.id => found.push(path.clone()),
                    _ => {}
                }
            }

            if !found.is_empty() {
                return Err(Error::Conflict(found));
            }

            let mut entry = Entry {
                id: existing.id,
                remote: package.index().name().to_string(),
                category: package.category().name().to_string(),
                package: package.name().to_string(),
                description: package.description().to_string(),
                package_type: package.package_type(),
                version: version.name().clone(),
                author: version.author().to_string(),
                pinned: existing.pinned,
            };

            if entry.is_installed() {
                entry.update(tx)?;
                OwnedFile::delete_by_entry(tx, entry.id)?;
            } else {
                entry.insert(tx)?;
            }

            for (path, main) in &files {
                OwnedFile::new(entry.id, path.clone(), *main).insert(tx)?;
            }

            Ok(entry)
        });

        match result {
            Ok(entry) => {
                info!(
                    "Registered {}/{}/{} v{} as entry {} ({} files)",
                    entry.remote,
                    entry.category,
                    entry.package,
                    entry.version,
                    entry.id,
                    files.len()
                );
                Ok(entry)
            }
            Err(Error::Conflict(paths)) => {
                warn!(
                    "Refusing to register {} v{}: {} conflicting file(s)",
                    package.name(),
                    version.name(),
                    paths.len()
                );

                match conflicts {
                    Some(out) => {
                        out.extend(paths);
                        Ok(Entry::default())
                    }
                    None => Err(Error::Conflict(paths)),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Remove an entry and release every path it owns
    pub fn forget(&mut self, entry: &Entry) -> Result<()> {
        if !entry.is_installed() {
            return Ok(());
        }

        db::transaction(&mut self.conn, |tx| {
            OwnedFile::delete_by_entry(tx, entry.id)?;
            Entry::delete(tx, entry.id)
        })?;

        info!(
            "Forgot {}/{}/{} (entry {})",
            entry.remote, entry.category, entry.package, entry.id
        );
        Ok(())
    }

    /// Remove a remote and forget every entry installed from it
    ///
    /// Either everything is removed or nothing is. Returns the number of
    /// entries forgotten.
    pub fn forget_remote(&mut self, remote: &str) -> Result<usize> {
        let count = db::transaction(&mut self.conn, |tx| {
            let entries = Entry::find_by_remote(tx, remote)?;
            for entry in &entries {
                OwnedFile::delete_by_entry(tx, entry.id)?;
                Entry::delete(tx, entry.id)?;
            }
            Remote::delete(tx, remote)?;
            Ok(entries.len())
        })?;

        info!("Removed remote '{}' and forgot {} entries", remote, count);
        Ok(count)
    }

    /// All entries of a remote, by ascending id
    pub fn get_entries(&self, remote: &str) -> Result<Vec<Entry>> {
        Entry::find_by_remote(&self.conn, remote)
    }

    /// Paths currently owned by an entry; empty for the sentinel
    pub fn get_files(&self, entry: &Entry) -> Result<BTreeSet<String>> {
        if !entry.is_installed() {
            return Ok(BTreeSet::new());
        }

        let files = OwnedFile::find_by_entry(&self.conn, entry.id)?;
        Ok(files.into_iter().map(|f| f.path).collect())
    }

    /// Path of the entry's main file, or an empty string
    pub fn get_main_file(&self, entry: &Entry) -> Result<String> {
        if !entry.is_installed() {
            return Ok(String::new());
        }

        Ok(OwnedFile::find_main(&self.conn, entry.id)?.unwrap_or_default())
    }

    /// Pin or unpin an installed entry
    pub fn set_pinned(&mut self, entry: &Entry, pinned: bool) -> Result<()> {
        if !entry.is_installed() {
            return Err(Error::Validation(format!(
                "{} is not installed",
                entry.package
            )));
        }

        debug!("Setting pinned={} on entry {}", pinned, entry.id);
        Entry::set_pinned(&self.conn, entry.id, pinned)
    }
}
