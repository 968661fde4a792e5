// src/db/models.rs

//! Data models for ReaPack database entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating, reading, updating, and deleting records.

use crate::error::{Error, Result};
use crate::index::PackageType;
use crate::version::VersionName;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

/// Registry record of one installed package
///
/// An entry with `id == 0` is the "not installed" sentinel returned by lookups
/// that find nothing; it never exists in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub remote: String,
    pub category: String,
    pub package: String,
    pub description: String,
    pub package_type: PackageType,
    pub version: VersionName,
    pub author: String,
    pub pinned: bool,
}

const ENTRY_COLUMNS: &str =
    "id, remote, category, package, description, type, version, author, pinned";

impl Entry {
    /// Whether this entry designates an installed package
    pub fn is_installed(&self) -> bool {
        self.id != 0
    }

    /// Insert this entry, assigning the next unused id
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO entries (remote, category, package, description, type, version, author, pinned)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &self.remote,
                &self.category,
                &self.package,
                &self.description,
                self.package_type.code(),
                self.version.code(),
                &self.author,
                self.pinned,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = id;
        Ok(id)
    }

    /// Rewrite the stored fields of an existing entry
    pub fn update(&self, conn: &Connection) -> Result<()> {
        if !self.is_installed() {
            return Err(Error::Validation("cannot update an entry without id".to_string()));
        }

        conn.execute(
            "UPDATE entries
             SET remote = ?1, category = ?2, package = ?3, description = ?4,
                 type = ?5, version = ?6, author = ?7, pinned = ?8
             WHERE id = ?9",
            params![
                &self.remote,
                &self.category,
                &self.package,
                &self.description,
                self.package_type.code(),
                self.version.code(),
                &self.author,
                self.pinned,
                self.id,
            ],
        )?;

        Ok(())
    }

    /// Find an entry by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS))?;

        let entry = stmt.query_row([id], Self::from_row).optional()?;

        Ok(entry)
    }

    /// Find the entry of a (remote, category, package) identity
    pub fn find_by_identity(
        conn: &Connection,
        remote: &str,
        category: &str,
        package: &str,
    ) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entries WHERE remote = ?1 AND category = ?2 AND package = ?3",
            ENTRY_COLUMNS
        ))?;

        let entry = stmt
            .query_row(params![remote, category, package], Self::from_row)
            .optional()?;

        Ok(entry)
    }

    /// All entries of a remote, by ascending id
    pub fn find_by_remote(conn: &Connection, remote: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entries WHERE remote = ?1 ORDER BY id",
            ENTRY_COLUMNS
        ))?;

        let entries = stmt
            .query_map([remote], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// List all entries
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM entries ORDER BY id", ENTRY_COLUMNS))?;

        let entries = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub fn set_pinned(conn: &Connection, id: i64, pinned: bool) -> Result<()> {
        conn.execute(
            "UPDATE entries SET pinned = ?1 WHERE id = ?2",
            params![pinned, id],
        )?;
        Ok(())
    }

    /// Delete an entry by ID
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM entries WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Convert a database row to an Entry
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let code: i64 = row.get(6)?;
        let version = VersionName::from_code(code).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Integer,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    e.to_string(),
                )),
            )
        })?;

        Ok(Self {
            id: row.get(0)?,
            remote: row.get(1)?,
            category: row.get(2)?,
            package: row.get(3)?,
            description: row.get(4)?,
            package_type: PackageType::from_code(row.get(5)?),
            version,
            author: row.get(7)?,
            pinned: row.get(8)?,
        })
    }
}

/// Ownership of one installed path
#[derive(Debug, Clone)]
pub struct OwnedFile {
    pub id: Option<i64>,
    pub entry_id: i64,
    pub path: String,
    pub main: bool,
}

impl OwnedFile {
    pub fn new(entry_id: i64, path: String, main: bool) -> Self {
        Self {
            id: None,
            entry_id,
            path,
            main,
        }
    }

    /// Insert this file into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO files (entry, path, main) VALUES (?1, ?2, ?3)",
            params![self.entry_id, &self.path, self.main],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Id of the entry owning `path`, if any
    pub fn find_owner(conn: &Connection, path: &str) -> Result<Option<i64>> {
        let owner = conn
            .query_row("SELECT entry FROM files WHERE path = ?1", [path], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(owner)
    }

    /// Find all files belonging to an entry
    pub fn find_by_entry(conn: &Connection, entry_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, entry, path, main FROM files WHERE entry = ?1 ORDER BY path",
        )?;

        let files = stmt
            .query_map([entry_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Path of the main file of an entry
    pub fn find_main(conn: &Connection, entry_id: i64) -> Result<Option<String>> {
        let path = conn
            .query_row(
                "SELECT path FROM files WHERE entry = ?1 AND main = 1 ORDER BY id LIMIT 1",
                [entry_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(path)
    }

    /// Release every path owned by an entry
    pub fn delete_by_entry(conn: &Connection, entry_id: i64) -> Result<()> {
        conn.execute("DELETE FROM files WHERE entry = ?1", [entry_id])?;
        Ok(())
    }

    /// Convert a database row to an OwnedFile
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            entry_id: row.get(1)?,
            path: row.get(2)?,
            main: row.get(3)?,
        })
    }
}

/// A configured package source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub url: String,
    pub protected: bool,
    pub enabled: bool,
}

impl Remote {
    /// Create a new, enabled and unprotected Remote
    pub fn new(name: String, url: String) -> Self {
        Self {
            name,
            url,
            protected: false,
            enabled: true,
        }
    }

    /// Check that a name can be used as a remote (and cache file) name
    pub fn validate_name(name: &str) -> Result<()> {
        const RESERVED: &[char] = &['~', '#', '%', '&', '*', '{', '}', '\\', ':', '<', '>', '?', '/', '+', '|', '"'];

        if name.trim().is_empty() {
            return Err(Error::Validation("empty remote name".to_string()));
        }
        if name.starts_with('.') || name.contains(RESERVED) {
            return Err(Error::Validation(format!("invalid remote name '{}'", name)));
        }

        Ok(())
    }

    /// Insert this remote into the database
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        Self::validate_name(&self.name)?;
        if self.url.is_empty() {
            return Err(Error::Validation(format!("remote '{}' has no url", self.name)));
        }

        conn.execute(
            "INSERT INTO remotes (name, url, protected, enabled) VALUES (?1, ?2, ?3, ?4)",
            params![&self.name, &self.url, self.protected, self.enabled],
        )?;

        Ok(())
    }

    /// Find a remote by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, url, protected, enabled FROM remotes WHERE name = ?1",
        )?;

        let remote = stmt.query_row([name], Self::from_row).optional()?;

        Ok(remote)
    }

    /// List all remotes
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT name, url, protected, enabled FROM remotes ORDER BY name")?;

        let remotes = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(remotes)
    }

    /// List enabled remotes
    pub fn list_enabled(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, url, protected, enabled FROM remotes WHERE enabled = 1 ORDER BY name",
        )?;

        let remotes = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(remotes)
    }

    /// Update url and flags
    pub fn update(&self, conn: &Connection) -> Result<()> {
        let changed = conn.execute(
            "UPDATE remotes SET url = ?1, protected = ?2, enabled = ?3 WHERE name = ?4",
            params![&self.url, self.protected, self.enabled, &self.name],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("remote '{}'", self.name)));
        }

        Ok(())
    }

    /// Delete a remote by name
    pub fn delete(conn: &Connection, name: &str) -> Result<()> {
        conn.execute("DELETE FROM remotes WHERE name = ?1", [name])?;
        Ok(())
    }

    /// Convert a database row to a Remote
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            url: row.get(1)?,
            protected: row.get(2)?,
            enabled: row.get(3)?,
        })
    }
}

/// Key/value user preference
pub struct Setting;

impl Setting {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        let value = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(value)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}
