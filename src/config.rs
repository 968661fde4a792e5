// src/config.rs

//! User preferences
//!
//! Preferences live in the `settings` table next to the registry, so a single
//! database file holds all state. They are passed explicitly to the code that
//! needs them.

use crate::db::models::Setting;
use crate::error::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PRE_RELEASES_KEY: &str = "install.pre_releases";
const SHOW_OBSOLETE_KEY: &str = "browser.show_obsolete";

/// Options affecting which versions are offered and which rows are listed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallOptions {
    /// Offer pre-release versions as upgrade targets
    pub pre_releases: bool,
    /// List installed packages no longer present in their remote's index
    pub show_obsolete: bool,
}

impl InstallOptions {
    /// Load preferences, using defaults for unset keys
    pub fn load(conn: &Connection) -> Result<Self> {
        let defaults = Self::default();

        let options = Self {
            pre_releases: read_bool(conn, PRE_RELEASES_KEY)?.unwrap_or(defaults.pre_releases),
            show_obsolete: read_bool(conn, SHOW_OBSOLETE_KEY)?.unwrap_or(defaults.show_obsolete),
        };

        debug!("Loaded install options: {:?}", options);
        Ok(options)
    }

    pub fn save(&self, conn: &Connection) -> Result<()> {
        Setting::set(conn, PRE_RELEASES_KEY, bool_str(self.pre_releases))?;
        Setting::set(conn, SHOW_OBSOLETE_KEY, bool_str(self.show_obsolete))?;
        Ok(())
    }
}

fn read_bool(conn: &Connection, key: &str) -> Result<Option<bool>> {
    Ok(Setting::get(conn, key)?.map(|v| matches!(v.as_str(), "1" | "true" | "yes")))
}

fn bool_str(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_defaults_when_unset() {
        let conn = db::open_in_memory().unwrap();
        assert_eq!(InstallOptions::load(&conn).unwrap(), InstallOptions::default());
    }

    #[test]
    fn test_save_and_load() {
        let conn = db::open_in_memory().unwrap();

        let options = InstallOptions {
            pre_releases: true,
            show_obsolete: false,
        };
        options.save(&conn).unwrap();
        assert_eq!(InstallOptions::load(&conn).unwrap(), options);

        Setting::set(&conn, SHOW_OBSOLETE_KEY, "true").unwrap();
        assert!(InstallOptions::load(&conn).unwrap().show_obsolete);
    }
}
