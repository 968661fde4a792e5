// src/browser.rs

//! Rows of the package browser
//!
//! A [`BrowserEntry`] joins an index package (if the remote still publishes
//! it) with its registry entry (if it is installed). Entries are rebuilt on
//! every query and never modify the registry or the catalog.

use crate::catalog::Catalog;
use crate::config::InstallOptions;
use crate::db::models::{Entry, Remote};
use crate::error::Result;
use crate::index::package::{display_author, display_name};
use crate::index::{PackageRef, PackageType, VersionRef};
use crate::registry::Registry;
use crate::version::VersionName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// One browser row
#[derive(Debug, Clone)]
pub struct BrowserEntry<'a> {
    entry: Entry,
    package: Option<PackageRef<'a>>,
    current: Option<VersionRef<'a>>,
    latest: Option<VersionRef<'a>>,
    installed: bool,
    out_of_date: bool,
    obsolete: bool,
}

/// Which actions the browser may offer for an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Actions {
    /// Install the latest version (or update to it)
    pub install_latest: bool,
    pub reinstall: bool,
    /// Choose a specific version
    pub versions: bool,
    pub pin: bool,
    pub uninstall: bool,
    pub about_package: bool,
}

/// Display columns of a browser row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub state: String,
    pub name: String,
    pub category: String,
    pub version: String,
    pub author: String,
    pub package_type: String,
    pub remote: String,
    pub last_update: String,
}

impl<'a> BrowserEntry<'a> {
    /// Row for a package present in an index
    pub fn new(package: PackageRef<'a>, entry: Entry, options: &InstallOptions) -> Self {
        let mut latest = package.last_version(options.pre_releases, &entry.version);
        let mut current = None;
        let mut out_of_date = false;
        let installed = entry.is_installed();

        if installed {
            if let Some(latest) = latest {
                out_of_date = &entry.version < latest.name();
            }
            current = package.find_version(&entry.version);
        }

        // Show the newest pre-release when no stable version exists, or the
        // newest version when all are older than the installed one
        if latest.is_none() {
            latest = package.last_version(true, &VersionName::default());
        }

        Self {
            entry,
            package: Some(package),
            current,
            latest,
            installed,
            out_of_date,
            obsolete: false,
        }
    }

    /// Row for an installed package its remote no longer publishes
    pub fn obsolete(entry: Entry) -> Self {
        Self {
            entry,
            package: None,
            current: None,
            latest: None,
            installed: true,
            out_of_date: false,
            obsolete: true,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn is_uninstalled(&self) -> bool {
        !self.installed
    }

    pub fn is_out_of_date(&self) -> bool {
        self.out_of_date
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn package(&self) -> Option<PackageRef<'a>> {
        self.package
    }

    /// Installed version, when the index still publishes it
    pub fn current(&self) -> Option<VersionRef<'a>> {
        self.current
    }

    pub fn latest(&self) -> Option<VersionRef<'a>> {
        self.latest
    }

    pub fn remote_name(&self) -> &str {
        match self.package {
            Some(package) => package.index().name(),
            None => &self.entry.remote,
        }
    }

    pub fn category_name(&self) -> &str {
        match self.package {
            Some(package) => package.category().name(),
            None => &self.entry.category,
        }
    }

    pub fn package_name(&self) -> &str {
        match self.package {
            Some(package) => package.name(),
            None => &self.entry.package,
        }
    }

    pub fn display_name(&self) -> &str {
        match self.package {
            Some(package) => package.get().display_name(),
            None => display_name(&self.entry.package, &self.entry.description),
        }
    }

    pub fn package_type(&self) -> PackageType {
        match self.package {
            Some(package) => package.package_type(),
            None => self.entry.package_type,
        }
    }

    pub fn display_type(&self) -> &str {
        match self.package {
            Some(package) if !package.type_name().is_empty()
                && package.package_type() == PackageType::Unknown =>
            {
                package.get().type_name()
            }
            _ => self.package_type().display_name(),
        }
    }

    /// Installed version followed by the latest one in parentheses when newer
    pub fn display_version(&self) -> String {
        let mut display = String::new();

        if self.installed {
            display = self.entry.version.to_string();
        }

        if let Some(latest) = self.latest {
            if !self.installed || latest.name() > &self.entry.version {
                if !display.is_empty() {
                    display.push(' ');
                }
                display.push_str(&format!("({})", latest.name()));
            }
        }

        display
    }

    /// Version used when sorting by the version column
    pub fn sort_version(&self) -> Option<&VersionName> {
        if self.installed {
            Some(&self.entry.version)
        } else {
            self.latest.map(|v| v.name())
        }
    }

    pub fn display_author(&self) -> &str {
        match self.latest {
            Some(latest) => latest.get().display_author(),
            None => display_author(&self.entry.author),
        }
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.latest.and_then(|v| v.time())
    }

    /// State glyphs: `o` obsolete, `u` out of date, `i` installed, then `p`
    /// when pinned
    pub fn display_state(&self) -> String {
        let mut state = String::new();

        state.push(if self.obsolete {
            'o'
        } else if self.out_of_date {
            'u'
        } else if self.installed {
            'i'
        } else {
            ' '
        });

        if self.entry.pinned {
            state.push('p');
        }

        state
    }

    pub fn row(&self) -> Row {
        Row {
            state: self.display_state(),
            name: self.display_name().to_string(),
            category: self.category_name().to_string(),
            version: self.display_version(),
            author: self.display_author().to_string(),
            package_type: self.display_type().to_string(),
            remote: self.remote_name().to_string(),
            last_update: self
                .last_update()
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }

    /// Actions available for this entry given its remote
    pub fn actions(&self, remote: &Remote) -> Actions {
        Actions {
            install_latest: self.latest.is_some() && (!self.installed || self.out_of_date),
            reinstall: self.installed && !self.obsolete && self.current.is_some(),
            versions: !self.obsolete,
            pin: self.installed,
            uninstall: self.installed && !remote.protected,
            about_package: !self.obsolete,
        }
    }
}

impl PartialEq for BrowserEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.remote_name() == other.remote_name()
            && self.category_name() == other.category_name()
            && self.package_name() == other.package_name()
    }
}

/// Build one row per catalog package, plus obsolete rows when enabled
///
/// Obsolete rows are only produced for remotes present in the catalog.
pub fn populate<'a>(
    catalog: &'a Catalog,
    registry: &Registry,
    options: &InstallOptions,
) -> Result<Vec<BrowserEntry<'a>>> {
    let mut list = Vec::new();

    for index in catalog.iter() {
        let mut seen = HashSet::new();

        for package in index.packages() {
            let entry = registry.get_entry(package)?;
            if entry.is_installed() {
                seen.insert(entry.id);
            }
            list.push(BrowserEntry::new(package, entry, options));
        }

        if options.show_obsolete {
            for entry in registry.get_entries(index.name())? {
                if !seen.contains(&entry.id) {
                    list.push(BrowserEntry::obsolete(entry));
                }
            }
        }
    }

    debug!("Populated browser with {} entries", list.len());
    Ok(list)
}
