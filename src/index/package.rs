// src/index/package.rs

//! Packages and their versions

use super::source::{Source, SourceRef};
use super::{CategoryRef, RemoteIndex};
use crate::error::{Error, Result};
use crate::version::VersionName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Deref;

/// Type of package, deciding where its files are installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    #[default]
    Unknown,
    Script,
    Extension,
    Effect,
    Data,
    Theme,
    LangPack,
    WebInterface,
    ProjectTemplate,
    TrackTemplate,
    MidiNoteNames,
    AutomationItem,
}

impl PackageType {
    /// Name used by the `type` attribute of index files
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Unknown => "",
            PackageType::Script => "script",
            PackageType::Extension => "extension",
            PackageType::Effect => "effect",
            PackageType::Data => "data",
            PackageType::Theme => "theme",
            PackageType::LangPack => "langpack",
            PackageType::WebInterface => "webinterface",
            PackageType::ProjectTemplate => "projecttpl",
            PackageType::TrackTemplate => "tracktpl",
            PackageType::MidiNoteNames => "midinotenames",
            PackageType::AutomationItem => "autoitem",
        }
    }

    /// Parse an index `type` attribute; unrecognized values are `Unknown`
    pub fn from_index_name(name: &str) -> Self {
        match name {
            "script" => PackageType::Script,
            "extension" => PackageType::Extension,
            "effect" => PackageType::Effect,
            "data" => PackageType::Data,
            "theme" => PackageType::Theme,
            "langpack" => PackageType::LangPack,
            "webinterface" => PackageType::WebInterface,
            "projecttpl" => PackageType::ProjectTemplate,
            "tracktpl" => PackageType::TrackTemplate,
            "midinotenames" => PackageType::MidiNoteNames,
            "autoitem" => PackageType::AutomationItem,
            _ => PackageType::Unknown,
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            PackageType::Unknown => "Unknown",
            PackageType::Script => "Script",
            PackageType::Extension => "Extension",
            PackageType::Effect => "Effect",
            PackageType::Data => "Data",
            PackageType::Theme => "Theme",
            PackageType::LangPack => "Language Pack",
            PackageType::WebInterface => "Web Interface",
            PackageType::ProjectTemplate => "Project Template",
            PackageType::TrackTemplate => "Track Template",
            PackageType::MidiNoteNames => "MIDI Note Names",
            PackageType::AutomationItem => "Automation Item",
        }
    }

    /// Integer code stored in the registry
    pub fn code(&self) -> i64 {
        match self {
            PackageType::Unknown => 0,
            PackageType::Script => 1,
            PackageType::Extension => 2,
            PackageType::Effect => 3,
            PackageType::Data => 4,
            PackageType::Theme => 5,
            PackageType::LangPack => 6,
            PackageType::WebInterface => 7,
            PackageType::ProjectTemplate => 8,
            PackageType::TrackTemplate => 9,
            PackageType::MidiNoteNames => 10,
            PackageType::AutomationItem => 11,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => PackageType::Script,
            2 => PackageType::Extension,
            3 => PackageType::Effect,
            4 => PackageType::Data,
            5 => PackageType::Theme,
            6 => PackageType::LangPack,
            7 => PackageType::WebInterface,
            8 => PackageType::ProjectTemplate,
            9 => PackageType::TrackTemplate,
            10 => PackageType::MidiNoteNames,
            11 => PackageType::AutomationItem,
            _ => PackageType::Unknown,
        }
    }

    /// Installation root, relative to the host's resource directory
    ///
    /// Scoped types install below `<root>/<remote>/<category>`.
    fn root(&self) -> Option<(&'static str, bool)> {
        match self {
            PackageType::Script => Some(("Scripts", true)),
            PackageType::Effect => Some(("Effects", true)),
            PackageType::AutomationItem => Some(("AutomationItems", true)),
            PackageType::Extension => Some(("UserPlugins", false)),
            PackageType::Data => Some(("Data", false)),
            PackageType::Theme => Some(("ColorThemes", false)),
            PackageType::LangPack => Some(("LangPack", false)),
            PackageType::WebInterface => Some(("reaper_www_root", false)),
            PackageType::ProjectTemplate => Some(("ProjectTemplates", false)),
            PackageType::TrackTemplate => Some(("TrackTemplates", false)),
            PackageType::MidiNoteNames => Some(("MIDINoteNames", false)),
            PackageType::Unknown => None,
        }
    }
}

/// An installable unit published in a category
#[derive(Debug, Clone)]
pub struct Package {
    package_type: PackageType,
    type_name: String,
    name: String,
    description: String,
    versions: Vec<Version>,
}

impl Package {
    pub fn new(package_type: PackageType, name: impl Into<String>) -> Result<Self> {
        Self::with_type_name(package_type.as_str(), name)
    }

    /// Create a package from the raw `type` attribute
    ///
    /// The attribute is kept verbatim so unknown types survive a reparse.
    pub fn with_type_name(type_name: &str, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Validation("empty package name".to_string()));
        }

        Ok(Self {
            package_type: PackageType::from_index_name(type_name),
            type_name: type_name.to_string(),
            name,
            description: String::new(),
            versions: Vec::new(),
        })
    }

    pub fn package_type(&self) -> PackageType {
        self.package_type
    }

    /// The `type` attribute as it appeared in the index
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Description when present, otherwise the package name
    pub fn display_name(&self) -> &str {
        display_name(&self.name, &self.description)
    }

    /// Insert a version, keeping versions sorted
    ///
    /// Versions without sources are dropped and a version whose name is
    /// already present is ignored. Returns whether the version was added.
    pub fn add_version(&mut self, version: Version) -> bool {
        if version.sources.is_empty() {
            return false;
        }

        match self.versions.binary_search_by(|v| v.name.cmp(&version.name)) {
            Ok(_) => false,
            Err(pos) => {
                self.versions.insert(pos, version);
                true
            }
        }
    }

    /// Versions in ascending order
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }
}

/// Description when present, otherwise the name
pub fn display_name<'s>(name: &'s str, description: &'s str) -> &'s str {
    if description.is_empty() {
        name
    } else {
        description
    }
}

/// Borrowed handle to a package inside its category
#[derive(Debug, Clone, Copy)]
pub struct PackageRef<'a> {
    category: CategoryRef<'a>,
    package: &'a Package,
}

impl<'a> PackageRef<'a> {
    pub(super) fn new(category: CategoryRef<'a>, package: &'a Package) -> Self {
        Self { category, package }
    }

    pub fn category(&self) -> CategoryRef<'a> {
        self.category
    }

    pub fn index(&self) -> &'a RemoteIndex {
        self.category.index()
    }

    pub fn name(&self) -> &'a str {
        &self.package.name
    }

    pub fn get(&self) -> &'a Package {
        self.package
    }

    pub fn versions(&self) -> impl DoubleEndedIterator<Item = VersionRef<'a>> + use<'a> {
        let this = *self;
        self.package
            .versions
            .iter()
            .map(move |version| VersionRef {
                package: this,
                version,
            })
    }

    pub fn version(&self, index: usize) -> Option<VersionRef<'a>> {
        self.versions().nth(index)
    }

    /// Newest version acceptable as an upgrade target
    ///
    /// Walks versions from newest to oldest and returns the first stable one,
    /// or the first one at all when `pre_releases` is set. Versions older than
    /// `current` are never returned.
    pub fn last_version(&self, pre_releases: bool, current: &VersionName) -> Option<VersionRef<'a>> {
        for version in self.versions().rev() {
            if version.name() < current {
                break;
            }
            if pre_releases || version.name().is_stable() {
                return Some(version);
            }
        }

        None
    }

    pub fn find_version(&self, name: &VersionName) -> Option<VersionRef<'a>> {
        self.versions().find(|v| v.name() == name)
    }

    /// Directory segments the package's files are installed into
    pub fn target_location(&self) -> Result<Vec<String>> {
        let (root, scoped) = self.package.package_type.root().ok_or_else(|| {
            Error::Validation(format!(
                "unsupported package type '{}' for {}",
                self.package.type_name, self.package.name
            ))
        })?;

        let mut location = vec![root.to_string()];
        if scoped {
            location.push(self.index().name().to_string());
            location.extend(
                self.category
                    .name()
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }

        Ok(location)
    }
}

impl Deref for PackageRef<'_> {
    type Target = Package;

    fn deref(&self) -> &Package {
        self.package
    }
}

/// One published release of a package
#[derive(Debug, Clone)]
pub struct Version {
    name: VersionName,
    author: String,
    changelog: String,
    time: Option<DateTime<Utc>>,
    sources: Vec<Source>,
}

impl Version {
    /// Create a version from its textual name
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self::from_name(VersionName::parse(name)?))
    }

    pub fn from_name(name: VersionName) -> Self {
        Self {
            name,
            author: String::new(),
            changelog: String::new(),
            time: None,
            sources: Vec::new(),
        }
    }

    pub fn name(&self) -> &VersionName {
        &self.name
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
    }

    /// Author, or "Unknown" when the index names none
    pub fn display_author(&self) -> &str {
        display_author(&self.author)
    }

    pub fn changelog(&self) -> &str {
        &self.changelog
    }

    pub fn set_changelog(&mut self, changelog: impl Into<String>) {
        self.changelog = changelog.into();
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.time = Some(time);
    }

    pub fn add_source(&mut self, source: Source) {
        self.sources.push(source);
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

pub fn display_author(author: &str) -> &str {
    if author.is_empty() { "Unknown" } else { author }
}

/// Borrowed handle to a version inside its package
#[derive(Debug, Clone, Copy)]
pub struct VersionRef<'a> {
    package: PackageRef<'a>,
    version: &'a Version,
}

impl<'a> VersionRef<'a> {
    pub fn package(&self) -> PackageRef<'a> {
        self.package
    }

    pub fn name(&self) -> &'a VersionName {
        &self.version.name
    }

    pub fn get(&self) -> &'a Version {
        self.version
    }

    pub fn sources(&self) -> impl Iterator<Item = SourceRef<'a>> + use<'a> {
        let this = *self;
        self.version
            .sources
            .iter()
            .map(move |source| SourceRef::new(this, source))
    }

    /// Target paths of every source of this version
    pub fn files(&self) -> Result<BTreeSet<String>> {
        self.sources().map(|s| s.target_path()).collect()
    }

    /// Identity comparison: same version of the same package in the same tree
    pub fn ptr_eq(&self, other: &VersionRef<'_>) -> bool {
        std::ptr::eq(self.version, other.version)
    }
}

impl Deref for VersionRef<'_> {
    type Target = Version;

    fn deref(&self) -> &Version {
        self.version
    }
}
