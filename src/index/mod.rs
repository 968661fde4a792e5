// src/index/mod.rs

//! In-memory catalog of the packages published by one remote
//!
//! A [`RemoteIndex`] owns its categories, which own their packages, which own
//! their versions and sources. Trees are built once from index data and are
//! never modified after being shared.
//!
//! Navigation towards the root goes through borrowed handles
//! ([`CategoryRef`], [`PackageRef`], [`VersionRef`], [`SourceRef`]). Each handle
//! carries the handle of its parent, so a package always knows its category and
//! index without the tree storing back pointers.

pub mod package;
pub mod parser;
pub mod source;

pub use package::{Package, PackageRef, PackageType, Version, VersionRef};
pub use source::{Platform, Source, SourceRef};

use crate::error::{Error, Result};
use std::ops::Deref;
use std::path::Path;
use tracing::debug;

/// Kind of link published in the index metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Website,
    Donation,
    Screenshot,
    Other,
}

impl LinkType {
    /// Map a `rel` attribute to a link type
    ///
    /// A missing `rel` designates a website.
    pub fn from_rel(rel: &str) -> Self {
        match rel {
            "" | "website" => LinkType::Website,
            "donation" => LinkType::Donation,
            "screenshot" => LinkType::Screenshot,
            _ => LinkType::Other,
        }
    }
}

/// A named link from the index metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub link_type: LinkType,
    pub name: String,
    pub url: String,
}

/// Optional information about the remote itself
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub about: String,
    pub links: Vec<Link>,
}

impl Metadata {
    /// Links of the given type, in document order
    pub fn links(&self, link_type: LinkType) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(move |l| l.link_type == link_type)
    }
}

/// Root of a remote's package tree
#[derive(Debug, Clone)]
pub struct RemoteIndex {
    name: String,
    categories: Vec<Category>,
    metadata: Metadata,
}

impl RemoteIndex {
    /// Create an empty index for the named remote
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Validation("empty index name".to_string()));
        }

        Ok(Self {
            name,
            categories: Vec::new(),
            metadata: Metadata::default(),
        })
    }

    /// Parse index data for the named remote
    pub fn load(name: &str, xml: &str) -> Result<Self> {
        parser::parse(name, xml)
    }

    /// Read and parse an index file from disk
    ///
    /// A file that cannot be read is an I/O error; content that is not UTF-8
    /// is a parse error like any other malformed index.
    pub fn load_file(name: &str, path: &Path) -> Result<Self> {
        debug!("Loading index '{}' from {}", name, path.display());
        let bytes = std::fs::read(path)?;
        let xml = String::from_utf8(bytes).map_err(|e| {
            Error::Parse(format!(
                "index '{}' is not valid UTF-8 (byte {})",
                name,
                e.utf8_error().valid_up_to()
            ))
        })?;
        Self::load(name, &xml)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Add a category
    ///
    /// A category whose name already exists is merged into the existing one.
    pub fn add_category(&mut self, category: Category) {
        match self
            .categories
            .iter_mut()
            .find(|c| c.name == category.name)
        {
            Some(existing) => {
                for package in category.packages {
                    existing.add_package(package);
                }
            }
            None => self.categories.push(category),
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = CategoryRef<'_>> {
        self.categories.iter().map(move |category| CategoryRef {
            index: self,
            category,
        })
    }

    pub fn category(&self, name: &str) -> Option<CategoryRef<'_>> {
        self.categories().find(|c| c.name() == name)
    }

    /// Every package of every category, in document order
    pub fn packages(&self) -> impl Iterator<Item = PackageRef<'_>> {
        self.categories().flat_map(|c| c.packages())
    }

    pub fn find_package(&self, category: &str, package: &str) -> Option<PackageRef<'_>> {
        self.category(category)?.package(package)
    }
}

/// A named group of packages
#[derive(Debug, Clone)]
pub struct Category {
    name: String,
    packages: Vec<Package>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Validation("empty category name".to_string()));
        }

        Ok(Self {
            name,
            packages: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a package; returns false if a package with the same name exists
    pub fn add_package(&mut self, package: Package) -> bool {
        if self.packages.iter().any(|p| p.name() == package.name()) {
            return false;
        }

        self.packages.push(package);
        true
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Borrowed handle to a category inside its index
#[derive(Debug, Clone, Copy)]
pub struct CategoryRef<'a> {
    index: &'a RemoteIndex,
    category: &'a Category,
}

impl<'a> CategoryRef<'a> {
    pub fn index(&self) -> &'a RemoteIndex {
        self.index
    }

    pub fn name(&self) -> &'a str {
        &self.category.name
    }

    pub fn packages(&self) -> impl Iterator<Item = PackageRef<'a>> + use<'a> {
        let this = *self;
        self.category
            .packages
            .iter()
            .map(move |package| PackageRef::new(this, package))
    }

    pub fn package(&self, name: &str) -> Option<PackageRef<'a>> {
        self.packages().find(|p| p.name() == name)
    }
}

impl Deref for CategoryRef<'_> {
    type Target = Category;

    fn deref(&self) -> &Category {
        self.category
    }
}
