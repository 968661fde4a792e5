// src/lib.rs

//! ReaPack package registry
//!
//! Reads remote package indexes, tracks which packages are installed and
//! which files they own, and joins the two into browser rows.
//!
//! # Architecture
//!
//! - Database-first: installed packages, remotes and preferences live in SQLite
//! - Indexes are parsed into immutable trees shared per remote
//! - File-level ownership: a path belongs to at most one installed package

pub mod browser;
pub mod catalog;
pub mod config;
pub mod db;
mod error;
pub mod index;
pub mod registry;
pub mod version;

pub use browser::BrowserEntry;
pub use catalog::Catalog;
pub use config::InstallOptions;
pub use db::models::Remote;
pub use error::{Error, Result};
pub use index::RemoteIndex;
pub use registry::{Entry, Registry};
pub use version::VersionName;
