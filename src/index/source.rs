// src/index/source.rs

//! Downloadable files of a version

use super::package::VersionRef;
use crate::error::{Error, Result};
use std::ops::Deref;

/// Platform a source is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Unknown,
    All,
    Windows,
    Win32,
    Win64,
    Darwin,
    Darwin32,
    Darwin64,
    Linux,
    Linux32,
    Linux64,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Unknown => "unknown",
            Platform::All => "all",
            Platform::Windows => "windows",
            Platform::Win32 => "win32",
            Platform::Win64 => "win64",
            Platform::Darwin => "darwin",
            Platform::Darwin32 => "darwin32",
            Platform::Darwin64 => "darwin64",
            Platform::Linux => "linux",
            Platform::Linux32 => "linux32",
            Platform::Linux64 => "linux64",
        }
    }

    /// Parse a `platform` attribute; unrecognized values are `Unknown`
    pub fn from_index_name(name: &str) -> Self {
        match name {
            "all" => Platform::All,
            "windows" => Platform::Windows,
            "win32" => Platform::Win32,
            "win64" => Platform::Win64,
            "darwin" => Platform::Darwin,
            "darwin32" => Platform::Darwin32,
            "darwin64" => Platform::Darwin64,
            "linux" => Platform::Linux,
            "linux32" => Platform::Linux32,
            "linux64" => Platform::Linux64,
            _ => Platform::Unknown,
        }
    }

    /// The platform this binary was built for
    pub fn host() -> Self {
        let wide = cfg!(target_pointer_width = "64");

        if cfg!(target_os = "windows") {
            if wide { Platform::Win64 } else { Platform::Win32 }
        } else if cfg!(target_os = "macos") {
            if wide { Platform::Darwin64 } else { Platform::Darwin32 }
        } else if cfg!(target_os = "linux") {
            if wide { Platform::Linux64 } else { Platform::Linux32 }
        } else {
            Platform::Unknown
        }
    }

    /// Whether a source for this platform can be installed on `host`
    pub fn covers(&self, host: Platform) -> bool {
        match self {
            Platform::Unknown => false,
            Platform::All => true,
            Platform::Windows => matches!(host, Platform::Win32 | Platform::Win64),
            Platform::Darwin => matches!(host, Platform::Darwin32 | Platform::Darwin64),
            Platform::Linux => matches!(host, Platform::Linux32 | Platform::Linux64),
            specific => *specific == host,
        }
    }
}

/// A file to download and where it comes from
#[derive(Debug, Clone)]
pub struct Source {
    platform: Platform,
    file: String,
    url: String,
}

impl Source {
    /// Create a source; an empty `file` designates the package's main file
    pub fn new(platform: Platform, file: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            platform,
            file: file.into(),
            url: url.into(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_main(&self) -> bool {
        self.file.is_empty()
    }
}

/// Borrowed handle to a source inside its version
#[derive(Debug, Clone, Copy)]
pub struct SourceRef<'a> {
    version: VersionRef<'a>,
    source: &'a Source,
}

impl<'a> SourceRef<'a> {
    pub(super) fn new(version: VersionRef<'a>, source: &'a Source) -> Self {
        Self { version, source }
    }

    pub fn version(&self) -> VersionRef<'a> {
        self.version
    }

    /// File name, falling back to the package name for the main file
    pub fn file_name(&self) -> &'a str {
        if self.source.file.is_empty() {
            self.version.package().name()
        } else {
            &self.source.file
        }
    }

    /// Installed location of this file, `/`-separated and relative to the
    /// host's resource directory
    pub fn target_path(&self) -> Result<String> {
        let mut segments = self.version.package().target_location()?;

        for part in self.file_name().split(['/', '\\']) {
            match part {
                "" | "." => continue,
                ".." => {
                    return Err(Error::Validation(format!(
                        "file name '{}' escapes the package directory",
                        self.file_name()
                    )));
                }
                _ => segments.push(part.to_string()),
            }
        }

        Ok(segments.join("/"))
    }
}

impl Deref for SourceRef<'_> {
    type Target = Source;

    fn deref(&self) -> &Source {
        self.source
    }
}
