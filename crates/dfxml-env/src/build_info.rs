//! How the running program was built.

use dfxml_core::{Attributes, DfxmlWriter};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::Result;
use crate::execution::format_start_time;
use crate::WriteDfxml;

/// A library linked into the program, reported as
/// `<library name='..' version='..'/>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryVersion {
    pub name: String,
    pub version: String,
}

impl LibraryVersion {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildEnvironment {
    pub compiler: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub profile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rustflags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compilation_date: Option<String>,
    pub libraries: Vec<LibraryVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
}

fn non_empty(value: Option<&'static str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

/// Render a build epoch (seconds) the way start times are rendered.
pub fn compilation_date(epoch: &str) -> Option<String> {
    let seconds = epoch.trim().parse::<i64>().ok()?;
    let built = OffsetDateTime::from_unix_timestamp(seconds).ok()?;
    format_start_time(built).ok()
}

impl BuildEnvironment {
    /// Facts recorded when this crate was compiled.
    pub fn current() -> Self {
        let profile = match non_empty(option_env!("DFXML_PROFILE")) {
            Some(profile) => profile,
            None if cfg!(debug_assertions) => String::from("debug"),
            None => String::from("release"),
        };
        Self {
            compiler: non_empty(option_env!("DFXML_RUSTC_VERSION"))
                .unwrap_or_else(|| String::from("rustc")),
            target: non_empty(option_env!("DFXML_TARGET")),
            profile,
            rustflags: non_empty(option_env!("RUSTFLAGS")),
            compilation_date: option_env!("DFXML_BUILD_EPOCH").and_then(compilation_date),
            libraries: Vec::new(),
            git_commit: None,
        }
    }

    /// Register a library whose version should be reported.
    pub fn with_library(mut self, library: LibraryVersion) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn with_git_commit(mut self, commit: impl Into<String>) -> Self {
        self.git_commit = Some(commit.into());
        self
    }
}

impl WriteDfxml for BuildEnvironment {
    fn write_dfxml(&self, writer: &DfxmlWriter) -> Result<()> {
        writer.push("build_environment", "")?;
        writer.write_element("compiler", &self.compiler, "")?;
        if let Some(target) = &self.target {
            writer.write_element("target", target, "")?;
        }
        writer.write_element("profile", &self.profile, "")?;
        if let Some(flags) = &self.rustflags {
            writer.write_element("RUSTFLAGS", flags, "")?;
        }
        if let Some(date) = &self.compilation_date {
            writer.write_element("compilation_date", date, "")?;
        }
        for library in &self.libraries {
            let attrs = Attributes::new()
                .with("name", &library.name)
                .with("version", &library.version);
            writer.write_element("library", "", attrs)?;
        }
        if let Some(commit) = &self.git_commit {
            writer.write_element("git", "", Attributes::new().with("commit", commit))?;
        }
        writer.pop()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfxml_core::SharedBuffer;

    #[test]
    fn current_build_has_compiler_and_profile() {
        let build = BuildEnvironment::current();
        assert!(!build.compiler.is_empty());
        assert!(!build.profile.is_empty());
        assert!(build.libraries.is_empty());
    }

    #[test]
    fn compilation_date_comes_from_build_epoch() {
        assert_eq!(compilation_date("0").as_deref(), Some("1970-01-01T00:00:00Z"));
        assert_eq!(compilation_date(" 1700000000\n").as_deref(), Some("2023-11-14T22:13:20Z"));
        assert_eq!(compilation_date(""), None);
        assert_eq!(compilation_date("yesterday"), None);
        assert!(BuildEnvironment::current().compilation_date.is_some());
    }

    #[test]
    fn libraries_and_commit_become_attributes() {
        let build = BuildEnvironment {
            compiler: String::from("rustc 1.83.0"),
            target: None,
            profile: String::from("release"),
            rustflags: None,
            compilation_date: compilation_date("1700000000"),
            libraries: Vec::new(),
            git_commit: None,
        }
        .with_library(LibraryVersion::new("libewf", "20140608"))
        .with_git_commit("abc123");

        let buffer = SharedBuffer::new();
        let writer = DfxmlWriter::from_writer(buffer.clone()).unwrap();
        build.write_dfxml(&writer).unwrap();
        writer.close().unwrap();

        let document = buffer.contents();
        assert!(document.contains("  <compiler>rustc 1.83.0</compiler>\n  <profile>release</profile>\n"));
        assert!(document.contains("  <compilation_date>2023-11-14T22:13:20Z</compilation_date>\n"));
        assert!(document.contains("  <library name='libewf' version='20140608'/>\n"));
        assert!(document.contains("  <git commit='abc123'/>\n"));
        assert!(!document.contains("<target>"));
    }
}
