//! Writer configuration.
//!
//! | Field | Env var | Default |
//! |-------|---------|---------|
//! | `output` | - | stdout |
//! | `make_dtd` | - | `false` |
//! | `tempfile_template` | `DFXML_TEMPFILE_TEMPLATE` | `<output>_tmp_XXXXXXXX` |
//! | `doctype_root` | `DFXML_DOCTYPE_ROOT` | `fiwalk` |

use std::env;
use std::path::{Path, PathBuf};

use crate::dtd::DEFAULT_DOCTYPE_ROOT;
use crate::error::{DfxmlError, Result};
use crate::sink::default_tempfile_template;

pub const TEMPFILE_TEMPLATE_ENV: &str = "DFXML_TEMPFILE_TEMPLATE";
pub const DOCTYPE_ROOT_ENV: &str = "DFXML_DOCTYPE_ROOT";

/// Where the finished document is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputTarget {
    #[default]
    Stdout,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    pub output: OutputTarget,
    /// Inject a DTD declaring every emitted element when the document closes.
    pub make_dtd: bool,
    /// Staging-file name template; trailing `X`s are randomized.
    pub tempfile_template: Option<String>,
    pub doctype_root: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            output: OutputTarget::Stdout,
            make_dtd: false,
            tempfile_template: None,
            doctype_root: String::from(DEFAULT_DOCTYPE_ROOT),
        }
    }
}

impl WriterConfig {
    /// Configuration for a file target.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            output: OutputTarget::File(path.into()),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `DFXML_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(template) = non_empty_var(TEMPFILE_TEMPLATE_ENV) {
            config.tempfile_template = Some(template);
        }
        if let Some(root) = non_empty_var(DOCTYPE_ROOT_ENV) {
            config.doctype_root = root;
        }
        config
    }

    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    pub fn with_dtd(mut self, make_dtd: bool) -> Self {
        self.make_dtd = make_dtd;
        self
    }

    pub fn with_tempfile_template(mut self, template: impl Into<String>) -> Self {
        self.tempfile_template = Some(template.into());
        self
    }

    pub fn with_doctype_root(mut self, root: impl Into<String>) -> Self {
        self.doctype_root = root.into();
        self
    }

    /// Template actually used for the staging file of `target`.
    pub fn resolved_template(&self, target: &Path) -> String {
        self.tempfile_template
            .clone()
            .unwrap_or_else(|| default_tempfile_template(target))
    }

    pub fn validate(&self) -> Result<()> {
        if self.make_dtd && self.output == OutputTarget::Stdout {
            return Err(DfxmlError::InvalidConfig(String::from(
                "DTD generation requires a file output",
            )));
        }
        if let Some(template) = &self.tempfile_template {
            if template.trim().is_empty() {
                return Err(DfxmlError::InvalidConfig(String::from(
                    "tempfile template must not be empty",
                )));
            }
        }
        if self.doctype_root.is_empty() || self.doctype_root.contains(char::is_whitespace) {
            return Err(DfxmlError::InvalidConfig(format!(
                "invalid DOCTYPE root name '{}'",
                self.doctype_root
            )));
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}
