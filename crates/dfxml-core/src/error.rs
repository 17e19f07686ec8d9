use std::path::PathBuf;

use thiserror::Error;

/// Broad failure category, used by callers to decide how to report an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller asked for an element name the format cannot express.
    Configuration,
    /// A destination could not be opened, reopened, written or removed.
    Io,
    /// A formatted body could not be rendered.
    Formatting,
    /// The caller violated the push/pop protocol.
    ProtocolMisuse,
}

/// Errors produced while emitting a DFXML document.
#[derive(Debug, Error)]
pub enum DfxmlError {
    #[error("tag '{tag}' contains space. Cannot continue.")]
    InvalidTagName { tag: String },

    #[error("{}: cannot open for output: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: cannot re-open for input: {source}", path.display())]
    Reopen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "{}: cannot open for output; will not delete {}: {source}",
        target.display(),
        staging.display()
    )]
    Finalize {
        target: PathBuf,
        staging: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "{}: could not write finished document; staged body kept at {}: {source}",
        target.display(),
        staging.display()
    )]
    Rewrite {
        target: PathBuf,
        staging: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("pop called with no open element")]
    EmptyTagStack,

    #[error("invalid writer configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DfxmlError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTagName { .. } | Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::Create { .. }
            | Self::Reopen { .. }
            | Self::Finalize { .. }
            | Self::Rewrite { .. }
            | Self::Io(_) => ErrorKind::Io,
            Self::Format(_) => ErrorKind::Formatting,
            Self::EmptyTagStack => ErrorKind::ProtocolMisuse,
        }
    }
}

pub type Result<T, E = DfxmlError> = std::result::Result<T, E>;
