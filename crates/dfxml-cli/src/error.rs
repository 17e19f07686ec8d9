use dfxml_core::{DfxmlError, ErrorKind};
use dfxml_env::EnvError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Document(#[from] DfxmlError),

    #[error(transparent)]
    Environment(#[from] EnvError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Argument(_) => 2,
            Self::Document(error) | Self::Environment(EnvError::Writer(error)) => {
                match error.kind() {
                    ErrorKind::Configuration => 3,
                    ErrorKind::Io => 10,
                    ErrorKind::Formatting => 4,
                    ErrorKind::ProtocolMisuse => 70,
                }
            }
            Self::Environment(EnvError::Time(_)) => 4,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
