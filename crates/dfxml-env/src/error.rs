use dfxml_core::DfxmlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error(transparent)]
    Writer(#[from] DfxmlError),

    #[error("could not format start time: {0}")]
    Time(#[from] time::error::Format),
}

pub type Result<T, E = EnvError> = std::result::Result<T, E>;
