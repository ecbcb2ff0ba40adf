use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeteoError {
    #[error("Unknown measurement code: {0}")]
    UnknownCode(String),

    #[error("Measurement id {0} is out of range")]
    UnknownId(usize),

    #[error("Invalid parser configuration: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, MeteoError>;
