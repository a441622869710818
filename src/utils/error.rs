use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidConfig(#[from] config::ConfigError),
    #[error("invalid size distribution at line {line}: {reason}")]
    InvalidDistribution { line: usize, reason: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Others(#[from] anyhow::Error),
}

/// A type alias that forces the usage of the custom error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn distribution(line: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDistribution {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn parameter(reason: impl Into<String>) -> Self {
        Self::InvalidParameter(reason.into())
    }
}

impl From<tracing_subscriber::util::TryInitError> for Error {
    fn from(err: tracing_subscriber::util::TryInitError) -> Self {
        Self::Others(anyhow::Error::from(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for Error {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        Self::Others(anyhow::Error::from(err))
    }
}
