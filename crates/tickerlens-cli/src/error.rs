use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickerlens_core::ValidationError),

    #[error(transparent)]
    DataUnavailable(#[from] tickerlens_core::FetchError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] tickerlens_core::ConfigError),

    #[error(transparent)]
    Serve(#[from] tickerlens_web::ServeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::DataUnavailable(_) => 3,
            Self::Serialization(_) => 4,
            Self::Config(_) => 6,
            Self::Serve(_) => 7,
            Self::Io(_) => 10,
        }
    }
}
