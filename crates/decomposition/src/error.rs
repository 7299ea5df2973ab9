use thiserror::Error;

pub type Result<T> = std::result::Result<T, DecompositionError>;

#[derive(Error, Debug)]
pub enum DecompositionError {
    #[error("invalid input: {0}")]
    Validation(#[from] questers_protocol::ValidationError),

    #[error(transparent)]
    Config(#[from] questers_protocol::ConfigError),
}
