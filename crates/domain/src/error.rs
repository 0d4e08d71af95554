/// Shared error type used across all Replikit crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("session storage: {0}")]
    Storage(String),

    #[error("transient {name}: {message}")]
    Transient { name: String, message: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
