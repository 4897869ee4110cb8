use thiserror::Error;

pub type JfcryptResult<T> = Result<T, JfcryptError>;

/// Failure categories surfaced by every jfcrypt operation.
///
/// `Crypto` carries no detail: a wrong passphrase, a flipped
/// bit, a truncated stream and a reordered segment all look the same.
#[derive(Debug, Error)]
pub enum JfcryptError {
    #[error("invalid input: {0}")]
    InputFormat(String),

    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("passphrase error: {0}")]
    Passphrase(String),

    #[error("decryption failed (wrong passphrase or corrupted data?)")]
    Crypto,

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JfcryptError {
    pub fn input_format(msg: impl Into<String>) -> Self {
        Self::InputFormat(msg.into())
    }

    pub fn parameter(msg: impl Into<String>) -> Self {
        Self::Parameter(msg.into())
    }

    pub fn passphrase(msg: impl Into<String>) -> Self {
        Self::Passphrase(msg.into())
    }

    /// True for the uniform authentication-failure category.
    pub fn is_crypto(&self) -> bool {
        matches!(self, Self::Crypto)
    }
}
