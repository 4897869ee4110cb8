//! jfcrypt-core: types shared by the jfcrypt crates
//!
//! - [`types::Header`]: the JSON record on the first line of every stream
//! - [`error::JfcryptError`]: failure taxonomy
//! - [`config::JfcryptConfig`]: optional TOML defaults for new streams

pub mod config;
pub mod error;
pub mod types;

pub use error::{JfcryptError, JfcryptResult};
pub use types::{Algorithm, Format, Header, KdfBlock};
