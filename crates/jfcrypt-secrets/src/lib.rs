//! jfcrypt-secrets: passphrase acquisition
//!
//! The codec never reads a passphrase itself; callers hand it a
//! [`PassphraseSource`], usually the default [`PassphraseChain`].

pub mod passphrase;

pub use passphrase::{
    EnvPassphrase, PassphraseChain, PassphraseSource, TerminalPassphrase, PASSPHRASE_ENV_VAR,
};
