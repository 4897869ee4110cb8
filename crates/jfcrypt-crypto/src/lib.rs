//! jfcrypt-crypto: passphrase-based streaming authenticated encryption
//!
//! Architecture: fixed-size segments sealed with AES-256-GCM under a per-stream key
//!
//! Pipeline: plaintext → 1 MiB segments → AES-256-GCM (nonce = prefix || counter || last) → optional base64
//!
//! Key hierarchy:
//! ```text
//! Passphrase
//!   └── Master Key (Argon2id, salt + cost parameters recorded in the header)
//!       └── Stream Key (HKDF-SHA256, fresh 32-byte salt in the payload preamble,
//!           │           info = algorithm id || segment size)
//!           └── Segment AEAD: AES-256-GCM (nonce = 7-byte prefix || u32 counter || last flag, AAD = ∅)
//! ```
//!
//! Memory use is two segment buffers regardless of stream length.

pub mod framing;
pub mod kdf;
pub mod keys;
pub mod pipeline;
pub mod segment;
pub mod stream;

pub use kdf::{derive_master_key, KdfParams, MasterKey};
pub use keys::{derive_stream_key, stream_info, DerivedKey, StreamPreamble};
pub use segment::SegmentCipher;
pub use stream::{
    decrypt_stream, encrypt_stream, CodecState, EncryptOptions, StreamCodec, StreamStats,
};

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;
