//! Stream key hierarchy: master key + per-stream salt → derived segment key

use hkdf::Hkdf;
use jfcrypt_core::{Algorithm, JfcryptError, JfcryptResult};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::kdf::MasterKey;

/// Size of the per-stream derived key (AES-256)
pub const DERIVED_KEY_SIZE: usize = 32;

/// Size of the per-stream nonce prefix
pub const NONCE_PREFIX_SIZE: usize = 7;

/// A per-stream 256-bit segment key. Zeroized on drop.
pub struct DerivedKey {
    bytes: [u8; DERIVED_KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; DERIVED_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; DERIVED_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Sub-key material written at the start of every ciphertext payload.
///
/// `salt` feeds HKDF and is unrelated to the Argon2 salt in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPreamble {
    pub salt: [u8; DERIVED_KEY_SIZE],
    pub nonce_prefix: [u8; NONCE_PREFIX_SIZE],
}

impl StreamPreamble {
    /// Encoded size: salt then nonce prefix
    pub const SIZE: usize = DERIVED_KEY_SIZE + NONCE_PREFIX_SIZE;

    /// Fresh random salt and nonce prefix.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; DERIVED_KEY_SIZE];
        let mut nonce_prefix = [0u8; NONCE_PREFIX_SIZE];
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce_prefix);
        Self { salt, nonce_prefix }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..DERIVED_KEY_SIZE].copy_from_slice(&self.salt);
        out[DERIVED_KEY_SIZE..].copy_from_slice(&self.nonce_prefix);
        out
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let mut salt = [0u8; DERIVED_KEY_SIZE];
        let mut nonce_prefix = [0u8; NONCE_PREFIX_SIZE];
        salt.copy_from_slice(&bytes[..DERIVED_KEY_SIZE]);
        nonce_prefix.copy_from_slice(&bytes[DERIVED_KEY_SIZE..]);
        Self { salt, nonce_prefix }
    }
}

/// HKDF info for a stream: algorithm id || segment size (u32 BE).
///
/// Binding both means a derived key never serves a differently-configured stream.
pub fn stream_info(algorithm: Algorithm, segment_size: usize) -> Vec<u8> {
    let id = algorithm.id().as_bytes();
    let mut info = Vec::with_capacity(id.len() + 4);
    info.extend_from_slice(id);
    info.extend_from_slice(&(segment_size as u32).to_be_bytes());
    info
}

/// Derive the per-stream segment key via HKDF-SHA256.
pub fn derive_stream_key(
    master: &MasterKey,
    stream_salt: &[u8; DERIVED_KEY_SIZE],
    info: &[u8],
) -> JfcryptResult<DerivedKey> {
    let hkdf = Hkdf::<Sha256>::new(Some(&stream_salt[..]), master.as_bytes());
    let mut okm = [0u8; DERIVED_KEY_SIZE];
    hkdf.expand(info, &mut okm)
        .map_err(|e| JfcryptError::parameter(format!("HKDF expand failed: {e}")))?;
    let key = DerivedKey::from_bytes(okm);
    okm.zeroize();
    Ok(key)
}
