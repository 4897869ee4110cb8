//! Per-segment AES-256-GCM encryption/decryption
//!
//! Nonce layout (12 bytes):
//! ```text
//! [7 bytes: stream nonce prefix][4 bytes: segment counter, big-endian][1 byte: last flag]
//! ```
//!
//! The counter binds each segment to its position and the last flag binds the
//! final segment to end-of-stream: a truncated stream cannot present an
//! interior segment as final, because its tag was computed with flag 0x00.
//! No associated data is used.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce,
};
use jfcrypt_core::{JfcryptError, JfcryptResult};

use crate::keys::{DerivedKey, NONCE_PREFIX_SIZE};
use crate::{NONCE_SIZE, TAG_SIZE};

/// Build the nonce for segment `index`.
pub fn segment_nonce(
    prefix: &[u8; NONCE_PREFIX_SIZE],
    index: u32,
    last: bool,
) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..NONCE_PREFIX_SIZE].copy_from_slice(prefix);
    nonce[NONCE_PREFIX_SIZE..NONCE_SIZE - 1].copy_from_slice(&index.to_be_bytes());
    nonce[NONCE_SIZE - 1] = u8::from(last);
    nonce
}

/// AES-256-GCM keyed for one stream.
pub struct SegmentCipher {
    cipher: Aes256Gcm,
    nonce_prefix: [u8; NONCE_PREFIX_SIZE],
}

impl SegmentCipher {
    pub fn new(key: &DerivedKey, nonce_prefix: [u8; NONCE_PREFIX_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
            nonce_prefix,
        }
    }

    /// Encrypt `buf` in place, appending the 16-byte tag.
    pub fn seal_in_place(&self, index: u32, last: bool, buf: &mut Vec<u8>) -> JfcryptResult<()> {
        let nonce = segment_nonce(&self.nonce_prefix, index, last);
        self.cipher
            .encrypt_in_place(Nonce::from_slice(&nonce), b"", buf)
            .map_err(|e| JfcryptError::parameter(format!("segment encryption failed: {e}")))
    }

    /// Verify and decrypt `buf` in place, stripping the tag.
    ///
    /// Every failure is the same `Crypto` error, and `buf` is emptied so no
    /// unauthenticated bytes survive.
    pub fn open_in_place(&self, index: u32, last: bool, buf: &mut Vec<u8>) -> JfcryptResult<()> {
        if buf.len() < TAG_SIZE {
            buf.clear();
            return Err(JfcryptError::Crypto);
        }
        let nonce = segment_nonce(&self.nonce_prefix, index, last);
        if self
            .cipher
            .decrypt_in_place(Nonce::from_slice(&nonce), b"", buf)
            .is_err()
        {
            buf.clear();
            return Err(JfcryptError::Crypto);
        }
        Ok(())
    }

    /// Encrypt one segment.
    ///
    /// Returns: `[ciphertext][16-byte tag]`
    pub fn encrypt_segment(
        &self,
        index: u32,
        last: bool,
        plaintext: &[u8],
    ) -> JfcryptResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(plaintext.len() + TAG_SIZE);
        buf.extend_from_slice(plaintext);
        self.seal_in_place(index, last, &mut buf)?;
        Ok(buf)
    }

    /// Decrypt one segment produced by [`SegmentCipher::encrypt_segment`].
    pub fn decrypt_segment(
        &self,
        index: u32,
        last: bool,
        ciphertext: &[u8],
    ) -> JfcryptResult<Vec<u8>> {
        let mut buf = ciphertext.to_vec();
        self.open_in_place(index, last, &mut buf)?;
        Ok(buf)
    }
}
