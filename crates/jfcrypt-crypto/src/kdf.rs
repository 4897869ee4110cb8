//! Key derivation: Argon2id passphrase → master key

use argon2::{Algorithm, Argon2, Params, Version};
use jfcrypt_core::{JfcryptError, JfcryptResult, KdfBlock};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

/// Size of the Argon2 salt stored in the header
pub const SALT_SIZE: usize = 16;

/// Default master key length (256-bit)
pub const MASTER_KEY_SIZE: usize = 32;

/// Upper bound on a header-supplied key length.
const MAX_KEY_LEN: u32 = 1024;

/// A master key derived from a passphrase via Argon2id.
///
/// Its length comes from the KDF parameters, so headers written with a
/// different `keylen` still decrypt. Zeroized on drop.
pub struct MasterKey {
    bytes: Vec<u8>,
}

impl MasterKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for KDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 1048576 = 1 GiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub key_len: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 1024 * 1024,
            time_cost: 3,
            parallelism: 4,
            key_len: MASTER_KEY_SIZE as u32,
        }
    }
}

impl KdfParams {
    /// Parameters recorded in a stream header.
    pub fn from_block(block: &KdfBlock) -> Self {
        Self {
            mem_cost_kib: block.memory,
            time_cost: block.time,
            parallelism: block.threads,
            key_len: block.keylen,
        }
    }

    /// Header block for these parameters and the given salt.
    pub fn to_block(&self, salt: &[u8]) -> KdfBlock {
        KdfBlock::argon2id(
            salt,
            self.time_cost,
            self.mem_cost_kib,
            self.parallelism,
            self.key_len,
        )
    }

    fn to_argon2(&self) -> JfcryptResult<Params> {
        if self.time_cost < 1 {
            return Err(JfcryptError::parameter("iterations must be at least 1"));
        }
        if self.key_len > MAX_KEY_LEN {
            return Err(JfcryptError::parameter(format!(
                "key length {} exceeds {MAX_KEY_LEN} bytes",
                self.key_len
            )));
        }
        Params::new(
            self.mem_cost_kib,
            self.time_cost,
            self.parallelism,
            Some(self.key_len as usize),
        )
        .map_err(|e| JfcryptError::parameter(format!("invalid Argon2id params: {e}")))
    }
}

/// Generate a fresh random Argon2 salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive a master key from a passphrase and salt using Argon2id.
///
/// Deterministic: the same passphrase, salt and parameters always give the
/// same key. Memory too small for the requested parallelism (Argon2 needs
/// 8 KiB per lane) fails with a parameter error.
pub fn derive_master_key(
    passphrase: &SecretString,
    salt: &[u8],
    params: &KdfParams,
) -> JfcryptResult<MasterKey> {
    let phrase = passphrase.expose_secret();
    if phrase.is_empty() {
        return Err(JfcryptError::passphrase("passphrase cannot be empty"));
    }

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    // Owned by MasterKey from the start so the error path zeroizes too.
    let mut key = MasterKey::from_bytes(vec![0u8; params.key_len as usize]);
    argon2
        .hash_password_into(phrase.as_bytes(), salt, &mut key.bytes)
        .map_err(|e| JfcryptError::parameter(format!("Argon2id KDF failed: {e}")))?;

    tracing::debug!(
        mem_cost_kib = params.mem_cost_kib,
        time_cost = params.time_cost,
        parallelism = params.parallelism,
        "derived master key"
    );
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn fast_params() -> KdfParams {
        KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
            key_len: 32,
        }
    }

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("test-passphrase-123");
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_master_key(&passphrase, &salt, &fast_params()).unwrap();
        let key2 = derive_master_key(&passphrase, &salt, &fast_params()).unwrap();

        assert_eq!(
            key1.as_bytes(),
            key2.as_bytes(),
            "KDF must be deterministic"
        );
        assert_eq!(key1.as_bytes().len(), 32);
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let salt = [1u8; SALT_SIZE];

        let key1 =
            derive_master_key(&SecretString::from("passphrase-a"), &salt, &fast_params()).unwrap();
        let key2 =
            derive_master_key(&SecretString::from("passphrase-b"), &salt, &fast_params()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_different_salts() {
        let passphrase = SecretString::from("same-passphrase");

        let key1 = derive_master_key(&passphrase, &[1u8; 16], &fast_params()).unwrap();
        let key2 = derive_master_key(&passphrase, &[2u8; 16], &fast_params()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_honours_recorded_key_length() {
        let params = KdfParams {
            key_len: 64,
            ..fast_params()
        };
        let key = derive_master_key(&SecretString::from("pw"), &[3u8; 16], &params).unwrap();
        assert_eq!(key.as_bytes().len(), 64);
    }

    #[test]
    fn test_kdf_memory_too_small_for_parallelism() {
        // 8 lanes need at least 64 KiB
        let params = KdfParams {
            mem_cost_kib: 16,
            parallelism: 8,
            ..fast_params()
        };
        let err = derive_master_key(&SecretString::from("pw"), &[0u8; 16], &params).unwrap_err();
        assert!(matches!(err, JfcryptError::Parameter(_)));
    }

    #[test]
    fn test_kdf_zero_iterations_rejected() {
        let params = KdfParams {
            time_cost: 0,
            ..fast_params()
        };
        let err = derive_master_key(&SecretString::from("pw"), &[0u8; 16], &params).unwrap_err();
        assert!(matches!(err, JfcryptError::Parameter(_)));
    }

    #[test]
    fn test_kdf_empty_passphrase_rejected() {
        let err =
            derive_master_key(&SecretString::from(""), &[0u8; 16], &fast_params()).unwrap_err();
        assert!(matches!(err, JfcryptError::Passphrase(_)));
    }

    #[test]
    fn test_params_block_roundtrip() {
        let params = KdfParams::default();
        let block = params.to_block(&[9u8; SALT_SIZE]);
        assert_eq!(block.memory, 1_048_576);
        assert_eq!(block.threads, 4);
        assert_eq!(KdfParams::from_block(&block), params);
    }

    #[test]
    fn test_master_key_debug_redacted() {
        let key = MasterKey::from_bytes(vec![0xAA; 32]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("170"));
    }
}
