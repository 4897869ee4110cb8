use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{JfcryptError, JfcryptResult};

/// Version string written into every header.
pub const FORMAT_VERSION: &str = "1.0.0";

/// The only passphrase KDF understood by this build.
pub const KDF_ARGON2ID: &str = "argon2id";

/// Segment cipher suite, identified on the wire by a string constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// AES-256-GCM segments keyed by an HKDF-SHA256 sub-key, 1 MiB plaintext segments
    Aes256GcmHkdf1Mb,
}

impl Algorithm {
    pub fn id(self) -> &'static str {
        match self {
            Algorithm::Aes256GcmHkdf1Mb => "AES256-GCM-HKDF-1MB",
        }
    }

    /// Plaintext bytes per interior segment.
    pub fn segment_size(self) -> usize {
        match self {
            Algorithm::Aes256GcmHkdf1Mb => 1024 * 1024,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "AES256-GCM-HKDF-1MB" => Some(Algorithm::Aes256GcmHkdf1Mb),
            _ => None,
        }
    }
}

/// Payload framing after the header line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Raw ciphertext bytes
    #[default]
    Binary,
    /// Standard base64, text-safe but a third larger
    Base64,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Binary => "binary",
            Format::Base64 => "base64",
        }
    }

    /// Parse the header's `format` field. Older streams omit it, and those were
    /// always base64.
    pub fn from_header_field(value: &str) -> JfcryptResult<Self> {
        match value {
            "" | "base64" => Ok(Format::Base64),
            "binary" => Ok(Format::Binary),
            other => Err(JfcryptError::input_format(format!(
                "unsupported format: {other}"
            ))),
        }
    }
}

/// Argon2id block of the header. Field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfBlock {
    pub algorithm: String,
    /// Base64 of the Argon2 salt (not the stream salt inside the payload)
    pub salt: String,
    pub time: u32,
    /// Memory cost in KiB
    pub memory: u32,
    pub threads: u32,
    pub keylen: u32,
}

impl KdfBlock {
    pub fn argon2id(salt: &[u8], time: u32, memory: u32, threads: u32, keylen: u32) -> Self {
        Self {
            algorithm: KDF_ARGON2ID.to_string(),
            salt: STANDARD.encode(salt),
            time,
            memory,
            threads,
            keylen,
        }
    }

    pub fn decode_salt(&self) -> JfcryptResult<Vec<u8>> {
        STANDARD
            .decode(&self.salt)
            .map_err(|e| JfcryptError::input_format(format!("invalid salt encoding: {e}")))
    }
}

/// Stream metadata, serialized as the first line of every encrypted stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: String,
    pub algorithm: String,
    #[serde(default)]
    pub format: String,
    pub kdf: KdfBlock,
}

impl Header {
    pub fn new(algorithm: Algorithm, format: Format, kdf: KdfBlock) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            algorithm: algorithm.id().to_string(),
            format: format.as_str().to_string(),
            kdf,
        }
    }

    /// Serialize to a single newline-terminated JSON record.
    pub fn to_line(&self) -> JfcryptResult<Vec<u8>> {
        let mut line = serde_json::to_vec(self).map_err(|e| JfcryptError::Io(e.into()))?;
        line.push(b'\n');
        Ok(line)
    }

    pub fn parse_line(line: &[u8]) -> JfcryptResult<Self> {
        serde_json::from_slice(line).map_err(|e| {
            JfcryptError::input_format(format!(
                "failed to parse header (is it a valid jfcrypt file?): {e}"
            ))
        })
    }

    /// Check every identifier against the supported constants.
    ///
    /// Runs before any key derivation so that garbage input never costs an
    /// Argon2 evaluation.
    pub fn validate(&self) -> JfcryptResult<(Algorithm, Format)> {
        if self.version.is_empty() {
            return Err(JfcryptError::input_format(
                "invalid jfcrypt file: missing version",
            ));
        }
        if self.algorithm.is_empty() {
            return Err(JfcryptError::input_format(
                "invalid jfcrypt file: missing algorithm",
            ));
        }
        let algorithm = Algorithm::from_id(&self.algorithm).ok_or_else(|| {
            JfcryptError::input_format(format!("unsupported algorithm: {}", self.algorithm))
        })?;
        if self.kdf.algorithm != KDF_ARGON2ID {
            return Err(JfcryptError::input_format(format!(
                "unsupported KDF: {}",
                self.kdf.algorithm
            )));
        }
        let format = Format::from_header_field(&self.format)?;
        Ok((algorithm, format))
    }
}
