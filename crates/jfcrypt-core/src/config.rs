use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{JfcryptError, JfcryptResult};
use crate::types::Format;

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JfcryptConfig {
    pub kdf: KdfConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

/// Argon2id cost parameters used for new streams.
///
/// Decryption never reads these: it uses whatever the stream header recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB (default: 1048576 = 1 GiB)
    pub memory_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: 1024 * 1024,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfConfig {
    pub fn validate(&self) -> JfcryptResult<()> {
        if self.time_cost < 1 {
            return Err(JfcryptError::Config(
                "kdf.time_cost must be at least 1".into(),
            ));
        }
        if self.memory_kib < 1024 {
            return Err(JfcryptError::Config(
                "kdf.memory_kib must be at least 1024 (1 MB)".into(),
            ));
        }
        if self.parallelism < 1 {
            return Err(JfcryptError::Config(
                "kdf.parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Payload framing for new streams: "binary" or "base64"
    pub format: Format,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn, so pipes stay quiet)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl JfcryptConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> JfcryptResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| JfcryptError::Config(format!("reading {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| JfcryptError::Config(format!("parsing {}: {e}", path.display())))?;
        config.kdf.validate()?;
        Ok(config)
    }
}

/// `~/.config/jfcrypt/config.toml`
pub fn default_config_path() -> PathBuf {
    home_dir().join(".config/jfcrypt/config.toml")
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_prefix("~/")) {
        Some(rest) => home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[kdf]
memory_kib = 262144
time_cost = 4
parallelism = 2

[output]
format = "base64"

[log]
level = "debug"
format = "json"
"#;
        let config: JfcryptConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.kdf.memory_kib, 262144);
        assert_eq!(config.kdf.time_cost, 4);
        assert_eq!(config.kdf.parallelism, 2);
        assert_eq!(config.output.format, Format::Base64);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: JfcryptConfig = toml::from_str("").unwrap();

        assert_eq!(config.kdf.memory_kib, 1_048_576);
        assert_eq!(config.kdf.time_cost, 3);
        assert_eq!(config.kdf.parallelism, 4);
        assert_eq!(config.output.format, Format::Binary);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: JfcryptConfig = toml::from_str("[kdf]\ntime_cost = 5\n").unwrap();

        // Overridden
        assert_eq!(config.kdf.time_cost, 5);
        // Defaults
        assert_eq!(config.kdf.memory_kib, 1_048_576);
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = JfcryptConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.kdf.time_cost, 3);
    }

    #[test]
    fn test_load_rejects_zero_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[kdf]\ntime_cost = 0\n").unwrap();

        let err = JfcryptConfig::load(&path).unwrap_err();
        assert!(matches!(err, JfcryptError::Config(_)));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[kdf\nmemory_kib = ").unwrap();

        assert!(matches!(
            JfcryptConfig::load(&path),
            Err(JfcryptError::Config(_))
        ));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = JfcryptConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: JfcryptConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.kdf.memory_kib, parsed.kdf.memory_kib);
        assert_eq!(config.output.format, parsed.output.format);
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde(Path::new("~/.config/jfcrypt/config.toml"));
        assert!(!expanded.to_str().unwrap().starts_with("~/"));
        assert_eq!(expand_tilde(Path::new("/etc/x")), PathBuf::from("/etc/x"));
    }
}
