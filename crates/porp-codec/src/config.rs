//! Codec configuration
//!
//! Loaded from TOML; every field is optional and defaults reproduce the
//! legacy behaviour:
//!
//! ```toml
//! write_mode = "encrypted"          # or "legacy_plaintext"
//! max_file_size = 268435456
//! data_table_name = "Table1"
//!
//! [keys.object_graph]
//! key = "00112233445566778899aabbccddeeff"
//! iv  = "00112233445566778899aabbccddeeff"
//! ```

use crate::error::ConfigError;
use crate::keys::{CipherKeyMaterial, KeyProfiles};
use crate::tabular::DEFAULT_TABLE_NAME;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default maximum container size accepted on read (256 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// How payloads are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Encrypt and Base64 the payload; files read back with the same codec
    #[default]
    Encrypted,
    /// Frame plaintext markup directly, as the legacy writer did
    ///
    /// Files written this way fail `read_*` with a decryption error and must
    /// be read with `read_raw` plus a grammar decode.
    LegacyPlaintext,
}

/// Runtime configuration for [`crate::ContainerCodec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Payload handling on write
    pub write_mode: WriteMode,
    /// Largest file accepted on read, in bytes
    pub max_file_size: u64,
    /// Table element name used when writing data files
    pub data_table_name: String,
    /// Injected key material
    pub keys: KeyProfiles,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            data_table_name: DEFAULT_TABLE_NAME.to_string(),
            keys: KeyProfiles::default(),
        }
    }
}

impl CodecConfig {
    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// - `ConfigError::Parse` on TOML or schema errors
    /// - `ConfigError::InvalidHex` / `InvalidKeyMaterial` on bad keys
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let defaults = KeyProfiles::default();

        let keys = KeyProfiles {
            object_graph: match file.keys.object_graph {
                Some(entry) => entry.resolve("keys.object_graph", &[16, 32])?,
                None => defaults.object_graph,
            },
            legacy_export: match file.keys.legacy_export {
                Some(entry) => entry.resolve("keys.legacy_export", &[32])?,
                None => defaults.legacy_export,
            },
        };

        Ok(Self {
            write_mode: file.write_mode,
            max_file_size: file.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE),
            data_table_name: file
                .data_table_name
                .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            keys,
        })
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`CodecConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Set write mode
    #[inline]
    #[must_use]
    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Replace key material
    #[inline]
    #[must_use]
    pub fn with_keys(mut self, keys: KeyProfiles) -> Self {
        self.keys = keys;
        self
    }

    /// Set maximum accepted file size
    #[inline]
    #[must_use]
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    write_mode: WriteMode,
    max_file_size: Option<u64>,
    data_table_name: Option<String>,
    keys: KeysSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct KeysSection {
    object_graph: Option<KeyEntry>,
    legacy_export: Option<KeyEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyEntry {
    key: String,
    iv: String,
}

impl KeyEntry {
    fn resolve(&self, field: &str, key_lens: &[usize]) -> Result<CipherKeyMaterial, ConfigError> {
        let decode = |name: &str, value: &str| {
            hex::decode(value.trim()).map_err(|source| ConfigError::InvalidHex {
                field: format!("{field}.{name}"),
                source,
            })
        };
        let key = decode("key", &self.key)?;
        let iv = decode("iv", &self.iv)?;

        if !key_lens.contains(&key.len()) {
            return Err(ConfigError::InvalidKeyMaterial {
                field: format!("{field}.key"),
                message: format!("expected {key_lens:?} bytes, got {}", key.len()),
            });
        }
        CipherKeyMaterial::new(&key, &iv).map_err(|e| ConfigError::InvalidKeyMaterial {
            field: field.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config = CodecConfig::from_toml_str("").unwrap();
        assert_eq!(config, CodecConfig::default());
        assert_eq!(config.write_mode, WriteMode::Encrypted);
        assert_eq!(config.data_table_name, "Table1");
    }

    #[test]
    fn parses_write_mode_and_keys() {
        let text = r#"
            write_mode = "legacy_plaintext"
            max_file_size = 1024

            [keys.object_graph]
            key = "000102030405060708090a0b0c0d0e0f"
            iv = "0f0e0d0c0b0a09080706050403020100"
        "#;
        let config = CodecConfig::from_toml_str(text).unwrap();

        assert_eq!(config.write_mode, WriteMode::LegacyPlaintext);
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.keys.object_graph.key(), &(0u8..16).collect::<Vec<_>>()[..]);
        assert_eq!(config.keys.object_graph.iv()[0], 0x0f);
        assert_eq!(
            config.keys.legacy_export,
            CipherKeyMaterial::builtin_legacy_export()
        );
    }

    #[test]
    fn rejects_bad_hex() {
        let text = "[keys.object_graph]\nkey = \"zz\"\niv = \"00\"\n";
        let err = CodecConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHex { ref field, .. } if field == "keys.object_graph.key"));
    }

    #[test]
    fn legacy_export_requires_256_bit_key() {
        let text = format!(
            "[keys.legacy_export]\nkey = \"{}\"\niv = \"{}\"\n",
            "00".repeat(16),
            "00".repeat(16)
        );
        let err = CodecConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKeyMaterial { .. }));
    }

    #[test]
    fn rejects_short_iv() {
        let text = format!(
            "[keys.object_graph]\nkey = \"{}\"\niv = \"{}\"\n",
            "00".repeat(16),
            "00".repeat(8)
        );
        assert!(CodecConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            CodecConfig::from_toml_str("encrypt_on_write = true"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = CodecConfig::from_file("/nonexistent/porp.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn builder_overrides() {
        let config = CodecConfig::default()
            .with_write_mode(WriteMode::LegacyPlaintext)
            .with_max_file_size(10);
        assert_eq!(config.write_mode, WriteMode::LegacyPlaintext);
        assert_eq!(config.max_file_size, 10);
    }
}
