//! Cipher key material
//!
//! Porpoise containers are encrypted with fixed keys and IVs compiled into
//! every reader and writer. No password or per-file salt is involved, so
//! anyone holding a reader can decrypt every file: the format relies on
//! obscurity, not secrecy.
//!
//! Key material is still passed into the codec as a value (see
//! [`KeyProfiles`]) so that tests and deployments can supply their own.

use crate::error::CipherError;
use sha2::{Digest, Sha256};
use std::fmt;

/// AES block and IV size in bytes
pub const IV_LEN: usize = 16;

/// Built-in object-graph profile (AES-128)
const OBJECT_GRAPH_KEY: [u8; 16] = [
    0x50, 0x6f, 0x72, 0x70, 0x6f, 0x69, 0x73, 0x65, 0x53, 0x75, 0x72, 0x76, 0x65, 0x79, 0x4b, 0x31,
];
const OBJECT_GRAPH_IV: [u8; IV_LEN] = [
    0x12, 0x34, 0x56, 0x78, 0x90, 0xab, 0xcd, 0xef, 0x21, 0x43, 0x65, 0x87, 0x09, 0xba, 0xdc, 0xfe,
];

/// Built-in legacy export profile (AES-256)
const LEGACY_EXPORT_KEY: [u8; 32] = [
    0x50, 0x6f, 0x72, 0x70, 0x6f, 0x69, 0x73, 0x65, 0x45, 0x78, 0x70, 0x6f, 0x72, 0x74, 0x4b, 0x65,
    0x79, 0x32, 0x35, 0x36, 0x2d, 0x4c, 0x65, 0x67, 0x61, 0x63, 0x79, 0x50, 0x61, 0x74, 0x68, 0x21,
];
const LEGACY_EXPORT_IV: [u8; IV_LEN] = [
    0xa1, 0xb2, 0xc3, 0xd4, 0xe5, 0xf6, 0x07, 0x18, 0x29, 0x3a, 0x4b, 0x5c, 0x6d, 0x7e, 0x8f, 0x90,
];

/// One AES key with its fixed IV
///
/// The key is 16 bytes (AES-128) or 32 bytes (AES-256). `Debug` prints a
/// fingerprint only.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKeyMaterial {
    key: Vec<u8>,
    iv: [u8; IV_LEN],
}

impl CipherKeyMaterial {
    /// Create key material from raw bytes
    ///
    /// # Errors
    /// Returns `CipherError::InvalidKeyLength` unless the key is 16 or 32
    /// bytes and the IV is 16 bytes.
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, CipherError> {
        let invalid = || CipherError::InvalidKeyLength {
            key_len: key.len(),
            iv_len: iv.len(),
        };
        if !matches!(key.len(), 16 | 32) {
            return Err(invalid());
        }
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| invalid())?;
        Ok(Self {
            key: key.to_vec(),
            iv,
        })
    }

    /// Built-in 16-byte profile for `.porp` / `.porps` / data artifacts
    #[must_use]
    pub fn builtin_object_graph() -> Self {
        Self {
            key: OBJECT_GRAPH_KEY.to_vec(),
            iv: OBJECT_GRAPH_IV,
        }
    }

    /// Built-in 32-byte profile for the 29-byte-header export path
    #[must_use]
    pub fn builtin_legacy_export() -> Self {
        Self {
            key: LEGACY_EXPORT_KEY.to_vec(),
            iv: LEGACY_EXPORT_IV,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Key size in bits (128 or 256)
    #[inline]
    #[must_use]
    pub fn key_bits(&self) -> usize {
        self.key.len() * 8
    }

    /// Short SHA-256 fingerprint of key and IV, safe to log
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.key);
        hasher.update(self.iv);
        hex::encode(&hasher.finalize()[..8])
    }
}

impl fmt::Debug for CipherKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherKeyMaterial")
            .field("bits", &self.key_bits())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// The two key profiles used by the format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProfiles {
    /// Main 25-byte-header path (surveys, projects, data)
    pub object_graph: CipherKeyMaterial,
    /// Decrypt-only 29-byte-header export path
    pub legacy_export: CipherKeyMaterial,
}

impl Default for KeyProfiles {
    fn default() -> Self {
        Self {
            object_graph: CipherKeyMaterial::builtin_object_graph(),
            legacy_export: CipherKeyMaterial::builtin_legacy_export(),
        }
    }
}
