//! Decrypt-only legacy export path
//!
//! One legacy export format bypasses framing and Base64 entirely:
//!
//! ```text
//! [29 opaque header bytes][raw AES-256-CBC ciphertext of UTF-16LE text]
//! ```
//!
//! The header is discarded unread. No writer produces this format any more,
//! so there is no encode counterpart.

use crate::cipher::CipherCodec;
use crate::error::{CodecResult, ContainerError};

/// Length of the opaque header preceding the ciphertext
pub const LEGACY_EXPORT_HEADER_LEN: usize = 29;

/// Decrypt a legacy export file held in memory
///
/// `codec` must carry the 32-byte export key profile.
///
/// # Errors
/// - `ContainerError::TruncatedFile` if fewer than 29 bytes
/// - `CipherError` variants if the ciphertext or plaintext is invalid
pub fn decrypt_legacy_export(bytes: &[u8], codec: &CipherCodec) -> CodecResult<String> {
    let ciphertext = bytes.get(LEGACY_EXPORT_HEADER_LEN..).ok_or_else(|| {
        ContainerError::truncated(LEGACY_EXPORT_HEADER_LEN, bytes.len())
    })?;
    tracing::debug!(
        ciphertext_len = ciphertext.len(),
        key = %codec.material().fingerprint(),
        "decrypting legacy export"
    );
    Ok(codec.decrypt_raw(ciphertext)?)
}
