//! Cipher codec
//!
//! AES-CBC with PKCS7 padding over UTF-16LE plaintext, carried as Base64
//! text inside a container. Key size (128 or 256 bits) follows the supplied
//! [`CipherKeyMaterial`].
//!
//! ```text
//! plaintext ──UTF-16LE──▶ bytes ──AES-CBC/PKCS7──▶ ciphertext ──Base64──▶ payload
//! ```

use crate::error::CipherError;
use crate::keys::CipherKeyMaterial;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const UTF16_BOM: char = '\u{FEFF}';

/// Symmetric cipher plus Base64 transport for one key profile
#[derive(Debug, Clone)]
pub struct CipherCodec {
    material: CipherKeyMaterial,
}

impl CipherCodec {
    #[inline]
    #[must_use]
    pub fn new(material: CipherKeyMaterial) -> Self {
        Self { material }
    }

    /// Key material in use
    #[inline]
    #[must_use]
    pub fn material(&self) -> &CipherKeyMaterial {
        &self.material
    }

    /// Decrypt a Base64 payload into its UTF-16 plaintext
    ///
    /// ASCII whitespace inside the payload (line wrapping) is ignored.
    ///
    /// # Errors
    /// - `CipherError::InvalidBase64` if the payload is not Base64
    /// - `CipherError::InvalidPadding` if the ciphertext fails validation
    /// - `CipherError::InvalidUtf16` if the plaintext bytes are not UTF-16LE
    pub fn decrypt(&self, payload: &str) -> Result<String, CipherError> {
        let compact: Vec<u8> = payload
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let ciphertext = BASE64_STANDARD.decode(compact)?;
        self.decrypt_raw(&ciphertext)
    }

    /// Decrypt raw ciphertext (no Base64 layer) into UTF-16 plaintext
    ///
    /// # Errors
    /// Same as [`CipherCodec::decrypt`] minus the Base64 failure.
    pub fn decrypt_raw(&self, ciphertext: &[u8]) -> Result<String, CipherError> {
        let bytes = self.decrypt_bytes(ciphertext)?;
        utf16le_to_string(&bytes)
    }

    /// Encrypt plaintext into a Base64 payload
    ///
    /// # Errors
    /// Returns `CipherError::InvalidKeyLength` only if the key material is
    /// unusable.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(BASE64_STANDARD.encode(self.encrypt_raw(plaintext)?))
    }

    /// Encrypt plaintext into raw ciphertext (no Base64 layer)
    ///
    /// # Errors
    /// Returns `CipherError::InvalidKeyLength` only if the key material is
    /// unusable.
    pub fn encrypt_raw(&self, plaintext: &str) -> Result<Vec<u8>, CipherError> {
        self.encrypt_bytes(&string_to_utf16le(plaintext))
    }

    fn decrypt_bytes(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let (key, iv) = (self.material.key(), self.material.iv().as_slice());
        let result = match key.len() {
            16 => Aes128CbcDec::new_from_slices(key, iv)
                .map_err(|_| self.key_length_error())?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            32 => Aes256CbcDec::new_from_slices(key, iv)
                .map_err(|_| self.key_length_error())?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            _ => return Err(self.key_length_error()),
        };
        result.map_err(|_| CipherError::InvalidPadding)
    }

    fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let (key, iv) = (self.material.key(), self.material.iv().as_slice());
        match key.len() {
            16 => Ok(Aes128CbcEnc::new_from_slices(key, iv)
                .map_err(|_| self.key_length_error())?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            32 => Ok(Aes256CbcEnc::new_from_slices(key, iv)
                .map_err(|_| self.key_length_error())?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            _ => Err(self.key_length_error()),
        }
    }

    fn key_length_error(&self) -> CipherError {
        CipherError::InvalidKeyLength {
            key_len: self.material.key().len(),
            iv_len: self.material.iv().len(),
        }
    }
}

/// Encode a string as UTF-16LE bytes without a BOM
#[must_use]
pub fn string_to_utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Decode UTF-16LE bytes, dropping a leading BOM
///
/// # Errors
/// Returns `CipherError::InvalidUtf16` on an odd byte count or unpaired
/// surrogate.
pub fn utf16le_to_string(bytes: &[u8]) -> Result<String, CipherError> {
    if bytes.len() % 2 != 0 {
        return Err(CipherError::InvalidUtf16(format!(
            "odd byte count {}",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text = String::from_utf16(&units).map_err(|e| CipherError::InvalidUtf16(e.to_string()))?;
    Ok(match text.strip_prefix(UTF16_BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    })
}
