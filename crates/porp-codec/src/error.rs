//! Error types for the container codec
//!
//! Provides error handling for:
//! - Container shell operations (header classification, framing)
//! - Cipher operations (Base64 transport, AES-CBC, UTF-16)
//! - Payload grammars (object graph, tabular dataset)
//! - File access on read and write

use porp_model::ShapeError;
use std::path::PathBuf;

/// Errors while classifying or unframing a container
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Fewer bytes than the fixed header length
    #[error("truncated file: expected at least {expected} header bytes, got {actual}")]
    TruncatedFile { expected: usize, actual: usize },

    /// Header required but not recognized
    #[error("unrecognized header: {0:?}")]
    UnrecognizedHeader(String),

    /// Length-prefixed frame could not be read
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

impl ContainerError {
    /// Create truncation error
    #[inline]
    #[must_use]
    pub const fn truncated(expected: usize, actual: usize) -> Self {
        Self::TruncatedFile { expected, actual }
    }

    /// Create frame error
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::MalformedFrame(message.into())
    }
}

/// Errors during encryption or decryption
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// Payload is not valid Base64 text
    #[error("decryption failed: invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Ciphertext failed block or padding validation
    #[error("decryption failed: ciphertext padding is invalid")]
    InvalidPadding,

    /// Decrypted bytes are not a UTF-16LE string
    #[error("decryption failed: plaintext is not valid UTF-16: {0}")]
    InvalidUtf16(String),

    /// Key or IV has an unsupported length
    #[error("invalid key material: key {key_len} bytes, iv {iv_len} bytes")]
    InvalidKeyLength { key_len: usize, iv_len: usize },
}

impl CipherError {
    /// Whether this error came from decrypting (as opposed to key setup)
    #[inline]
    #[must_use]
    pub const fn is_decryption_failure(&self) -> bool {
        !matches!(self, Self::InvalidKeyLength { .. })
    }
}

/// Errors interpreting a decrypted payload
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Markup is malformed or lacks a required element
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Dataset document declares no table
    #[error("no table found in dataset payload")]
    NoTableFound,

    /// Decoded rows do not form a rectangular matrix
    #[error("tabular shape error: {0}")]
    Shape(#[from] ShapeError),
}

impl PayloadError {
    /// Create malformed payload error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }
}

/// Errors loading codec configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("io error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or schema error
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Key or IV is not valid hex
    #[error("invalid hex in {field}: {source}")]
    InvalidHex {
        field: String,
        #[source]
        source: hex::FromHexError,
    },

    /// Key or IV has the wrong length
    #[error("invalid key material in {field}: {message}")]
    InvalidKeyMaterial { field: String, message: String },
}

/// Combined codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Header or framing failure
    #[error("container error: {0}")]
    Container(#[from] ContainerError),

    /// Decryption or encryption failure
    #[error("{0}")]
    Cipher(#[from] CipherError),

    /// Grammar decode or encode failure
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Configuration failure
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Input file does not exist
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// Output directory does not exist
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Input exceeds the configured size limit
    #[error("file too large: {path} is {size} bytes (max: {max})")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    /// Any other I/O failure
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CodecError {
    /// Create IO error for path, mapping "not found" to `FileNotFound`
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::FileNotFound(path);
        }
        Self::Io { path, source }
    }

    /// Whether this is a decryption failure (Base64, padding or UTF-16)
    #[inline]
    #[must_use]
    pub fn is_decryption_error(&self) -> bool {
        matches!(self, Self::Cipher(e) if e.is_decryption_failure())
    }
}

/// Result type alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_display() {
        let err = ContainerError::truncated(25, 3);
        assert_eq!(
            err.to_string(),
            "truncated file: expected at least 25 header bytes, got 3"
        );
    }

    #[test]
    fn no_table_display() {
        assert_eq!(
            PayloadError::NoTableFound.to_string(),
            "no table found in dataset payload"
        );
    }

    #[test]
    fn not_found_maps_to_file_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = CodecError::io_error("missing.porps", io);
        assert!(matches!(err, CodecError::FileNotFound(p) if p == PathBuf::from("missing.porps")));
    }

    #[test]
    fn other_io_kept_as_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = CodecError::io_error("locked.porps", io);
        assert!(matches!(err, CodecError::Io { .. }));
    }

    #[test]
    fn decryption_classification() {
        let err: CodecError = CipherError::InvalidPadding.into();
        assert!(err.is_decryption_error());

        let setup: CodecError = CipherError::InvalidKeyLength {
            key_len: 3,
            iv_len: 16,
        }
        .into();
        assert!(!setup.is_decryption_error());
    }

    #[test]
    fn error_conversions() {
        let container: CodecError = ContainerError::malformed_frame("short").into();
        assert!(matches!(container, CodecError::Container(_)));

        let payload: CodecError = PayloadError::malformed("no name").into();
        assert!(matches!(payload, CodecError::Payload(_)));
    }
}
