//! Container shell with the header removed

use crate::header::{ContainerHeader, Variant};

/// Decoded container shell
///
/// Holds the classified header flags and the payload that followed the
/// header. For headered containers the payload is still Base64 ciphertext
/// (or plaintext markup when written by the legacy writer); for header-less
/// legacy files it is the entire file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    header: ContainerHeader,
    has_header: bool,
    payload: String,
}

impl RawFile {
    /// Create shell for a headered container
    #[inline]
    #[must_use]
    pub fn new(header: ContainerHeader, payload: impl Into<String>) -> Self {
        Self {
            header,
            has_header: true,
            payload: payload.into(),
        }
    }

    /// Create shell for a legacy file without a header
    #[inline]
    #[must_use]
    pub fn headerless(content: impl Into<String>) -> Self {
        Self {
            header: ContainerHeader::plain_text(),
            has_header: false,
            payload: content.into(),
        }
    }

    /// Header flags (synthesized for header-less files)
    #[inline]
    #[must_use]
    pub const fn header(&self) -> ContainerHeader {
        self.header
    }

    /// Container variant
    #[inline]
    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.header.variant
    }

    /// Export flag from the header
    #[inline]
    #[must_use]
    pub const fn exported(&self) -> bool {
        self.header.exported
    }

    /// Whether the file carried a recognizable identification header
    #[inline]
    #[must_use]
    pub const fn has_header(&self) -> bool {
        self.has_header
    }

    /// Text following the header
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Consume shell, returning payload
    #[inline]
    #[must_use]
    pub fn into_payload(self) -> String {
        self.payload
    }
}
