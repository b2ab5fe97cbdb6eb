//! Header classification
//!
//! Inspects the first [`HEADER_LEN`] bytes of a container to decide whether
//! it carries an identification header and, if so, which variant and export
//! flag it declares.

use crate::error::ContainerError;
use porp_model::{ContainerHeader, Variant, HEADER_LEN};

const PRODUCT_MARKER: &str = "PORPOISE_";
const EXPORT_MARKER: &str = "EXPORTFILE=";
const VARIANT_SPAN: std::ops::Range<usize> = 0..12;
const EXPORT_SPAN: std::ops::Range<usize> = 13..25;

/// Outcome of header classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A recognized identification header
    Headered(ContainerHeader),
    /// Legacy plain text without a header; the whole file is the payload
    PlainText,
}

impl Classification {
    /// Header flags, synthesizing the plain-text defaults when absent
    #[inline]
    #[must_use]
    pub const fn header(self) -> ContainerHeader {
        match self {
            Self::Headered(header) => header,
            Self::PlainText => ContainerHeader::plain_text(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_headered(self) -> bool {
        matches!(self, Self::Headered(_))
    }
}

/// Classify the leading bytes of a container
///
/// Only the first [`HEADER_LEN`] bytes are inspected; longer slices are
/// accepted so callers can pass the whole file.
///
/// # Errors
/// Returns `ContainerError::TruncatedFile` if fewer than [`HEADER_LEN`]
/// bytes are available.
pub fn classify(bytes: &[u8]) -> Result<Classification, ContainerError> {
    let leading = bytes
        .get(..HEADER_LEN)
        .ok_or_else(|| ContainerError::truncated(HEADER_LEN, bytes.len()))?;
    let text = ascii_lossy(leading);

    if !(text.contains(PRODUCT_MARKER) && text.contains(EXPORT_MARKER)) {
        tracing::debug!("no identification header, treating as plain text");
        return Ok(Classification::PlainText);
    }

    let variant = if &text[VARIANT_SPAN] == Variant::Binary.tag() {
        Variant::Binary
    } else {
        Variant::Text
    };
    let exported = &text[EXPORT_SPAN] == "EXPORTFILE=T";

    tracing::debug!(%variant, exported, "classified container header");
    Ok(Classification::Headered(ContainerHeader::new(variant, exported)))
}

/// Parse a header that must be present
///
/// # Errors
/// - `ContainerError::TruncatedFile` if fewer than [`HEADER_LEN`] bytes
/// - `ContainerError::UnrecognizedHeader` if the markers are absent
pub fn parse_strict(bytes: &[u8]) -> Result<ContainerHeader, ContainerError> {
    match classify(bytes)? {
        Classification::Headered(header) => Ok(header),
        Classification::PlainText => Err(ContainerError::UnrecognizedHeader(ascii_lossy(
            &bytes[..HEADER_LEN],
        ))),
    }
}

/// ASCII decode with non-ASCII bytes replaced by `?`
///
/// Keeps one char per byte so the fixed offsets stay valid.
fn ascii_lossy(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
        .collect()
}
