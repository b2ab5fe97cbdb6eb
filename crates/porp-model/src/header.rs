//! Container identification header
//!
//! Every headered container starts with exactly [`HEADER_LEN`] ASCII
//! characters laid out as:
//!
//! ```text
//! 0         12 13        24
//! PORPOISE_BIN/EXPORTFILE=F
//! └─variant──┘ └──export───┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Length of the identification header in bytes (and characters)
pub const HEADER_LEN: usize = 25;

/// On-disk framing style of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Two length-prefixed UTF-8 frames (header, payload)
    Binary,
    /// Header directly followed by the payload as one text stream
    Text,
}

impl Variant {
    /// The 12-character tag identifying this variant in a header
    #[inline]
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Binary => "PORPOISE_BIN",
            Self::Text => "PORPOISE_TXT",
        }
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => f.write_str("binary"),
            Self::Text => f.write_str("text"),
        }
    }
}

/// Decoded identification header
///
/// The header written on save is always rendered from these two flags,
/// never copied from an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerHeader {
    /// Framing variant
    pub variant: Variant,
    /// Whether the container was produced by an export
    pub exported: bool,
}

impl ContainerHeader {
    /// Create header from flags
    #[inline]
    #[must_use]
    pub const fn new(variant: Variant, exported: bool) -> Self {
        Self { variant, exported }
    }

    /// Header assumed for legacy files that carry none
    #[inline]
    #[must_use]
    pub const fn plain_text() -> Self {
        Self::new(Variant::Text, false)
    }

    /// Render the 25-character header string
    #[must_use]
    pub fn render(&self) -> String {
        let flag = if self.exported { 'T' } else { 'F' };
        format!("{}/EXPORTFILE={flag}", self.variant.tag())
    }
}

impl Default for ContainerHeader {
    fn default() -> Self {
        Self::new(Variant::Binary, false)
    }
}

impl Display for ContainerHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_all_combinations() {
        assert_eq!(
            ContainerHeader::new(Variant::Binary, false).render(),
            "PORPOISE_BIN/EXPORTFILE=F"
        );
        assert_eq!(
            ContainerHeader::new(Variant::Binary, true).render(),
            "PORPOISE_BIN/EXPORTFILE=T"
        );
        assert_eq!(
            ContainerHeader::new(Variant::Text, false).render(),
            "PORPOISE_TXT/EXPORTFILE=F"
        );
        assert_eq!(
            ContainerHeader::new(Variant::Text, true).render(),
            "PORPOISE_TXT/EXPORTFILE=T"
        );
    }

    #[test]
    fn rendered_header_has_fixed_length() {
        for variant in [Variant::Binary, Variant::Text] {
            for exported in [true, false] {
                let rendered = ContainerHeader::new(variant, exported).render();
                assert_eq!(rendered.len(), HEADER_LEN);
                assert_eq!(&rendered[12..13], "/");
            }
        }
    }

    #[test]
    fn plain_text_default() {
        let header = ContainerHeader::plain_text();
        assert_eq!(header.variant, Variant::Text);
        assert!(!header.exported);
    }
}
