//! Container framing
//!
//! Two on-disk encodings carry the same logical `header ++ payload` text:
//!
//! ```text
//! Binary:  [varint len][header UTF-8][varint len][payload UTF-8]
//! Text:    header payload (one contiguous text stream, no prefixes)
//! ```
//!
//! Lengths are 7-bit groups, least significant first, high bit set on all
//! but the last byte (at most five bytes for a 32-bit count).
//!
//! Both encodings converge on a [`RawFile`] after reading.

use crate::error::ContainerError;
use crate::header::{classify, Classification};
use porp_model::{ContainerHeader, RawFile, Variant, HEADER_LEN};

/// Maximum bytes in a 32-bit 7-bit-encoded length
const MAX_VARINT_BYTES: usize = 5;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decode a complete container into its shell
///
/// # Errors
/// - `ContainerError::TruncatedFile` if shorter than the header
/// - `ContainerError::MalformedFrame` if binary frames are cut short, or
///   frames or text content hold invalid UTF-8
pub fn read_container(bytes: &[u8]) -> Result<RawFile, ContainerError> {
    if bytes.len() < HEADER_LEN {
        return Err(ContainerError::truncated(HEADER_LEN, bytes.len()));
    }

    if is_binary_framed(bytes) {
        read_binary(bytes)
    } else {
        read_text(bytes)
    }
}

/// Encode a container shell for writing
///
/// The header is rendered from `header`; no input header is ever copied.
///
/// # Errors
/// Returns `ContainerError::MalformedFrame` if the payload is too large for
/// a 32-bit length prefix.
pub fn write_container(header: ContainerHeader, payload: &str) -> Result<Vec<u8>, ContainerError> {
    let rendered = header.render();
    match header.variant {
        Variant::Binary => {
            let mut out = Vec::with_capacity(rendered.len() + payload.len() + 2 * MAX_VARINT_BYTES);
            write_frame(&mut out, &rendered)?;
            write_frame(&mut out, payload)?;
            Ok(out)
        }
        Variant::Text => {
            let mut out = String::with_capacity(rendered.len() + payload.len());
            out.push_str(&rendered);
            out.push_str(payload);
            Ok(out.into_bytes())
        }
    }
}

/// Binary framing starts with the one-byte length of a header frame
fn is_binary_framed(bytes: &[u8]) -> bool {
    bytes.first().copied() == u8::try_from(HEADER_LEN).ok()
        && bytes[1..].starts_with(b"PORPOISE_")
}

fn read_binary(bytes: &[u8]) -> Result<RawFile, ContainerError> {
    let mut reader = FrameReader::new(bytes);
    let header_frame = reader.read_frame()?;
    let payload_frame = reader.read_frame()?;
    if reader.remaining() > 0 {
        tracing::warn!(
            trailing = reader.remaining(),
            "ignoring bytes after payload frame"
        );
    }

    let mut combined = String::with_capacity(header_frame.len() + payload_frame.len());
    combined.push_str(header_frame);
    combined.push_str(payload_frame);

    let (header, payload) = split_header(&combined)
        .ok_or_else(|| ContainerError::malformed_frame("header frame shorter than header"))?;
    match classify(header.as_bytes())? {
        Classification::Headered(header) => Ok(RawFile::new(header, payload)),
        Classification::PlainText => Err(ContainerError::malformed_frame(format!(
            "header frame does not hold an identification header: {header:?}"
        ))),
    }
}

fn read_text(bytes: &[u8]) -> Result<RawFile, ContainerError> {
    let classification = classify(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes))?;

    // BOM-sniffing decode; UTF-8 when no BOM is present
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        return Err(ContainerError::malformed_frame(format!(
            "container text is not valid {}",
            encoding.name()
        )));
    }

    match classification {
        Classification::Headered(header) => {
            let (_, payload) = split_header(&text)
                .ok_or_else(|| ContainerError::truncated(HEADER_LEN, text.chars().count()))?;
            Ok(RawFile::new(header, payload))
        }
        Classification::PlainText => {
            tracing::warn!("container has no identification header, reading as plain text");
            Ok(RawFile::headerless(text.into_owned()))
        }
    }
}

/// Split after the first `HEADER_LEN` characters
fn split_header(text: &str) -> Option<(&str, &str)> {
    let split = match text.char_indices().nth(HEADER_LEN) {
        Some((idx, _)) => idx,
        None if text.chars().count() == HEADER_LEN => text.len(),
        None => return None,
    };
    Some(text.split_at(split))
}

/// Cursor over length-prefixed UTF-8 frames
#[derive(Debug)]
pub struct FrameReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    #[inline]
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes not yet consumed
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Read one 7-bit-encoded length
    ///
    /// # Errors
    /// Returns `ContainerError::MalformedFrame` on a cut-short or over-long
    /// encoding.
    pub fn read_varint(&mut self) -> Result<u32, ContainerError> {
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = *self
                .bytes
                .get(self.pos)
                .ok_or_else(|| ContainerError::malformed_frame("length prefix cut short"))?;
            self.pos += 1;

            let group = u32::from(byte & 0x7F);
            if i == MAX_VARINT_BYTES - 1 && group > 0x0F {
                return Err(ContainerError::malformed_frame("length prefix overflows 32 bits"));
            }
            value |= group << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(ContainerError::malformed_frame("length prefix longer than 5 bytes"))
    }

    /// Read one length-prefixed UTF-8 frame
    ///
    /// # Errors
    /// Returns `ContainerError::MalformedFrame` if the frame is cut short or
    /// not valid UTF-8.
    pub fn read_frame(&mut self) -> Result<&'a str, ContainerError> {
        let len = self.read_varint()? as usize;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                ContainerError::malformed_frame(format!(
                    "frame declares {len} bytes, {} remain",
                    self.remaining()
                ))
            })?;
        let frame = &self.bytes[self.pos..end];
        self.pos = end;
        std::str::from_utf8(frame)
            .map_err(|e| ContainerError::malformed_frame(format!("frame is not UTF-8: {e}")))
    }
}

/// Append a 7-bit-encoded length
pub fn write_varint(out: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        // Truncation keeps the low seven bits plus the continuation flag
        #[allow(clippy::cast_possible_truncation)]
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    #[allow(clippy::cast_possible_truncation)]
    out.push(value as u8);
}

/// Append a length-prefixed UTF-8 frame
///
/// # Errors
/// Returns `ContainerError::MalformedFrame` if `text` exceeds `i32::MAX` bytes.
pub fn write_frame(out: &mut Vec<u8>, text: &str) -> Result<(), ContainerError> {
    let len = i32::try_from(text.len())
        .ok()
        .and_then(|l| u32::try_from(l).ok())
        .ok_or_else(|| ContainerError::malformed_frame("frame larger than 2 GiB"))?;
    write_varint(out, len);
    out.extend_from_slice(text.as_bytes());
    Ok(())
}
