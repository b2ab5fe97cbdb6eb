//! Porpoise container codec
//!
//! Reads and writes the legacy container family used for survey
//! definitions (`.porps`), project metadata (`.porp`) and respondent data
//! (`.porpd`). A container is a 25-character header plus a payload, framed
//! either as two length-prefixed strings (`PORPOISE_BIN`) or as raw text
//! (`PORPOISE_TXT`). The payload is AES-CBC ciphertext of UTF-16 markup,
//! Base64 encoded.
//!
//! # Layers
//!
//! - [`header`] - classify the first 25 bytes
//! - [`frame`] - length-prefixed and text framing
//! - [`cipher`] - AES-CBC + Base64 transport
//! - [`object_graph`] - survey / project markup (Grammar A)
//! - [`tabular`] - DataSet markup (Grammar B)
//! - [`codec`] - file and in-memory entry points
//!
//! # Example
//!
//! ```no_run
//! use porp_codec::prelude::*;
//!
//! let codec = ContainerCodec::default();
//! let survey = codec.read_survey("study.porps")?;
//! println!("{} questions", survey.questions.len());
//! # Ok::<(), CodecError>(())
//! ```

pub mod cipher;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod header;
pub mod keys;
pub mod legacy_export;
pub mod object_graph;
pub mod tabular;

pub use cipher::CipherCodec;
pub use codec::ContainerCodec;
pub use config::{CodecConfig, WriteMode, DEFAULT_MAX_FILE_SIZE};
pub use error::{CipherError, CodecError, CodecResult, ConfigError, ContainerError, PayloadError};
pub use header::{classify, Classification};
pub use keys::{CipherKeyMaterial, KeyProfiles};
pub use legacy_export::LEGACY_EXPORT_HEADER_LEN;
pub use tabular::DataTable;

/// Common imports
pub mod prelude {
    pub use crate::{CodecConfig, CodecError, CodecResult, ContainerCodec, WriteMode};
    pub use porp_model::{
        ContainerHeader, ProjectDocument, QuestionRecord, RawFile, ResponseRecord, SurveyDocument,
        TabularMatrix, Variant,
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn version_is_set() {
        assert!(!super::VERSION.is_empty());
    }

    #[test]
    fn project_roundtrip_through_prelude() {
        let codec = ContainerCodec::default();
        let mut project = ProjectDocument::new("Tracker");
        project.client_name = "Acme".into();

        let bytes = codec
            .encode_project_bytes(&project, ContainerHeader::new(Variant::Text, true))
            .unwrap();
        assert!(bytes.starts_with(b"PORPOISE_TXT/EXPORTFILE=T"));
        assert_eq!(codec.decode_project_bytes(&bytes).unwrap(), project);
    }
}
