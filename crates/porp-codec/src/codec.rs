//! Container codec - main entry point
//!
//! Composes the layers for each artifact family:
//!
//! ```text
//! read:  bytes → classify → unframe → decrypt → Grammar A / B → value
//! write: value → Grammar A / B → encrypt → frame → bytes
//! ```
//!
//! Payloads are decrypted only when the file carries a header; header-less
//! legacy files hold plain markup.

use crate::cipher::CipherCodec;
use crate::config::{CodecConfig, WriteMode};
use crate::error::{CodecError, CodecResult};
use crate::frame::{read_container, write_container};
use crate::legacy_export::decrypt_legacy_export;
use crate::{object_graph, tabular};
use porp_model::{ContainerHeader, ProjectDocument, RawFile, SurveyDocument, TabularMatrix};
use std::path::Path;

/// Reader/writer for Porpoise containers
///
/// Stateless apart from its configuration; safe to share across threads.
#[derive(Debug, Clone)]
pub struct ContainerCodec {
    config: CodecConfig,
    object_graph: CipherCodec,
    legacy_export: CipherCodec,
}

impl Default for ContainerCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl ContainerCodec {
    /// Create codec from configuration
    #[must_use]
    pub fn new(config: CodecConfig) -> Self {
        tracing::debug!(
            write_mode = ?config.write_mode,
            object_graph_key = %config.keys.object_graph.fingerprint(),
            legacy_export_key = %config.keys.legacy_export.fingerprint(),
            "container codec configured"
        );
        Self {
            object_graph: CipherCodec::new(config.keys.object_graph.clone()),
            legacy_export: CipherCodec::new(config.keys.legacy_export.clone()),
            config,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    // --- file entry points ---

    /// Read a container shell without decrypting its payload
    ///
    /// # Errors
    /// - `CodecError::FileNotFound` / `Io` / `FileTooLarge` on file access
    /// - `ContainerError` variants on truncation or bad framing
    pub fn read_raw(&self, path: impl AsRef<Path>) -> CodecResult<RawFile> {
        let bytes = self.read_file(path.as_ref())?;
        Ok(read_container(&bytes)?)
    }

    /// Read a survey definition (`.porps`)
    ///
    /// # Errors
    /// Any error of [`ContainerCodec::read_raw`], plus decryption and
    /// payload errors.
    pub fn read_survey(&self, path: impl AsRef<Path>) -> CodecResult<SurveyDocument> {
        let bytes = self.read_file(path.as_ref())?;
        self.decode_survey_bytes(&bytes)
    }

    /// Read project metadata (`.porp`)
    ///
    /// # Errors
    /// Any error of [`ContainerCodec::read_raw`], plus decryption and
    /// payload errors.
    pub fn read_project(&self, path: impl AsRef<Path>) -> CodecResult<ProjectDocument> {
        let bytes = self.read_file(path.as_ref())?;
        self.decode_project_bytes(&bytes)
    }

    /// Read respondent data (`.porpd`), keeping every data row
    ///
    /// # Errors
    /// Any error of [`ContainerCodec::read_raw`], plus decryption and
    /// payload errors (`NoTableFound` if the dataset is empty).
    pub fn read_data(&self, path: impl AsRef<Path>) -> CodecResult<TabularMatrix> {
        let bytes = self.read_file(path.as_ref())?;
        self.decode_data_bytes(&bytes)
    }

    /// Read a 29-byte-header legacy export into its plaintext
    ///
    /// # Errors
    /// File access errors, `TruncatedFile` below 29 bytes, or decryption
    /// errors.
    pub fn read_legacy_export(&self, path: impl AsRef<Path>) -> CodecResult<String> {
        let bytes = self.read_file(path.as_ref())?;
        decrypt_legacy_export(&bytes, &self.legacy_export)
    }

    /// Write a survey definition
    ///
    /// # Errors
    /// - `CodecError::DirectoryNotFound` if the parent directory is missing
    /// - payload, cipher or I/O errors
    pub fn write_survey(
        &self,
        path: impl AsRef<Path>,
        survey: &SurveyDocument,
        header: ContainerHeader,
    ) -> CodecResult<()> {
        let bytes = self.encode_survey_bytes(survey, header)?;
        write_file(path.as_ref(), &bytes)
    }

    /// Write project metadata
    ///
    /// # Errors
    /// Same as [`ContainerCodec::write_survey`].
    pub fn write_project(
        &self,
        path: impl AsRef<Path>,
        project: &ProjectDocument,
        header: ContainerHeader,
    ) -> CodecResult<()> {
        let bytes = self.encode_project_bytes(project, header)?;
        write_file(path.as_ref(), &bytes)
    }

    /// Write respondent data
    ///
    /// # Errors
    /// Same as [`ContainerCodec::write_survey`].
    pub fn write_data(
        &self,
        path: impl AsRef<Path>,
        matrix: &TabularMatrix,
        header: ContainerHeader,
    ) -> CodecResult<()> {
        let bytes = self.encode_data_bytes(matrix, header)?;
        write_file(path.as_ref(), &bytes)
    }

    // --- in-memory entry points ---

    /// Recover the plaintext payload of a container
    ///
    /// # Errors
    /// Container or decryption errors.
    pub fn decode_payload_bytes(&self, bytes: &[u8]) -> CodecResult<String> {
        let raw = read_container(bytes)?;
        self.decrypt_payload(raw)
    }

    /// # Errors
    /// Container, decryption or payload errors.
    pub fn decode_survey_bytes(&self, bytes: &[u8]) -> CodecResult<SurveyDocument> {
        let plaintext = self.decode_payload_bytes(bytes)?;
        Ok(object_graph::decode_survey(&plaintext)?)
    }

    /// # Errors
    /// Container, decryption or payload errors.
    pub fn decode_project_bytes(&self, bytes: &[u8]) -> CodecResult<ProjectDocument> {
        let plaintext = self.decode_payload_bytes(bytes)?;
        Ok(object_graph::decode_project(&plaintext)?)
    }

    /// # Errors
    /// Container, decryption or payload errors.
    pub fn decode_data_bytes(&self, bytes: &[u8]) -> CodecResult<TabularMatrix> {
        let plaintext = self.decode_payload_bytes(bytes)?;
        Ok(tabular::decode(&plaintext)?)
    }

    /// # Errors
    /// Payload or cipher errors.
    pub fn encode_survey_bytes(
        &self,
        survey: &SurveyDocument,
        header: ContainerHeader,
    ) -> CodecResult<Vec<u8>> {
        let plaintext = object_graph::encode_survey(survey)?;
        self.seal_payload(&plaintext, header)
    }

    /// # Errors
    /// Payload or cipher errors.
    pub fn encode_project_bytes(
        &self,
        project: &ProjectDocument,
        header: ContainerHeader,
    ) -> CodecResult<Vec<u8>> {
        let plaintext = object_graph::encode_project(project)?;
        self.seal_payload(&plaintext, header)
    }

    /// # Errors
    /// Payload or cipher errors.
    pub fn encode_data_bytes(
        &self,
        matrix: &TabularMatrix,
        header: ContainerHeader,
    ) -> CodecResult<Vec<u8>> {
        let plaintext = tabular::encode(matrix, &self.config.data_table_name)?;
        self.seal_payload(&plaintext, header)
    }

    fn decrypt_payload(&self, raw: RawFile) -> CodecResult<String> {
        if !raw.has_header() {
            return Ok(raw.into_payload());
        }
        tracing::debug!(
            variant = %raw.variant(),
            exported = raw.exported(),
            payload_len = raw.payload().len(),
            "decrypting container payload"
        );
        Ok(self.object_graph.decrypt(raw.payload())?)
    }

    fn seal_payload(&self, plaintext: &str, header: ContainerHeader) -> CodecResult<Vec<u8>> {
        let payload = match self.config.write_mode {
            WriteMode::Encrypted => self.object_graph.encrypt(plaintext)?,
            WriteMode::LegacyPlaintext => {
                tracing::debug!("writing plaintext payload (legacy write mode)");
                plaintext.to_string()
            }
        };
        Ok(write_container(header, &payload)?)
    }

    fn read_file(&self, path: &Path) -> CodecResult<Vec<u8>> {
        let metadata = std::fs::metadata(path).map_err(|e| CodecError::io_error(path, e))?;
        if metadata.len() > self.config.max_file_size {
            return Err(CodecError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                max: self.config.max_file_size,
            });
        }
        let bytes = std::fs::read(path).map_err(|e| CodecError::io_error(path, e))?;
        tracing::debug!(path = %path.display(), len = bytes.len(), "read container");
        Ok(bytes)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> CodecResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(CodecError::DirectoryNotFound(parent.to_path_buf()));
        }
    }
    std::fs::write(path, bytes).map_err(|e| CodecError::io_error(path, e))?;
    tracing::debug!(path = %path.display(), len = bytes.len(), "wrote container");
    Ok(())
}
