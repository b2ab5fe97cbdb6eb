//! Testing utilities for the Porpoise workspace
//!
//! Shared fixtures and hand-built container bytes. Builders here frame bytes
//! directly rather than through `porp_codec::frame` so tests can check the
//! codec against an independent encoding.

#![allow(missing_docs)]

use porp_codec::{CipherCodec, CipherKeyMaterial};
use porp_model::{ProjectDocument, QuestionRecord, ResponseRecord, SurveyDocument, TabularMatrix};
use std::path::{Path, PathBuf};

pub const BIN_HEADER: &str = "PORPOISE_BIN/EXPORTFILE=F";
pub const BIN_EXPORT_HEADER: &str = "PORPOISE_BIN/EXPORTFILE=T";
pub const TXT_HEADER: &str = "PORPOISE_TXT/EXPORTFILE=F";
pub const TXT_EXPORT_HEADER: &str = "PORPOISE_TXT/EXPORTFILE=T";

pub fn sample_question(number: &str, column: &str) -> QuestionRecord {
    QuestionRecord {
        number: number.to_string(),
        label: format!("Question {number}"),
        stem: format!("How do you rate item {number}?"),
        data_column: column.to_string(),
        variable_type: "Single".to_string(),
        data_type: "Integer".to_string(),
        missing_value1: "99".to_string(),
        responses: vec![
            ResponseRecord::new(1, "Poor"),
            ResponseRecord::new(2, "Fair"),
            ResponseRecord::new(3, "Good"),
        ],
        ..QuestionRecord::default()
    }
}

pub fn sample_survey() -> SurveyDocument {
    SurveyDocument {
        survey_name: "Demo".to_string(),
        questions: vec![sample_question("1", "Q1"), sample_question("2", "Q2")],
    }
}

pub fn sample_project() -> ProjectDocument {
    ProjectDocument {
        client_name: "Acme Research".to_string(),
        created_date: "2019-03-01T09:30:00".to_string(),
        modified_date: "2019-04-12T16:05:00".to_string(),
        fieldwork_start: "2019-03-04".to_string(),
        fieldwork_end: "2019-03-29".to_string(),
        weighting_scheme: "RIM".to_string(),
        researcher_name: "J. Smith".to_string(),
        researcher_organisation: "Porpoise Analytics".to_string(),
        ..ProjectDocument::new("Brand Tracker")
    }
}

/// Header plus three respondents
pub fn sample_matrix() -> TabularMatrix {
    let rows = [
        ["RespID", "Q1", "Q2"],
        ["1001", "3", "1"],
        ["1002", "2", ""],
        ["1003", "1", "3"],
    ];
    TabularMatrix::new(
        rows.iter()
            .map(|r| r.iter().map(|c| (*c).to_string()).collect())
            .collect(),
    )
    .unwrap()
}

/// .NET BinaryWriter length prefix
pub fn varint(mut value: usize) -> Vec<u8> {
    let mut out = Vec::new();
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
    out
}

/// Two-frame binary container from header text and payload text
pub fn binary_container(header: &str, payload: &str) -> Vec<u8> {
    let mut out = varint(header.len());
    out.extend_from_slice(header.as_bytes());
    out.extend(varint(payload.len()));
    out.extend_from_slice(payload.as_bytes());
    out
}

/// Text container: header immediately followed by payload
pub fn text_container(header: &str, payload: &str) -> Vec<u8> {
    format!("{header}{payload}").into_bytes()
}

/// Base64 ciphertext of `plaintext` under the built-in key profile
pub fn encrypted_payload(plaintext: &str) -> String {
    object_graph_cipher().encrypt(plaintext).unwrap()
}

pub fn object_graph_cipher() -> CipherCodec {
    CipherCodec::new(CipherKeyMaterial::builtin_object_graph())
}

/// 29 opaque bytes followed by raw export-profile ciphertext
pub fn legacy_export_file(plaintext: &str) -> Vec<u8> {
    let mut out = b"PORPOISE_EXPORT/VERSION=2.0.1".to_vec();
    let cipher = CipherCodec::new(CipherKeyMaterial::builtin_legacy_export());
    out.extend(cipher.encrypt_raw(plaintext).unwrap());
    out
}

/// Minimal Grammar A survey markup
pub fn survey_xml(name: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-16\"?>\n\
         <Survey xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\n  \
         <SurveyName>{name}</SurveyName>\n  <Questions />\n</Survey>"
    )
}

pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}
