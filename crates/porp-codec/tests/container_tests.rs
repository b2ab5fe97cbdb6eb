//! Container read/write tests
//!
//! File-level behaviour of [`ContainerCodec`] against hand-built fixtures.

use porp_codec::prelude::*;
use porp_codec::{CipherError, ContainerError, PayloadError};
use porp_test_utils::*;
use pretty_assertions::assert_eq;

#[test]
fn test_read_binary_demo_survey() {
    let dir = temp_dir();
    let bytes = binary_container(BIN_HEADER, &encrypted_payload(&survey_xml("Demo")));
    let path = write_fixture(dir.path(), "demo.porps", &bytes);

    let codec = ContainerCodec::default();
    let survey = codec.read_survey(&path).unwrap();
    assert_eq!(survey.survey_name, "Demo");
    assert!(survey.questions.is_empty());

    let raw = codec.read_raw(&path).unwrap();
    assert!(raw.has_header());
    assert_eq!(raw.variant(), Variant::Binary);
    assert!(!raw.exported());
}

#[test]
fn test_read_text_exported_survey() {
    let dir = temp_dir();
    let bytes = text_container(TXT_EXPORT_HEADER, &encrypted_payload(&survey_xml("Exported")));
    let path = write_fixture(dir.path(), "exported.porps", &bytes);

    let codec = ContainerCodec::default();
    let raw = codec.read_raw(&path).unwrap();
    assert_eq!(raw.variant(), Variant::Text);
    assert!(raw.exported());
    assert_eq!(codec.read_survey(&path).unwrap().survey_name, "Exported");
}

#[test]
fn test_headerless_file_read_as_plain_markup() {
    let dir = temp_dir();
    let path = write_fixture(dir.path(), "old.porps", survey_xml("Legacy").as_bytes());

    let codec = ContainerCodec::default();
    let raw = codec.read_raw(&path).unwrap();
    assert!(!raw.has_header());
    assert_eq!(raw.variant(), Variant::Text);
    assert!(!raw.exported());
    assert_eq!(raw.payload(), survey_xml("Legacy"));

    assert_eq!(codec.read_survey(&path).unwrap().survey_name, "Legacy");
}

#[test]
fn test_survey_roundtrip_all_headers() {
    let dir = temp_dir();
    let codec = ContainerCodec::default();
    let survey = sample_survey();

    for (i, variant) in [Variant::Binary, Variant::Text].into_iter().enumerate() {
        for exported in [false, true] {
            let path = dir.path().join(format!("s{i}{exported}.porps"));
            let header = ContainerHeader::new(variant, exported);
            codec.write_survey(&path, &survey, header).unwrap();

            let raw = codec.read_raw(&path).unwrap();
            assert_eq!(raw.header(), header);
            assert_eq!(codec.read_survey(&path).unwrap(), survey);
        }
    }
}

#[test]
fn test_binary_write_layout() {
    let codec = ContainerCodec::default();
    let bytes = codec
        .encode_survey_bytes(&sample_survey(), ContainerHeader::new(Variant::Binary, false))
        .unwrap();

    assert_eq!(bytes[0], 25);
    assert_eq!(&bytes[1..26], BIN_HEADER.as_bytes());
    // Second frame holds Base64 only
    let mut offset = 26;
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let b = bytes[offset];
        offset += 1;
        len |= usize::from(b & 0x7F) << shift;
        shift += 7;
        if b & 0x80 == 0 {
            break;
        }
    }
    assert_eq!(bytes.len(), offset + len);
    assert!(bytes[offset..]
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')));
}

#[test]
fn test_text_write_layout() {
    let codec = ContainerCodec::default();
    let bytes = codec
        .encode_project_bytes(&sample_project(), ContainerHeader::new(Variant::Text, false))
        .unwrap();
    assert!(bytes.starts_with(TXT_HEADER.as_bytes()));
    assert!(!bytes[25..].contains(&b'<'));
}

#[test]
fn test_project_roundtrip() {
    let dir = temp_dir();
    let codec = ContainerCodec::default();
    let path = dir.path().join("tracker.porp");
    let project = sample_project();

    codec.write_project(&path, &project, ContainerHeader::default()).unwrap();
    let read = codec.read_project(&path).unwrap();
    assert_eq!(read, project);
    assert!(read.is_weighted());
}

#[test]
fn test_data_roundtrip_three_rows() {
    let dir = temp_dir();
    let codec = ContainerCodec::default();
    let path = dir.path().join("tracker.porpd");
    let matrix = sample_matrix();

    codec.write_data(&path, &matrix, ContainerHeader::default()).unwrap();
    let read = codec.read_data(&path).unwrap();
    assert_eq!(read.row_count(), 4);
    assert_eq!(read.header(), &["RespID", "Q1", "Q2"]);
    assert_eq!(read.cell(1, 2), Some(""));
    assert_eq!(read, matrix);
}

#[test]
fn test_data_from_foreign_dataset() {
    let xml = r#"<?xml version="1.0" standalone="yes"?>
<NewDataSet>
  <Table1><A>1</A><B>x</B><C>y</C></Table1>
  <Table1><A>2</A><C>z</C></Table1>
  <Table1><A>3</A><B /></Table1>
</NewDataSet>"#;
    let bytes = binary_container(BIN_HEADER, &encrypted_payload(xml));

    let matrix = ContainerCodec::default().decode_data_bytes(&bytes).unwrap();
    assert_eq!(matrix.row_count(), 4);
    assert_eq!(matrix.column_count(), 3);
    assert_eq!(matrix.data_rows()[1], vec!["2", "", "z"]);
}

#[test]
fn test_legacy_plaintext_write_is_asymmetric() {
    let dir = temp_dir();
    let config = CodecConfig::default().with_write_mode(WriteMode::LegacyPlaintext);
    let codec = ContainerCodec::new(config);
    let path = dir.path().join("plain.porps");

    codec.write_survey(&path, &sample_survey(), ContainerHeader::default()).unwrap();

    let err = codec.read_survey(&path).unwrap_err();
    assert!(err.is_decryption_error());

    let raw = codec.read_raw(&path).unwrap();
    assert!(raw.has_header());
    let survey = porp_codec::object_graph::decode_survey(raw.payload()).unwrap();
    assert_eq!(survey, sample_survey());
}

#[test]
fn test_missing_file() {
    let dir = temp_dir();
    let err = ContainerCodec::default()
        .read_survey(dir.path().join("absent.porps"))
        .unwrap_err();
    assert!(matches!(err, CodecError::FileNotFound(_)));
}

#[test]
fn test_missing_output_directory() {
    let dir = temp_dir();
    let path = dir.path().join("no_such_dir").join("out.porps");
    let err = ContainerCodec::default()
        .write_survey(&path, &sample_survey(), ContainerHeader::default())
        .unwrap_err();
    assert!(matches!(err, CodecError::DirectoryNotFound(_)));
    assert!(!path.exists());
}

#[test]
fn test_truncated_file() {
    let dir = temp_dir();
    let path = write_fixture(dir.path(), "short.porps", b"PORPOISE_BIN/EXPORT");
    let err = ContainerCodec::default().read_raw(&path).unwrap_err();
    assert!(matches!(
        err,
        CodecError::Container(ContainerError::TruncatedFile { expected: 25, actual: 19 })
    ));
}

#[test]
fn test_cut_binary_frame() {
    let mut bytes = binary_container(BIN_HEADER, &encrypted_payload(&survey_xml("Demo")));
    bytes.truncate(bytes.len() - 10);
    let err = ContainerCodec::default().decode_survey_bytes(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::Container(ContainerError::MalformedFrame(_))));
}

#[test]
fn test_file_too_large() {
    let dir = temp_dir();
    let bytes = binary_container(BIN_HEADER, &encrypted_payload(&survey_xml("Demo")));
    let path = write_fixture(dir.path(), "big.porps", &bytes);

    let codec = ContainerCodec::new(CodecConfig::default().with_max_file_size(16));
    let err = codec.read_survey(&path).unwrap_err();
    assert!(matches!(err, CodecError::FileTooLarge { max: 16, .. }));
}

#[test]
fn test_wrong_key_is_decryption_error() {
    let bytes = binary_container(BIN_HEADER, &encrypted_payload(&survey_xml("Demo")));
    let other = porp_codec::CipherKeyMaterial::new(&[7u8; 16], &[9u8; 16]).unwrap();
    let keys = porp_codec::KeyProfiles {
        object_graph: other,
        ..porp_codec::KeyProfiles::default()
    };
    let codec = ContainerCodec::new(CodecConfig::default().with_keys(keys));

    // Garbage plaintext can occasionally pass padding; it still never parses
    let err = codec.decode_survey_bytes(&bytes).unwrap_err();
    assert!(
        err.is_decryption_error() || matches!(err, CodecError::Payload(_)),
        "unexpected error: {err}"
    );
}

#[test]
fn test_headered_non_base64_payload() {
    let bytes = text_container(TXT_HEADER, "<Survey><SurveyName>x</SurveyName></Survey>");
    let err = ContainerCodec::default().decode_survey_bytes(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::Cipher(CipherError::InvalidBase64(_))));
}

#[test]
fn test_data_payload_without_table() {
    let bytes = binary_container(BIN_HEADER, &encrypted_payload("<NewDataSet />"));
    let err = ContainerCodec::default().decode_data_bytes(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::Payload(PayloadError::NoTableFound)));
}

#[test]
fn test_read_legacy_export() {
    let dir = temp_dir();
    let path = write_fixture(
        dir.path(),
        "export.dat",
        &legacy_export_file("<Export><Row>1</Row></Export>"),
    );
    let text = ContainerCodec::default().read_legacy_export(&path).unwrap();
    assert_eq!(text, "<Export><Row>1</Row></Export>");
}

#[test]
fn test_legacy_export_too_short() {
    let dir = temp_dir();
    let path = write_fixture(dir.path(), "export.dat", &[0u8; 20]);
    let err = ContainerCodec::default().read_legacy_export(&path).unwrap_err();
    assert!(matches!(
        err,
        CodecError::Container(ContainerError::TruncatedFile { expected: 29, actual: 20 })
    ));
}
