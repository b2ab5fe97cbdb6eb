//! Object-graph payload codec (Grammar A)
//!
//! Surveys and projects are serialized as element-per-field markup:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-16"?>
//! <Survey>
//!   <SurveyName>Demo</SurveyName>
//!   <Questions>
//!     <Question>
//!       <Number>1</Number>
//!       ...
//!       <Responses>
//!         <Response><Value>1</Value><Label>Yes</Label><IndexType /></Response>
//!       </Responses>
//!     </Question>
//!   </Questions>
//! </Survey>
//! ```
//!
//! Encoding goes through the private serde wire structs below. Decoding
//! builds an element tree from reader events so leaf text is kept exactly,
//! surrounding whitespace included. Unknown elements are ignored; sibling
//! order is preserved in both directions.

use crate::error::PayloadError;
use porp_model::{ProjectDocument, QuestionRecord, ResponseRecord, SurveyDocument};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-16"?>"#;
const SURVEY_ROOT: &str = "Survey";
const PROJECT_ROOT: &str = "Project";

/// Decode survey markup
///
/// # Errors
/// Returns `PayloadError::MalformedPayload` if the markup is not well
/// formed, the root is not `<Survey>`, `<SurveyName>` is missing, or a
/// response value is not an integer.
pub fn decode_survey(xml: &str) -> Result<SurveyDocument, PayloadError> {
    let root = decode_rooted(xml, SURVEY_ROOT)?;
    let questions = match root.child("Questions") {
        Some(list) => list
            .children_named("Question")
            .map(decode_question)
            .collect::<Result<_, _>>()?,
        None => Vec::new(),
    };
    Ok(SurveyDocument {
        survey_name: root.required_text("SurveyName")?,
        questions,
    })
}

/// Encode survey markup
///
/// # Errors
/// Returns `PayloadError::MalformedPayload` if serialization fails.
pub fn encode_survey(survey: &SurveyDocument) -> Result<String, PayloadError> {
    encode_rooted(&SurveyWire::from(survey))
}

/// Decode project markup
///
/// # Errors
/// Returns `PayloadError::MalformedPayload` if the markup is not well
/// formed, the root is not `<Project>`, or `<ProjectName>` is missing.
pub fn decode_project(xml: &str) -> Result<ProjectDocument, PayloadError> {
    let root = decode_rooted(xml, PROJECT_ROOT)?;
    Ok(ProjectDocument {
        project_name: root.required_text("ProjectName")?,
        client_name: root.text_of("ClientName"),
        created_date: root.text_of("CreatedDate"),
        modified_date: root.text_of("ModifiedDate"),
        fieldwork_start: root.text_of("FieldworkStart"),
        fieldwork_end: root.text_of("FieldworkEnd"),
        weighting_scheme: root.text_of("WeightingScheme"),
        researcher_name: root.text_of("ResearcherName"),
        researcher_organisation: root.text_of("ResearcherOrganisation"),
        researcher_logo: root.text_of("ResearcherLogo"),
    })
}

/// Encode project markup
///
/// # Errors
/// Returns `PayloadError::MalformedPayload` if serialization fails.
pub fn encode_project(project: &ProjectDocument) -> Result<String, PayloadError> {
    encode_rooted(&ProjectWire::from(project))
}

fn decode_question(el: &Element) -> Result<QuestionRecord, PayloadError> {
    let responses = match el.child("Responses") {
        Some(list) => list
            .children_named("Response")
            .map(decode_response)
            .collect::<Result<_, _>>()?,
        None => Vec::new(),
    };
    Ok(QuestionRecord {
        number: el.text_of("Number"),
        label: el.text_of("Label"),
        stem: el.text_of("Stem"),
        data_column: el.text_of("DataColumn"),
        variable_type: el.text_of("VariableType"),
        data_type: el.text_of("DataType"),
        missing_value1: el.text_of("MissingValue1"),
        missing_value2: el.text_of("MissingValue2"),
        missing_value3: el.text_of("MissingValue3"),
        missing_low: el.text_of("MissingLow"),
        missing_high: el.text_of("MissingHigh"),
        responses,
    })
}

fn decode_response(el: &Element) -> Result<ResponseRecord, PayloadError> {
    let raw = el.required_text("Value")?;
    let value = raw
        .trim()
        .parse::<i32>()
        .map_err(|e| PayloadError::malformed(format!("<Value>{raw}</Value> is not an integer: {e}")))?;
    Ok(ResponseRecord {
        value,
        label: el.text_of("Label"),
        index_type: el.text_of("IndexType"),
    })
}

fn decode_rooted(xml: &str, expected_root: &str) -> Result<Element, PayloadError> {
    let root = parse_tree(xml)?;
    if root.name != expected_root {
        return Err(PayloadError::malformed(format!(
            "expected <{expected_root}> root element, found <{}>",
            root.name
        )));
    }
    Ok(root)
}

fn encode_rooted<T: Serialize>(wire: &T) -> Result<String, PayloadError> {
    let mut out = String::from(XML_DECLARATION);
    out.push('\n');
    let mut serializer = quick_xml::se::Serializer::new(&mut out);
    serializer.indent(' ', 2);
    wire.serialize(serializer)
        .map_err(|e| PayloadError::malformed(format!("serialization failed: {e}")))?;
    Ok(out)
}

/// Local name of the first element in a markup document
///
/// # Errors
/// Returns `PayloadError::MalformedPayload` if no element precedes a syntax
/// error or end of input.
pub fn root_element(xml: &str) -> Result<String, PayloadError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => return Ok(local_name(&e)),
            Ok(Event::Eof) => return Err(PayloadError::malformed("document has no root element")),
            Ok(_) => {}
            Err(e) => {
                return Err(PayloadError::malformed(format!(
                    "markup error at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }
}

/// Decoded element: local name, concatenated text, child elements
///
/// `text` is only meaningful for leaves; text between child elements is
/// formatting.
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of child `name`, empty when absent
    fn text_of(&self, name: &str) -> String {
        self.child(name).map(|c| c.text.clone()).unwrap_or_default()
    }

    fn required_text(&self, name: &str) -> Result<String, PayloadError> {
        self.child(name)
            .map(|c| c.text.clone())
            .ok_or_else(|| PayloadError::malformed(format!("<{}> is missing <{name}>", self.name)))
    }
}

fn parse_tree(xml: &str) -> Result<Element, PayloadError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            PayloadError::malformed(format!("markup error at byte {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(e) => stack.push(Element::named(local_name(&e))),
            Event::Empty(e) => attach(&mut stack, &mut root, Element::named(local_name(&e)))?,
            Event::End(_) => {
                if let Some(done) = stack.pop() {
                    attach(&mut stack, &mut root, done)?;
                }
            }
            Event::Text(e) => {
                if let Some(open) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map_err(|err| PayloadError::malformed(format!("bad text: {err}")))?;
                    open.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(PayloadError::malformed(format!("document ends inside <{}>", open.name)));
    }
    root.ok_or_else(|| PayloadError::malformed("document has no root element"))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<(), PayloadError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(el);
    } else if root.is_none() {
        *root = Some(el);
    } else {
        return Err(PayloadError::malformed(format!("second root element <{}>", el.name)));
    }
    Ok(())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

#[derive(Debug, Serialize)]
#[serde(rename = "Survey")]
struct SurveyWire {
    #[serde(rename = "SurveyName")]
    survey_name: String,
    #[serde(rename = "Questions")]
    questions: QuestionsWire,
}

#[derive(Debug, Serialize)]
struct QuestionsWire {
    #[serde(rename = "Question")]
    items: Vec<QuestionWire>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct QuestionWire {
    number: String,
    label: String,
    stem: String,
    data_column: String,
    variable_type: String,
    data_type: String,
    missing_value1: String,
    missing_value2: String,
    missing_value3: String,
    missing_low: String,
    missing_high: String,
    responses: ResponsesWire,
}

#[derive(Debug, Serialize)]
struct ResponsesWire {
    #[serde(rename = "Response")]
    items: Vec<ResponseWire>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseWire {
    value: i32,
    label: String,
    index_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "Project", rename_all = "PascalCase")]
struct ProjectWire {
    project_name: String,
    client_name: String,
    created_date: String,
    modified_date: String,
    fieldwork_start: String,
    fieldwork_end: String,
    weighting_scheme: String,
    researcher_name: String,
    researcher_organisation: String,
    researcher_logo: String,
}

impl From<&SurveyDocument> for SurveyWire {
    fn from(doc: &SurveyDocument) -> Self {
        Self {
            survey_name: doc.survey_name.clone(),
            questions: QuestionsWire {
                items: doc.questions.iter().map(Into::into).collect(),
            },
        }
    }
}

impl From<&QuestionRecord> for QuestionWire {
    fn from(q: &QuestionRecord) -> Self {
        Self {
            number: q.number.clone(),
            label: q.label.clone(),
            stem: q.stem.clone(),
            data_column: q.data_column.clone(),
            variable_type: q.variable_type.clone(),
            data_type: q.data_type.clone(),
            missing_value1: q.missing_value1.clone(),
            missing_value2: q.missing_value2.clone(),
            missing_value3: q.missing_value3.clone(),
            missing_low: q.missing_low.clone(),
            missing_high: q.missing_high.clone(),
            responses: ResponsesWire {
                items: q.responses.iter().map(Into::into).collect(),
            },
        }
    }
}

impl From<&ResponseRecord> for ResponseWire {
    fn from(r: &ResponseRecord) -> Self {
        Self {
            value: r.value,
            label: r.label.clone(),
            index_type: r.index_type.clone(),
        }
    }
}

impl From<&ProjectDocument> for ProjectWire {
    fn from(doc: &ProjectDocument) -> Self {
        Self {
            project_name: doc.project_name.clone(),
            client_name: doc.client_name.clone(),
            created_date: doc.created_date.clone(),
            modified_date: doc.modified_date.clone(),
            fieldwork_start: doc.fieldwork_start.clone(),
            fieldwork_end: doc.fieldwork_end.clone(),
            weighting_scheme: doc.weighting_scheme.clone(),
            researcher_name: doc.researcher_name.clone(),
            researcher_organisation: doc.researcher_organisation.clone(),
            researcher_logo: doc.researcher_logo.clone(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::strategies::{arb_project, arb_survey};
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn sample_survey() -> SurveyDocument {
        SurveyDocument {
            survey_name: "Customer Satisfaction".into(),
            questions: vec![
                QuestionRecord {
                    number: "1".into(),
                    label: "Satisfaction".into(),
                    stem: "How satisfied are you?".into(),
                    data_column: "Q1".into(),
                    variable_type: "Single".into(),
                    data_type: "Numeric".into(),
                    missing_value1: "99".into(),
                    missing_low: "0".into(),
                    missing_high: "0".into(),
                    responses: vec![
                        ResponseRecord::new(5, "Very satisfied"),
                        ResponseRecord::new(1, "Very dissatisfied"),
                        ResponseRecord {
                            value: 99,
                            label: "Don't know".into(),
                            index_type: "Exclude".into(),
                        },
                    ],
                    ..QuestionRecord::default()
                },
                QuestionRecord {
                    number: "2".into(),
                    label: "Comments & notes".into(),
                    stem: "Anything <else>?".into(),
                    data_column: "Q2".into(),
                    variable_type: "Open".into(),
                    data_type: "Text".into(),
                    ..QuestionRecord::default()
                },
            ],
        }
    }

    #[test]
    fn survey_roundtrip() {
        let survey = sample_survey();
        let xml = encode_survey(&survey).unwrap();
        assert!(xml.starts_with(XML_DECLARATION));
        assert_eq!(decode_survey(&xml).unwrap(), survey);
    }

    #[test]
    fn encode_keeps_order_and_escapes() {
        let xml = encode_survey(&sample_survey()).unwrap();
        let q1 = xml.find("<DataColumn>Q1</DataColumn>").unwrap();
        let q2 = xml.find("<DataColumn>Q2</DataColumn>").unwrap();
        assert!(q1 < q2);
        assert!(xml.contains("Anything &lt;else"));
        assert!(xml.contains("Comments &amp; notes"));
        let five = xml.find("<Value>5</Value>").unwrap();
        let one = xml.find("<Value>1</Value>").unwrap();
        assert!(five < one);
    }

    #[test]
    fn decodes_minimal_survey() {
        let xml = "<Survey><SurveyName>Demo</SurveyName></Survey>";
        let survey = decode_survey(xml).unwrap();
        assert_eq!(survey.survey_name, "Demo");
        assert!(survey.questions.is_empty());
    }

    #[test]
    fn decodes_serializer_style_document() {
        let xml = r#"<?xml version="1.0" encoding="utf-16"?>
<Survey xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <SurveyName>Demo</SurveyName>
  <Version>3</Version>
  <Questions>
    <Question>
      <Number>1</Number>
      <Label>Gender</Label>
      <DataColumn>Q1</DataColumn>
      <Responses>
        <Response>
          <Value>2</Value>
          <Label>Female</Label>
          <IndexType>Normal</IndexType>
        </Response>
        <Response>
          <Value>1</Value>
          <Label>Male</Label>
        </Response>
      </Responses>
    </Question>
  </Questions>
</Survey>"#;
        let survey = decode_survey(xml).unwrap();
        assert_eq!(survey.survey_name, "Demo");
        assert_eq!(survey.questions.len(), 1);
        let q = &survey.questions[0];
        assert_eq!(q.data_column, "Q1");
        assert_eq!(q.stem, "");
        let values: Vec<_> = q.responses.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![2, 1]);
        assert_eq!(q.responses[0].index_type, "Normal");
        assert_eq!(q.responses[1].index_type, "");
    }

    #[test]
    fn missing_survey_name_is_malformed() {
        let err = decode_survey("<Survey><Questions /></Survey>").unwrap_err();
        assert!(matches!(err, PayloadError::MalformedPayload(_)));
    }

    #[test]
    fn non_integer_value_is_malformed() {
        let xml = "<Survey><SurveyName>x</SurveyName><Questions><Question><Responses>\
                   <Response><Value>yes</Value></Response></Responses></Question></Questions></Survey>";
        assert!(matches!(
            decode_survey(xml),
            Err(PayloadError::MalformedPayload(_))
        ));
    }

    #[test]
    fn wrong_root_is_malformed() {
        let err = decode_survey("<Project><ProjectName>p</ProjectName></Project>").unwrap_err();
        assert!(err.to_string().contains("expected <Survey>"));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(decode_survey("not markup at all").is_err());
        assert!(decode_project("").is_err());
    }

    #[test]
    fn project_roundtrip() {
        let project = ProjectDocument {
            project_name: "Brand Tracker".into(),
            client_name: "Acme".into(),
            created_date: "2019-03-01T00:00:00".into(),
            modified_date: "2020-07-15T10:30:00".into(),
            fieldwork_start: "2019-04-01T00:00:00".into(),
            fieldwork_end: "2019-05-01T00:00:00".into(),
            weighting_scheme: "RIM".into(),
            researcher_name: "J. Smith".into(),
            researcher_organisation: "Research Co".into(),
            researcher_logo: "logo.png".into(),
        };
        let xml = encode_project(&project).unwrap();
        assert!(xml.contains("<ProjectName>Brand Tracker</ProjectName>"));
        assert_eq!(decode_project(&xml).unwrap(), project);
    }

    #[test]
    fn project_optional_fields_default() {
        let project = decode_project("<Project><ProjectName>P</ProjectName></Project>").unwrap();
        assert_eq!(project, ProjectDocument::new("P"));
    }

    #[test]
    fn missing_project_name_is_malformed() {
        assert!(matches!(
            decode_project("<Project><ClientName>Acme</ClientName></Project>"),
            Err(PayloadError::MalformedPayload(_))
        ));
    }

    #[test]
    fn padded_text_kept_exactly() {
        let survey = SurveyDocument {
            survey_name: " Demo ".into(),
            questions: vec![QuestionRecord {
                stem: "  How satisfied are you?\n".into(),
                label: "   ".into(),
                responses: vec![ResponseRecord::new(1, "\tYes ")],
                ..QuestionRecord::default()
            }],
        };
        let decoded = decode_survey(&encode_survey(&survey).unwrap()).unwrap();
        assert_eq!(decoded, survey);
    }

    #[test]
    fn indentation_between_elements_is_not_text() {
        let xml = "<Survey>\n  <SurveyName>Demo</SurveyName>\n  <Questions>\n    <Question>\n      \
                   <Label> x </Label>\n    </Question>\n  </Questions>\n</Survey>";
        let survey = decode_survey(xml).unwrap();
        assert_eq!(survey.questions.len(), 1);
        assert_eq!(survey.questions[0].label, " x ");
        assert_eq!(survey.questions[0].stem, "");
    }

    #[test]
    fn unclosed_document_is_malformed() {
        assert!(matches!(
            decode_survey("<Survey><SurveyName>x</SurveyName>"),
            Err(PayloadError::MalformedPayload(_))
        ));
    }

    proptest! {
        #[test]
        fn any_survey_roundtrips(survey in arb_survey()) {
            let xml = encode_survey(&survey).unwrap();
            prop_assert_eq!(decode_survey(&xml).unwrap(), survey);
        }

        #[test]
        fn any_project_roundtrips(project in arb_project()) {
            let xml = encode_project(&project).unwrap();
            prop_assert_eq!(decode_project(&xml).unwrap(), project);
        }
    }

    #[test]
    fn root_element_skips_declaration() {
        assert_eq!(
            root_element("<?xml version=\"1.0\"?>\n<!-- c --><Survey/>").unwrap(),
            "Survey"
        );
    }
}
