//! Survey definition object graph

use serde::{Deserialize, Serialize};

/// Survey definition (`.porps`)
///
/// Question order defines the column order of the companion data file;
/// response order defines the coded/displayed order of answers. Neither is
/// ever re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyDocument {
    /// Survey title
    pub survey_name: String,
    /// Questions in data-column order
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
}

impl SurveyDocument {
    /// Create empty survey with a name
    #[inline]
    #[must_use]
    pub fn new(survey_name: impl Into<String>) -> Self {
        Self {
            survey_name: survey_name.into(),
            questions: Vec::new(),
        }
    }

    /// Find question by data column name
    #[must_use]
    pub fn question_for_column(&self, column: &str) -> Option<&QuestionRecord> {
        self.questions.iter().find(|q| q.data_column == column)
    }

    /// Data column names in question order
    #[must_use]
    pub fn data_columns(&self) -> Vec<&str> {
        self.questions.iter().map(|q| q.data_column.as_str()).collect()
    }
}

/// One question of a survey
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionRecord {
    /// Question number as displayed
    pub number: String,
    /// Short label
    pub label: String,
    /// Full question text
    pub stem: String,
    /// Column name in the data file
    pub data_column: String,
    /// Variable kind (single, multi, open)
    pub variable_type: String,
    /// Stored data type
    pub data_type: String,
    /// First discrete missing value
    pub missing_value1: String,
    /// Second discrete missing value
    pub missing_value2: String,
    /// Third discrete missing value
    pub missing_value3: String,
    /// Lower bound of the missing range
    pub missing_low: String,
    /// Upper bound of the missing range
    pub missing_high: String,
    /// Answer options in coded order
    pub responses: Vec<ResponseRecord>,
}

impl QuestionRecord {
    /// Look up response label by coded value
    #[must_use]
    pub fn label_for(&self, value: i32) -> Option<&str> {
        self.responses
            .iter()
            .find(|r| r.value == value)
            .map(|r| r.label.as_str())
    }
}

/// One coded answer option
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Coded value stored in the data file
    pub value: i32,
    /// Displayed answer text
    #[serde(default)]
    pub label: String,
    /// Index classification
    #[serde(default)]
    pub index_type: String,
}

impl ResponseRecord {
    /// Create response with a value and label
    #[inline]
    #[must_use]
    pub fn new(value: i32, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
            index_type: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gender_question() -> QuestionRecord {
        QuestionRecord {
            number: "1".into(),
            label: "Gender".into(),
            data_column: "Q1".into(),
            responses: vec![ResponseRecord::new(2, "Female"), ResponseRecord::new(1, "Male")],
            ..QuestionRecord::default()
        }
    }

    #[test]
    fn label_lookup_by_value() {
        let q = gender_question();
        assert_eq!(q.label_for(1), Some("Male"));
        assert_eq!(q.label_for(2), Some("Female"));
        assert_eq!(q.label_for(9), None);
    }

    #[test]
    fn responses_keep_declaration_order() {
        let q = gender_question();
        let values: Vec<_> = q.responses.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![2, 1]);
    }

    #[test]
    fn column_lookup() {
        let mut survey = SurveyDocument::new("Demo");
        survey.questions.push(gender_question());

        assert!(survey.question_for_column("Q1").is_some());
        assert!(survey.question_for_column("Q2").is_none());
        assert_eq!(survey.data_columns(), vec!["Q1"]);
    }

    #[test]
    fn json_roundtrip_preserves_order() {
        let mut survey = SurveyDocument::new("Demo");
        survey.questions.push(gender_question());

        let json = serde_json::to_string(&survey).unwrap();
        let back: SurveyDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, survey);
    }
}
