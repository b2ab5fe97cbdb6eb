//! Project metadata record

use serde::{Deserialize, Serialize};

/// Project metadata (`.porp`)
///
/// Flat record with no nested collections. Dates and the weighting scheme
/// are kept in their serialized text form so that a decode/encode cycle
/// reproduces them exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDocument {
    /// Project title
    pub project_name: String,
    /// Commissioning client
    #[serde(default)]
    pub client_name: String,
    /// Creation timestamp
    #[serde(default)]
    pub created_date: String,
    /// Last modification timestamp
    #[serde(default)]
    pub modified_date: String,
    /// Fieldwork start date
    #[serde(default)]
    pub fieldwork_start: String,
    /// Fieldwork end date
    #[serde(default)]
    pub fieldwork_end: String,
    /// Weighting scheme name, empty when unweighted
    #[serde(default)]
    pub weighting_scheme: String,
    /// Lead researcher
    #[serde(default)]
    pub researcher_name: String,
    /// Researcher's organisation
    #[serde(default)]
    pub researcher_organisation: String,
    /// Logo file reference
    #[serde(default)]
    pub researcher_logo: String,
}

impl ProjectDocument {
    /// Create project with only a name
    #[inline]
    #[must_use]
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    /// Whether any weighting scheme is configured
    #[inline]
    #[must_use]
    pub fn is_weighted(&self) -> bool {
        !self.weighting_scheme.trim().is_empty()
    }
}
