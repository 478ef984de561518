use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

/// Label columns a rater can fill in for one incident.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Stakeholder,
    HarmCategory,
    HarmSubcategory,
    HarmType,
    Notes,
}

impl FieldName {
    pub const ALL: [FieldName; 5] = [
        Self::Stakeholder,
        Self::HarmCategory,
        Self::HarmSubcategory,
        Self::HarmType,
        Self::Notes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stakeholder => "stakeholder",
            Self::HarmCategory => "harm_category",
            Self::HarmSubcategory => "harm_subcategory",
            Self::HarmType => "harm_type",
            Self::Notes => "notes",
        }
    }

    /// Column carrying this field in the annotation store.
    pub fn store_column(self) -> &'static str {
        match self {
            Self::Stakeholder => "stakeholders",
            other => other.as_str(),
        }
    }

    /// Accepts both field names and store column names, plus `harm` which
    /// older result pages used for the subcategory.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "stakeholder" | "stakeholders" => Some(Self::Stakeholder),
            "harm_category" => Some(Self::HarmCategory),
            "harm_subcategory" | "harm" => Some(Self::HarmSubcategory),
            "harm_type" => Some(Self::HarmType),
            "notes" | "note" => Some(Self::Notes),
            _ => None,
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submission timestamps arrive as integers, floats or text depending on
/// which form variant wrote them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawTimestamp {
    pub fn canonical(&self) -> Option<String> {
        match self {
            Self::Integer(value) => Some(value.to_string()),
            Self::Float(value) if !value.is_finite() => None,
            Self::Float(value) if value.fract() == 0.0 && value.abs() < 9.0e15 => {
                Some(format!("{}", *value as i64))
            }
            Self::Float(value) => Some(value.to_string()),
            Self::Text(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse::<f64>() {
                    Ok(number) if number.is_finite() && !trimmed.contains(['e', 'E']) => {
                        Self::Float(number).canonical()
                    }
                    _ => Some(trimmed.to_string()),
                }
            }
        }
    }
}

pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.canonical()))
}

/// One row of the shared annotations sheet, column for column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreRow {
    #[serde(default, alias = "datatime")]
    pub datetime: Option<String>,
    #[serde(default)]
    pub annotator: Option<String>,
    #[serde(rename = "incident_ID", default)]
    pub incident_id: Option<String>,
    #[serde(default)]
    pub stakeholders: Option<String>,
    #[serde(default)]
    pub harm_category: Option<String>,
    #[serde(default)]
    pub harm_subcategory: Option<String>,
    #[serde(default)]
    pub harm_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,
}

impl StoreRow {
    pub fn label(&self, field: FieldName) -> Option<&str> {
        let value = match field {
            FieldName::Stakeholder => self.stakeholders.as_deref(),
            FieldName::HarmCategory => self.harm_category.as_deref(),
            FieldName::HarmSubcategory => self.harm_subcategory.as_deref(),
            FieldName::HarmType => self.harm_type.as_deref(),
            FieldName::Notes => self.notes.as_deref(),
        };
        value.map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn set_label(&mut self, field: FieldName, value: String) {
        let slot = match field {
            FieldName::Stakeholder => &mut self.stakeholders,
            FieldName::HarmCategory => &mut self.harm_category,
            FieldName::HarmSubcategory => &mut self.harm_subcategory,
            FieldName::HarmType => &mut self.harm_type,
            FieldName::Notes => &mut self.notes,
        };
        *slot = Some(value);
    }

    /// Submission date, the `YYYY-MM-DD` prefix of `datetime`.
    pub fn submission_date(&self) -> Option<chrono::NaiveDate> {
        let raw = self.datetime.as_deref()?.trim();
        let date_part = raw.get(..10).unwrap_or(raw);
        chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }
}

/// Elementary fact: one value of one field, chosen by one rater for one
/// item in one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRow {
    pub item_id: String,
    pub rater_id: String,
    pub session_id: String,
    pub field: FieldName,
    pub value: String,
    pub timestamp: Option<String>,
}

pub type LabelSet = BTreeSet<String>;

/// Everything one rater said about one item in one submission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Judgment {
    pub item_id: String,
    pub rater_id: String,
    pub session_id: String,
    /// Earliest canonical submission timestamp seen for the session.
    pub timestamp: Option<String>,
    pub labels: BTreeMap<FieldName, LabelSet>,
}

impl Judgment {
    pub fn labels_for(&self, field: FieldName) -> Option<&LabelSet> {
        self.labels.get(&field).filter(|labels| !labels.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementResult {
    pub field: FieldName,
    pub distance: String,
    pub alpha: f64,
    pub n_items: usize,
    pub n_raters: usize,
    pub n_pairable_values: usize,
    pub observed_disagreement: f64,
    pub expected_disagreement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcome {
    Computed(AgreementResult),
    InsufficientData { field: FieldName, message: String },
    Degenerate { field: FieldName, message: String },
}

impl FieldOutcome {
    pub fn field(&self) -> FieldName {
        match self {
            Self::Computed(result) => result.field,
            Self::InsufficientData { field, .. } | Self::Degenerate { field, .. } => *field,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFilters {
    pub since: Option<String>,
    pub until: Option<String>,
    pub incident: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementReport {
    pub report_version: u32,
    pub generated_at: String,
    pub snapshot_hash: String,
    pub row_count: usize,
    pub judgment_count: usize,
    pub distance: String,
    pub filters: ReportFilters,
    pub fields: Vec<FieldOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    #[serde(default)]
    pub source_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreCounts {
    pub rows: i64,
    pub annotators: i64,
    pub incidents: i64,
    pub sessions: i64,
    pub latest_datetime: Option<String>,
}
