use thiserror::Error;

use crate::model::FieldName;

/// Failures of the aggregation and agreement pipeline.
///
/// `MalformedRow` is recovered from locally (the row is skipped with a
/// warning). The other two variants mean alpha is undefined for the
/// requested field and are surfaced to the caller as they are.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgreementError {
    #[error("malformed row: {reason}")]
    MalformedRow { reason: String },

    #[error(
        "agreement on {field} is not computable: {comparable_columns} rater column(s) share a judged item, at least 2 are required"
    )]
    InsufficientData {
        field: FieldName,
        comparable_columns: usize,
    },

    #[error("agreement on {field} is undefined: expected disagreement is zero")]
    DegenerateDistribution { field: FieldName },
}

impl AgreementError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            reason: reason.into(),
        }
    }

    /// Message meant for the people looking at a report, not for logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedRow { reason } => format!("a row was skipped: {reason}"),
            Self::InsufficientData { field, .. } => {
                format!("not enough overlapping annotations on {field} yet")
            }
            Self::DegenerateDistribution { field } => {
                format!("every judgment on {field} carries the same labels, alpha is undefined")
            }
        }
    }
}
