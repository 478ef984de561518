use serde::Deserialize;
use tracing::warn;

use crate::error::AgreementError;
use crate::model::{AnnotationRow, FieldName, StoreRow, deserialize_timestamp};

/// Label columns that take part in aggregation, in store order.
const LABEL_FIELDS: [FieldName; 5] = FieldName::ALL;

/// One elementary row in long format, as exported by the analysis notebooks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LongRow {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub rater_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub field_value: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<String>,
}

/// Explodes wide store rows into elementary rows, skipping malformed ones
/// with a warning.
pub fn explode_store_rows(rows: &[StoreRow]) -> Vec<AnnotationRow> {
    let mut out = Vec::with_capacity(rows.len() * 2);
    let mut skipped = 0_usize;

    for (index, row) in rows.iter().enumerate() {
        match explode_store_row(row) {
            Ok(exploded) => out.extend(exploded),
            Err(err) => {
                skipped += 1;
                warn!(row = index, error = %err, "skipping annotation row");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, total = rows.len(), "malformed annotation rows were skipped");
    }

    out
}

/// Session identity is the explicit `session_id` when the submission carried
/// one. Older rows only have the per-submission timestamp, so rows of the
/// same rater and item with an equal timestamp form one session.
pub fn explode_store_row(row: &StoreRow) -> Result<Vec<AnnotationRow>, AgreementError> {
    let item_id = non_blank(row.incident_id.as_deref())
        .ok_or_else(|| AgreementError::malformed("missing incident_ID"))?;
    let rater_id = non_blank(row.annotator.as_deref())
        .ok_or_else(|| AgreementError::malformed("missing annotator"))?;
    let session_id = non_blank(row.session_id.as_deref())
        .or_else(|| non_blank(row.timestamp.as_deref()))
        .unwrap_or_default();

    Ok(LABEL_FIELDS
        .iter()
        .filter_map(|field| {
            row.label(*field).map(|value| AnnotationRow {
                item_id: item_id.clone(),
                rater_id: rater_id.clone(),
                session_id: session_id.clone(),
                field: *field,
                value: value.to_string(),
                timestamp: row.timestamp.clone(),
            })
        })
        .collect())
}

impl AnnotationRow {
    /// Returns `Ok(None)` for rows whose value is empty.
    pub fn from_long(row: &LongRow) -> Result<Option<Self>, AgreementError> {
        let item_id = non_blank(row.item_id.as_deref())
            .ok_or_else(|| AgreementError::malformed("missing item_id"))?;
        let rater_id = non_blank(row.rater_id.as_deref())
            .ok_or_else(|| AgreementError::malformed("missing rater_id"))?;
        let raw_field = row.field_name.as_deref().unwrap_or_default();
        let field = FieldName::parse(raw_field).ok_or_else(|| {
            AgreementError::malformed(format!("unknown field_name {raw_field:?}"))
        })?;

        let Some(value) = non_blank(row.field_value.as_deref()) else {
            return Ok(None);
        };

        let session_id = non_blank(row.session_id.as_deref())
            .or_else(|| non_blank(row.timestamp.as_deref()))
            .unwrap_or_default();

        Ok(Some(Self {
            item_id,
            rater_id,
            session_id,
            field,
            value,
            timestamp: row.timestamp.clone(),
        }))
    }

    /// Wide store row carrying only this row's field.
    pub fn to_store_row(&self) -> StoreRow {
        let mut row = StoreRow {
            annotator: Some(self.rater_id.clone()),
            incident_id: Some(self.item_id.clone()),
            timestamp: self.timestamp.clone(),
            session_id: (!self.session_id.is_empty()).then(|| self.session_id.clone()),
            ..StoreRow::default()
        };
        row.set_label(self.field, self.value.clone());
        row
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
