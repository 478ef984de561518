use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::{AnnotationRow, FieldName, Judgment, LabelSet};

type JudgmentKey = (String, String, String);

#[derive(Debug, Default)]
struct Group {
    labels: BTreeMap<FieldName, LabelSet>,
    timestamp: Option<String>,
}

/// Collapses elementary rows into one judgment per (item, rater, session).
///
/// Values of the same field within a group are unioned, so duplicate rows
/// and row order have no effect on the result. Rows with a blank value are
/// dropped first; a group left without any field produces no judgment.
/// Sessions are never merged, a rater annotating an item twice yields two
/// judgments. Output is sorted by key.
pub fn aggregate(rows: &[AnnotationRow]) -> Vec<Judgment> {
    let mut groups = BTreeMap::<JudgmentKey, Group>::new();

    for row in rows {
        let value = row.value.trim();
        if value.is_empty() {
            continue;
        }

        let group = groups
            .entry((
                row.item_id.clone(),
                row.rater_id.clone(),
                row.session_id.clone(),
            ))
            .or_default();
        group
            .labels
            .entry(row.field)
            .or_default()
            .insert(value.to_string());

        let timestamp = row.timestamp.as_deref().map(str::trim).filter(|value| !value.is_empty());
        if compare_submission_keys(timestamp, group.timestamp.as_deref()) == Ordering::Less {
            group.timestamp = timestamp.map(ToOwned::to_owned);
        }
    }

    groups
        .into_iter()
        .filter(|(_, group)| !group.labels.is_empty())
        .map(|((item_id, rater_id, session_id), group)| Judgment {
            item_id,
            rater_id,
            session_id,
            timestamp: group.timestamp,
            labels: group.labels,
        })
        .collect()
}

/// Orders submission timestamps or session ids. Numeric values (unix
/// timestamps) sort numerically and before any textual value; missing
/// values sort last.
pub(super) fn compare_submission_keys(left: Option<&str>, right: Option<&str>) -> Ordering {
    let (left, right) = match (left, right) {
        (Some(left), Some(right)) => (left, right),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => return Ordering::Equal,
    };

    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(left_number), Ok(right_number)) => left_number
            .total_cmp(&right_number)
            .then_with(|| left.cmp(right)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => left.cmp(right),
    }
}
