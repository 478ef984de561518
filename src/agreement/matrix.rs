use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::AgreementError;
use crate::model::{FieldName, Judgment, LabelSet};

use super::aggregate::compare_submission_keys;

/// Item x rater grid of label sets for one field. `None` marks an item the
/// rater did not judge (or judged without touching this field).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityMatrix {
    pub field: FieldName,
    pub items: Vec<String>,
    pub columns: Vec<String>,
    cells: Vec<Vec<Option<LabelSet>>>,
}

impl ReliabilityMatrix {
    pub fn row(&self, item_index: usize) -> &[Option<LabelSet>] {
        &self.cells[item_index]
    }

    #[cfg(test)]
    pub fn cell(&self, item_id: &str, column: &str) -> Option<&LabelSet> {
        let item_index = self.items.iter().position(|value| value == item_id)?;
        let column_index = self.columns.iter().position(|value| value == column)?;
        self.cells[item_index][column_index].as_ref()
    }

    /// Non-missing cells of one item with their column index.
    pub fn present(&self, item_index: usize) -> impl Iterator<Item = (usize, &LabelSet)> {
        self.cells[item_index]
            .iter()
            .enumerate()
            .filter_map(|(column, cell)| cell.as_ref().map(|labels| (column, labels)))
    }

    /// Columns holding at least one value on an item that another column
    /// also judged.
    pub fn comparable_columns(&self) -> BTreeSet<usize> {
        let mut columns = BTreeSet::new();
        for item_index in 0..self.items.len() {
            if self.present(item_index).count() >= 2 {
                columns.extend(self.present(item_index).map(|(column, _)| column));
            }
        }
        columns
    }
}

/// Lays judgments out as a matrix without checking that agreement is
/// computable. Every item of any judgment gets a row, every rater a column.
///
/// A rater with several sessions on the same item keeps one column per
/// session, ordered by submission timestamp and then session id: the earliest
/// session fills the rater's own column, later ones fill `rater#1`,
/// `rater#2`, ... A synthetic name already taken by a real rater id moves
/// to the next free suffix.
pub fn assemble_matrix(judgments: &[Judgment], field: FieldName) -> ReliabilityMatrix {
    let items = judgments
        .iter()
        .map(|judgment| judgment.item_id.clone())
        .collect::<BTreeSet<_>>();

    let mut column_keys = judgments
        .iter()
        .map(|judgment| (judgment.rater_id.clone(), 0_usize))
        .collect::<BTreeSet<_>>();

    let mut sessions = BTreeMap::<(&str, &str), Vec<&Judgment>>::new();
    for judgment in judgments {
        if judgment.labels_for(field).is_some() {
            sessions
                .entry((judgment.item_id.as_str(), judgment.rater_id.as_str()))
                .or_default()
                .push(judgment);
        }
    }

    let mut placed = Vec::<(&str, (String, usize), &LabelSet)>::new();
    for ((item_id, rater_id), mut repeats) in sessions {
        repeats.sort_by(|left, right| {
            compare_submission_keys(left.timestamp.as_deref(), right.timestamp.as_deref())
                .then_with(|| {
                    compare_submission_keys(
                        Some(left.session_id.as_str()),
                        Some(right.session_id.as_str()),
                    )
                })
        });
        for (session_index, judgment) in repeats.into_iter().enumerate() {
            let key = (rater_id.to_string(), session_index);
            column_keys.insert(key.clone());
            if let Some(labels) = judgment.labels_for(field) {
                placed.push((item_id, key, labels));
            }
        }
    }

    let items = items.into_iter().collect::<Vec<_>>();
    let column_keys = column_keys.into_iter().collect::<Vec<_>>();
    let mut cells = vec![vec![None; column_keys.len()]; items.len()];

    for (item_id, key, labels) in placed {
        let (Ok(item_index), Ok(column_index)) = (
            items.binary_search_by(|value| value.as_str().cmp(item_id)),
            column_keys.binary_search(&key),
        ) else {
            continue;
        };
        cells[item_index][column_index] = Some(labels.clone());
    }

    ReliabilityMatrix {
        field,
        items,
        columns: column_names(&column_keys),
        cells,
    }
}

/// Builds the matrix for one field, failing when fewer than two columns
/// share a judged item.
pub fn build_matrix(
    judgments: &[Judgment],
    field: FieldName,
) -> Result<ReliabilityMatrix, AgreementError> {
    let matrix = assemble_matrix(judgments, field);
    let comparable_columns = matrix.comparable_columns().len();
    if comparable_columns < 2 {
        return Err(AgreementError::InsufficientData {
            field,
            comparable_columns,
        });
    }
    Ok(matrix)
}

/// Column names unique across the matrix.
fn column_names(column_keys: &[(String, usize)]) -> Vec<String> {
    let mut taken = column_keys
        .iter()
        .filter(|(_, session_index)| *session_index == 0)
        .map(|(rater_id, _)| rater_id.clone())
        .collect::<BTreeSet<_>>();

    column_keys
        .iter()
        .map(|(rater_id, session_index)| {
            if *session_index == 0 {
                return rater_id.clone();
            }
            let mut suffix = *session_index;
            loop {
                let name = format!("{rater_id}#{suffix}");
                if taken.insert(name.clone()) {
                    return name;
                }
                suffix += 1;
            }
        })
        .collect()
}
