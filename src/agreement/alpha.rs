use std::collections::{BTreeMap, BTreeSet};

use crate::error::AgreementError;
use crate::model::{AgreementResult, FieldName, Judgment, LabelSet};

use super::distance::{DistanceKind, LabelDistance};
use super::matrix::{ReliabilityMatrix, build_matrix};

#[derive(Debug, Clone, PartialEq)]
pub struct AlphaEstimate {
    pub alpha: f64,
    pub observed_disagreement: f64,
    pub expected_disagreement: f64,
    /// Items judged by at least two columns.
    pub n_items: usize,
    /// Columns with at least one pairable value.
    pub n_raters: usize,
    pub n_pairable_values: usize,
}

/// Krippendorff's alpha over set-valued cells.
///
/// Only pairable values (cells on items with two or more judgments) take
/// part. With `m_u` values on item `u` and `n` pairable values overall:
///
/// ```text
/// D_o = 1/n * Σ_u 1/(m_u - 1) * Σ_{i≠j in u} δ(c_i, c_j)
/// D_e = 1/(n(n - 1)) * Σ_{i≠j in pool} δ(c_i, c_j)
/// α   = 1 - D_o / D_e
/// ```
///
/// The result is not clamped. Zero expected disagreement is an error, not
/// a score.
pub fn alpha(
    matrix: &ReliabilityMatrix,
    distance: &dyn LabelDistance,
) -> Result<AlphaEstimate, AgreementError> {
    let mut pool = BTreeMap::<&LabelSet, usize>::new();
    let mut columns = BTreeSet::<usize>::new();
    let mut observed_total = 0.0_f64;
    let mut n_items = 0_usize;

    for item_index in 0..matrix.items.len() {
        let values = matrix.present(item_index).collect::<Vec<_>>();
        let m_u = values.len();
        if m_u < 2 {
            continue;
        }

        n_items += 1;
        let mut item_total = 0.0_f64;
        for (position, (_, left)) in values.iter().enumerate() {
            for (_, right) in values.iter().skip(position + 1) {
                item_total += distance.distance(left, right) + distance.distance(right, left);
            }
        }
        observed_total += item_total / (m_u - 1) as f64;

        for (column, labels) in values {
            columns.insert(column);
            *pool.entry(labels).or_default() += 1;
        }
    }

    if n_items == 0 || columns.len() < 2 {
        return Err(AgreementError::InsufficientData {
            field: matrix.field,
            comparable_columns: columns.len(),
        });
    }

    let n_pairable_values = pool.values().sum::<usize>();
    let observed_disagreement = observed_total / n_pairable_values as f64;

    let distinct = pool.into_iter().collect::<Vec<_>>();
    let mut expected_total = 0.0_f64;
    for (position, (left, left_count)) in distinct.iter().enumerate() {
        let same = (*left_count * (*left_count - 1)) as f64;
        expected_total += same * distance.distance(left, left);
        for (right, right_count) in distinct.iter().skip(position + 1) {
            let pairs = (*left_count * *right_count) as f64;
            expected_total +=
                pairs * (distance.distance(left, right) + distance.distance(right, left));
        }
    }
    let expected_disagreement =
        expected_total / (n_pairable_values * (n_pairable_values - 1)) as f64;

    if expected_disagreement <= 0.0 {
        return Err(AgreementError::DegenerateDistribution {
            field: matrix.field,
        });
    }

    Ok(AlphaEstimate {
        alpha: 1.0 - observed_disagreement / expected_disagreement,
        observed_disagreement,
        expected_disagreement,
        n_items,
        n_raters: columns.len(),
        n_pairable_values,
    })
}

/// Matrix plus alpha for one field.
pub fn compute_agreement(
    judgments: &[Judgment],
    field: FieldName,
    distance: DistanceKind,
) -> Result<AgreementResult, AgreementError> {
    let matrix = build_matrix(judgments, field)?;
    let estimate = alpha(&matrix, distance.metric())?;

    Ok(AgreementResult {
        field,
        distance: distance.as_str().to_string(),
        alpha: estimate.alpha,
        n_items: estimate.n_items,
        n_raters: estimate.n_raters,
        n_pairable_values: estimate.n_pairable_values,
        observed_disagreement: estimate.observed_disagreement,
        expected_disagreement: estimate.expected_disagreement,
    })
}
