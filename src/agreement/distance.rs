use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::model::LabelSet;

/// Disagreement between two label sets, `0.0` for identical sets.
pub trait LabelDistance {
    fn name(&self) -> &'static str;

    fn distance(&self, left: &LabelSet, right: &LabelSet) -> f64;
}

/// `1 - |A ∩ B| / |A ∪ B|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jaccard;

/// Jaccard similarity scaled by how the sets relate: 1 when equal, 0.67
/// when one contains the other, 0.33 when they merely overlap, 0 when
/// disjoint (Passonneau's MASI).
#[derive(Debug, Clone, Copy, Default)]
pub struct Masi;

/// Binary match, for single-valued fields such as harm type.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exact;

impl LabelDistance for Jaccard {
    fn name(&self) -> &'static str {
        "jaccard"
    }

    fn distance(&self, left: &LabelSet, right: &LabelSet) -> f64 {
        if left == right {
            return 0.0;
        }

        let union = left.union(right).count();
        let intersection = left.intersection(right).count();
        1.0 - intersection as f64 / union as f64
    }
}

impl LabelDistance for Masi {
    fn name(&self) -> &'static str {
        "masi"
    }

    fn distance(&self, left: &LabelSet, right: &LabelSet) -> f64 {
        if left == right {
            return 0.0;
        }

        let union = left.union(right).count();
        let intersection = left.intersection(right).count();
        let monotonicity = if intersection == left.len().min(right.len()) && intersection > 0 {
            0.67
        } else if intersection > 0 {
            0.33
        } else {
            0.0
        };

        1.0 - (intersection as f64 / union as f64) * monotonicity
    }
}

impl LabelDistance for Exact {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn distance(&self, left: &LabelSet, right: &LabelSet) -> f64 {
        if left == right { 0.0 } else { 1.0 }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    #[default]
    Jaccard,
    Masi,
    Exact,
}

impl DistanceKind {
    pub fn as_str(self) -> &'static str {
        self.metric().name()
    }

    pub fn metric(self) -> &'static dyn LabelDistance {
        match self {
            Self::Jaccard => &Jaccard,
            Self::Masi => &Masi,
            Self::Exact => &Exact,
        }
    }
}
