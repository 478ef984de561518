//! Aggregation and inter-annotator agreement.
//!
//! Data flows one way: store rows are exploded into elementary
//! [`AnnotationRow`](crate::model::AnnotationRow)s, collapsed into one
//! [`Judgment`](crate::model::Judgment) per (item, rater, session), laid out
//! as a rater x item [`ReliabilityMatrix`] for one field, and reduced to
//! Krippendorff's alpha under a set distance.

mod aggregate;
mod alpha;
mod distance;
mod matrix;
mod rows;
#[cfg(test)]
mod tests;

pub use aggregate::aggregate;
pub use alpha::compute_agreement;
pub use distance::DistanceKind;
pub use matrix::{ReliabilityMatrix, assemble_matrix};
pub use rows::{LongRow, explode_store_rows};
