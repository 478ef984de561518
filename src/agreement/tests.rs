use std::collections::BTreeSet;

use proptest::prelude::*;

use super::alpha::alpha;
use super::distance::{Exact, Jaccard, LabelDistance, Masi};
use super::matrix::build_matrix;
use super::rows::explode_store_row;
use super::*;
use crate::error::AgreementError;
use crate::model::{AnnotationRow, FieldName, Judgment, LabelSet, StoreRow};

fn row(item: &str, rater: &str, session: &str, field: FieldName, value: &str) -> AnnotationRow {
    AnnotationRow {
        item_id: item.to_string(),
        rater_id: rater.to_string(),
        session_id: session.to_string(),
        field,
        value: value.to_string(),
        timestamp: Some(session.to_string()),
    }
}

fn labels(values: &[&str]) -> LabelSet {
    values.iter().map(|value| value.to_string()).collect()
}

fn judgment(item: &str, rater: &str, session: &str, field: FieldName, values: &[&str]) -> Judgment {
    Judgment {
        item_id: item.to_string(),
        rater_id: rater.to_string(),
        session_id: session.to_string(),
        timestamp: None,
        labels: [(field, labels(values))].into_iter().collect(),
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn aggregate_merges_same_submission_and_keeps_raters_apart() {
    let rows = vec![
        row("A", "X", "1", FieldName::Stakeholder, "Users"),
        row("A", "X", "1", FieldName::Stakeholder, "Workers"),
        row("A", "Y", "2", FieldName::Stakeholder, "Users"),
    ];

    let judgments = aggregate(&rows);
    assert_eq!(judgments.len(), 2);

    let x = &judgments[0];
    assert_eq!((x.item_id.as_str(), x.rater_id.as_str()), ("A", "X"));
    assert_eq!(
        x.labels_for(FieldName::Stakeholder),
        Some(&labels(&["Users", "Workers"]))
    );

    let y = &judgments[1];
    assert_eq!(y.rater_id, "Y");
    assert_eq!(y.labels_for(FieldName::Stakeholder), Some(&labels(&["Users"])));

    let distance = Jaccard.distance(
        x.labels_for(FieldName::Stakeholder).expect("x labels"),
        y.labels_for(FieldName::Stakeholder).expect("y labels"),
    );
    assert_close(distance, 0.5);
}

#[test]
fn aggregate_keeps_repeat_sessions_as_separate_judgments() {
    let rows = vec![
        row("A", "X", "100", FieldName::HarmType, "Actual"),
        row("A", "X", "200", FieldName::HarmType, "Potential"),
    ];

    let judgments = aggregate(&rows);
    assert_eq!(judgments.len(), 2);
    assert_eq!(judgments[0].session_id, "100");
    assert_eq!(judgments[1].session_id, "200");
}

#[test]
fn aggregate_drops_blank_values_and_empty_groups() {
    let rows = vec![
        row("A", "X", "1", FieldName::Notes, "   "),
        row("B", "X", "1", FieldName::Notes, ""),
        row("B", "X", "1", FieldName::HarmType, " Actual "),
    ];

    let judgments = aggregate(&rows);
    assert_eq!(judgments.len(), 1);
    assert_eq!(judgments[0].item_id, "B");
    assert!(judgments[0].labels_for(FieldName::Notes).is_none());
    assert_eq!(
        judgments[0].labels_for(FieldName::HarmType),
        Some(&labels(&["Actual"]))
    );
}

#[test]
fn explode_store_rows_skips_rows_without_identity() {
    let rows = vec![
        StoreRow {
            annotator: Some("X".to_string()),
            incident_id: Some("AIAAIC0554".to_string()),
            stakeholders: Some("Users".to_string()),
            harm_subcategory: Some("Privacy loss".to_string()),
            timestamp: Some("1717000000".to_string()),
            ..StoreRow::default()
        },
        StoreRow {
            annotator: None,
            incident_id: Some("AIAAIC0554".to_string()),
            stakeholders: Some("Users".to_string()),
            ..StoreRow::default()
        },
        StoreRow {
            annotator: Some("Y".to_string()),
            incident_id: Some("  ".to_string()),
            stakeholders: Some("Users".to_string()),
            ..StoreRow::default()
        },
    ];

    let exploded = explode_store_rows(&rows);
    assert_eq!(exploded.len(), 2);
    assert!(exploded.iter().all(|value| value.session_id == "1717000000"));
    assert!(
        exploded
            .iter()
            .any(|value| value.field == FieldName::HarmSubcategory && value.value == "Privacy loss")
    );
}

#[test]
fn explicit_session_id_wins_over_timestamp() {
    let row = StoreRow {
        annotator: Some("X".to_string()),
        incident_id: Some("A".to_string()),
        harm_type: Some("Actual".to_string()),
        timestamp: Some("1717000000".to_string()),
        session_id: Some("sub-1".to_string()),
        ..StoreRow::default()
    };

    let exploded = explode_store_row(&row).expect("row should explode");
    assert_eq!(exploded.len(), 1);
    assert_eq!(exploded[0].session_id, "sub-1");
}

#[test]
fn long_rows_reject_unknown_fields() {
    let raw = r#"{"item_id": "A", "rater_id": "X", "session_id": 17, "field_name": "severity", "field_value": "high"}"#;
    let long: LongRow = serde_json::from_str(raw).expect("long row should deserialize");
    let err = AnnotationRow::from_long(&long).expect_err("unknown field should fail");
    assert!(matches!(err, AgreementError::MalformedRow { .. }));
}

#[test]
fn long_rows_accept_store_column_names_and_numeric_sessions() {
    let raw = r#"{"item_id": "A", "rater_id": "X", "session_id": 17.0, "field_name": "stakeholders", "field_value": "Users"}"#;
    let long: LongRow = serde_json::from_str(raw).expect("long row should deserialize");
    let parsed = AnnotationRow::from_long(&long)
        .expect("row should parse")
        .expect("row should carry a value");
    assert_eq!(parsed.field, FieldName::Stakeholder);
    assert_eq!(parsed.session_id, "17");

    let stored = parsed.to_store_row();
    assert_eq!(stored.stakeholders.as_deref(), Some("Users"));
    assert_eq!(stored.session_id.as_deref(), Some("17"));
}

#[test]
fn matrix_has_a_row_for_every_item_and_none_for_missing_cells() {
    let judgments = vec![
        judgment("1", "A", "t1", FieldName::Stakeholder, &["Users"]),
        judgment("1", "B", "t2", FieldName::Stakeholder, &["Users"]),
        judgment("2", "A", "t3", FieldName::HarmType, &["Actual"]),
    ];

    let matrix = build_matrix(&judgments, FieldName::Stakeholder).expect("matrix should build");
    assert_eq!(matrix.items, vec!["1".to_string(), "2".to_string()]);
    assert_eq!(matrix.columns, vec!["A".to_string(), "B".to_string()]);
    assert!(matrix.cell("2", "A").is_none());
    assert!(matrix.cell("2", "B").is_none());
    assert_eq!(matrix.cell("1", "B"), Some(&labels(&["Users"])));
}

#[test]
fn matrix_gives_repeat_sessions_their_own_columns() {
    let judgments = vec![
        judgment("1", "X", "200", FieldName::Stakeholder, &["Workers"]),
        judgment("1", "X", "100", FieldName::Stakeholder, &["Users"]),
        judgment("1", "Y", "150", FieldName::Stakeholder, &["Users"]),
    ];

    let matrix = build_matrix(&judgments, FieldName::Stakeholder).expect("matrix should build");
    assert_eq!(
        matrix.columns,
        vec!["X".to_string(), "X#1".to_string(), "Y".to_string()]
    );
    assert_eq!(matrix.cell("1", "X"), Some(&labels(&["Users"])));
    assert_eq!(matrix.cell("1", "X#1"), Some(&labels(&["Workers"])));
}

#[test]
fn repeat_sessions_follow_submission_time_not_session_id() {
    let submitted = |rater: &str, session: &str, timestamp: &str, value: &str| AnnotationRow {
        item_id: "1".to_string(),
        rater_id: rater.to_string(),
        session_id: session.to_string(),
        field: FieldName::Stakeholder,
        value: value.to_string(),
        timestamp: Some(timestamp.to_string()),
    };
    let rows = vec![
        submitted("X", "f47ac10b-58cc-4372-a567-0e02b2c3d479", "100", "Users"),
        submitted("X", "0b1c2d3e-4f50-4a6b-8c7d-9e0f1a2b3c4d", "200", "Workers"),
        submitted("Y", "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d", "150", "Users"),
    ];

    let judgments = aggregate(&rows);
    let matrix = build_matrix(&judgments, FieldName::Stakeholder).expect("matrix should build");
    assert_eq!(
        matrix.columns,
        vec!["X".to_string(), "X#1".to_string(), "Y".to_string()]
    );
    assert_eq!(matrix.cell("1", "X"), Some(&labels(&["Users"])));
    assert_eq!(matrix.cell("1", "X#1"), Some(&labels(&["Workers"])));
}

#[test]
fn aggregate_keeps_the_earliest_timestamp_of_a_session() {
    let mut late = row("A", "X", "s1", FieldName::Stakeholder, "Users");
    late.timestamp = Some("1717000500".to_string());
    let mut early = row("A", "X", "s1", FieldName::Stakeholder, "Workers");
    early.timestamp = Some("1717000000".to_string());

    let judgments = aggregate(&[late, early]);
    assert_eq!(judgments.len(), 1);
    assert_eq!(judgments[0].timestamp.as_deref(), Some("1717000000"));
}

#[test]
fn synthetic_columns_never_reuse_a_rater_id() {
    let judgments = vec![
        judgment("1", "X", "1", FieldName::Stakeholder, &["Users"]),
        judgment("1", "X", "2", FieldName::Stakeholder, &["Workers"]),
        judgment("1", "X#1", "3", FieldName::Stakeholder, &["Investors"]),
    ];

    let matrix = assemble_matrix(&judgments, FieldName::Stakeholder);
    let unique = matrix.columns.iter().collect::<BTreeSet<_>>();
    assert_eq!(unique.len(), matrix.columns.len());
    assert_eq!(matrix.cell("1", "X"), Some(&labels(&["Users"])));
    assert_eq!(matrix.cell("1", "X#1"), Some(&labels(&["Investors"])));
    assert_eq!(matrix.cell("1", "X#2"), Some(&labels(&["Workers"])));
}

#[test]
fn numeric_sessions_order_numerically() {
    let judgments = vec![
        judgment("1", "X", "1000", FieldName::HarmType, &["Actual"]),
        judgment("1", "X", "999", FieldName::HarmType, &["Potential"]),
    ];

    let matrix = assemble_matrix(&judgments, FieldName::HarmType);
    assert_eq!(matrix.cell("1", "X"), Some(&labels(&["Potential"])));
    assert_eq!(matrix.cell("1", "X#1"), Some(&labels(&["Actual"])));
}

#[test]
fn single_rater_is_insufficient_data() {
    let judgments = vec![
        judgment("1", "A", "t1", FieldName::Stakeholder, &["Users"]),
        judgment("2", "A", "t2", FieldName::Stakeholder, &["Workers"]),
    ];

    let err = compute_agreement(&judgments, FieldName::Stakeholder, DistanceKind::Jaccard)
        .expect_err("one rater cannot agree with anyone");
    assert_eq!(
        err,
        AgreementError::InsufficientData {
            field: FieldName::Stakeholder,
            comparable_columns: 0,
        }
    );
}

#[test]
fn raters_without_shared_items_are_insufficient_data() {
    let judgments = vec![
        judgment("1", "A", "t1", FieldName::Stakeholder, &["Users"]),
        judgment("2", "B", "t2", FieldName::Stakeholder, &["Workers"]),
    ];

    let err = build_matrix(&judgments, FieldName::Stakeholder).expect_err("no overlap");
    assert!(matches!(err, AgreementError::InsufficientData { .. }));
}

#[test]
fn perfect_agreement_yields_exactly_one() {
    let judgments = vec![
        judgment("1", "A", "t1", FieldName::Stakeholder, &["Users", "Workers"]),
        judgment("1", "B", "t2", FieldName::Stakeholder, &["Users", "Workers"]),
        judgment("2", "A", "t3", FieldName::Stakeholder, &["Investors"]),
        judgment("2", "B", "t4", FieldName::Stakeholder, &["Investors"]),
        judgment("3", "A", "t5", FieldName::Stakeholder, &["Users"]),
        judgment("3", "B", "t6", FieldName::Stakeholder, &["Users"]),
    ];

    for kind in [DistanceKind::Jaccard, DistanceKind::Masi, DistanceKind::Exact] {
        let result = compute_agreement(&judgments, FieldName::Stakeholder, kind)
            .expect("alpha should be defined");
        assert_eq!(result.alpha, 1.0);
        assert_eq!(result.observed_disagreement, 0.0);
        assert_eq!(result.n_items, 3);
        assert_eq!(result.n_raters, 2);
    }
}

#[test]
fn uniform_labels_are_a_degenerate_distribution() {
    let judgments = vec![
        judgment("1", "A", "t1", FieldName::HarmType, &["Actual"]),
        judgment("1", "B", "t2", FieldName::HarmType, &["Actual"]),
        judgment("2", "A", "t3", FieldName::HarmType, &["Actual"]),
        judgment("2", "B", "t4", FieldName::HarmType, &["Actual"]),
    ];

    let err = compute_agreement(&judgments, FieldName::HarmType, DistanceKind::Exact)
        .expect_err("no variation");
    assert_eq!(
        err,
        AgreementError::DegenerateDistribution {
            field: FieldName::HarmType
        }
    );
}

#[test]
fn missing_cells_only_count_pairable_values() {
    // rater C only judged item 1
    let judgments = vec![
        judgment("1", "A", "t1", FieldName::HarmType, &["x"]),
        judgment("1", "B", "t2", FieldName::HarmType, &["x"]),
        judgment("1", "C", "t3", FieldName::HarmType, &["y"]),
        judgment("2", "A", "t4", FieldName::HarmType, &["x"]),
        judgment("2", "B", "t5", FieldName::HarmType, &["x"]),
        judgment("3", "A", "t6", FieldName::HarmType, &["y"]),
        judgment("3", "B", "t7", FieldName::HarmType, &["y"]),
    ];

    let matrix = build_matrix(&judgments, FieldName::HarmType).expect("matrix should build");
    assert!(matrix.cell("2", "C").is_none());
    assert!(matrix.cell("3", "C").is_none());

    let estimate = alpha(&matrix, &Exact).expect("alpha should be defined");
    assert_eq!(estimate.n_pairable_values, 7);
    assert_eq!(estimate.n_items, 3);
    assert_eq!(estimate.n_raters, 3);
    assert_close(estimate.observed_disagreement, 2.0 / 7.0);
    assert_close(estimate.expected_disagreement, 24.0 / 42.0);
    assert_close(estimate.alpha, 0.5);
}

#[test]
fn items_judged_once_do_not_contribute() {
    let base = vec![
        judgment("1", "A", "t1", FieldName::HarmType, &["x"]),
        judgment("1", "B", "t2", FieldName::HarmType, &["y"]),
        judgment("2", "A", "t3", FieldName::HarmType, &["x"]),
        judgment("2", "B", "t4", FieldName::HarmType, &["x"]),
    ];
    let mut extended = base.clone();
    extended.push(judgment("3", "C", "t5", FieldName::HarmType, &["z"]));

    let left = compute_agreement(&base, FieldName::HarmType, DistanceKind::Exact)
        .expect("alpha should be defined");
    let right = compute_agreement(&extended, FieldName::HarmType, DistanceKind::Exact)
        .expect("alpha should be defined");
    assert_eq!(left.alpha, right.alpha);
    assert_eq!(left.n_pairable_values, right.n_pairable_values);
}

#[test]
fn systematic_disagreement_goes_below_zero_without_clamping() {
    let judgments = vec![
        judgment("1", "A", "t1", FieldName::HarmType, &["Actual"]),
        judgment("1", "B", "t2", FieldName::HarmType, &["Potential"]),
        judgment("2", "A", "t3", FieldName::HarmType, &["Potential"]),
        judgment("2", "B", "t4", FieldName::HarmType, &["Actual"]),
    ];

    let result = compute_agreement(&judgments, FieldName::HarmType, DistanceKind::Exact)
        .expect("alpha should be defined");
    // D_o = 1, D_e = 8 / 12
    assert_close(result.alpha, -0.5);
}

#[test]
fn random_labels_drive_alpha_towards_zero() {
    let vocabulary = ["Users", "Workers", "Business", "Investors"];
    let mut rng = 0x9E37_79B9_7F4A_7C15_u64;
    let mut next = move || {
        rng ^= rng << 13;
        rng ^= rng >> 7;
        rng ^= rng << 17;
        rng
    };

    let mut judgments = Vec::new();
    for item in 0..3000 {
        for rater in ["A", "B", "C"] {
            let mask = (next() % 15 + 1) as usize;
            let chosen = vocabulary
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, value)| *value)
                .collect::<Vec<_>>();
            judgments.push(judgment(
                &format!("item-{item}"),
                rater,
                "t",
                FieldName::Stakeholder,
                &chosen,
            ));
        }
    }

    let result = compute_agreement(&judgments, FieldName::Stakeholder, DistanceKind::Jaccard)
        .expect("alpha should be defined");
    assert!(result.alpha.abs() < 0.05, "alpha = {}", result.alpha);
}

#[test]
fn distances_follow_set_semantics() {
    let users = labels(&["Users"]);
    let both = labels(&["Users", "Workers"]);
    let workers = labels(&["Workers"]);
    let empty = LabelSet::new();

    assert_eq!(Jaccard.distance(&users, &users), 0.0);
    assert_eq!(Jaccard.distance(&empty, &empty), 0.0);
    assert_eq!(Jaccard.distance(&empty, &users), 1.0);
    assert_eq!(Jaccard.distance(&users, &workers), 1.0);
    assert_close(Jaccard.distance(&users, &both), 0.5);

    assert_close(Masi.distance(&users, &both), 1.0 - 0.5 * 0.67);
    assert_eq!(Masi.distance(&users, &workers), 1.0);
    let overlap = labels(&["Users", "Business"]);
    assert_close(Masi.distance(&overlap, &both), 1.0 - (1.0 / 3.0) * 0.33);

    assert_eq!(Exact.distance(&users, &both), 1.0);
    assert_eq!(Exact.distance(&both, &both), 0.0);
}

const ITEMS: [&str; 3] = ["A", "B", "C"];
const RATERS: [&str; 3] = ["X", "Y", "Z"];
const SESSIONS: [&str; 2] = ["1", "2"];
const VALUES: [&str; 4] = ["Users", "Workers", "Business", ""];

fn rows_strategy() -> impl Strategy<Value = Vec<AnnotationRow>> {
    prop::collection::vec((0..3_usize, 0..3_usize, 0..2_usize, 0..5_usize, 0..4_usize), 0..40)
        .prop_map(|entries| {
            entries
                .into_iter()
                .map(|(item, rater, session, field, value)| {
                    row(
                        ITEMS[item],
                        RATERS[rater],
                        SESSIONS[session],
                        FieldName::ALL[field],
                        VALUES[value],
                    )
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn aggregate_ignores_duplicated_rows(rows in rows_strategy()) {
        let mut doubled = rows.clone();
        doubled.extend(rows.iter().cloned());
        prop_assert_eq!(aggregate(&rows), aggregate(&doubled));
    }

    #[test]
    fn aggregate_ignores_row_order(
        (rows, shuffled) in rows_strategy()
            .prop_flat_map(|rows| (Just(rows.clone()), Just(rows).prop_shuffle()))
    ) {
        let expected = aggregate(&rows).into_iter().collect::<BTreeSet<_>>();
        let actual = aggregate(&shuffled).into_iter().collect::<BTreeSet<_>>();
        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn every_item_gets_a_matrix_row(rows in rows_strategy()) {
        let judgments = aggregate(&rows);
        let items = judgments.iter().map(|value| value.item_id.clone()).collect::<BTreeSet<_>>();
        for field in FieldName::ALL {
            let matrix = assemble_matrix(&judgments, field);
            prop_assert_eq!(matrix.items.iter().cloned().collect::<BTreeSet<_>>(), items.clone());
            for judgment in &judgments {
                if judgment.labels_for(field).is_none() {
                    continue;
                }
                let item_index = matrix.items.iter().position(|value| value == &judgment.item_id);
                prop_assert!(item_index.is_some());
                let present = item_index.map(|index| matrix.present(index).count()).unwrap_or(0);
                prop_assert!(present >= 1);
            }
        }
    }
}
