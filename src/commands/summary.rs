use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::catalog::Catalog;
use crate::cli::SummaryArgs;
use crate::model::{FieldName, StoreRow};
use crate::util::write_json_stdout;

use super::snapshot::load_filtered_rows;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryColumn {
    Incident,
    Annotator,
    Label(FieldName),
}

impl SummaryColumn {
    fn name(self) -> &'static str {
        match self {
            Self::Incident => "incident_ID",
            Self::Annotator => "annotator",
            Self::Label(field) => field.store_column(),
        }
    }

    fn value(self, row: &StoreRow) -> Option<&str> {
        match self {
            Self::Incident => row.incident_id.as_deref().map(str::trim),
            Self::Annotator => row.annotator.as_deref().map(str::trim),
            Self::Label(field) => row.label(field),
        }
        .filter(|value| !value.is_empty())
    }
}

const COUNT_COLUMNS: [SummaryColumn; 5] = [
    SummaryColumn::Annotator,
    SummaryColumn::Label(FieldName::Stakeholder),
    SummaryColumn::Label(FieldName::HarmSubcategory),
    SummaryColumn::Label(FieldName::HarmCategory),
    SummaryColumn::Label(FieldName::HarmType),
];

const FLOW_COLUMNS: [SummaryColumn; 5] = [
    SummaryColumn::Incident,
    SummaryColumn::Annotator,
    SummaryColumn::Label(FieldName::Stakeholder),
    SummaryColumn::Label(FieldName::HarmSubcategory),
    SummaryColumn::Label(FieldName::HarmCategory),
];

#[derive(Debug, Serialize)]
struct Summary {
    row_count: usize,
    counts: Vec<ColumnCounts>,
    flows: Vec<FlowLink>,
    notes: Vec<NoteEntry>,
}

#[derive(Debug, Serialize)]
struct ColumnCounts {
    column: &'static str,
    values: Vec<ValueCount>,
}

#[derive(Debug, PartialEq, Serialize)]
struct ValueCount {
    value: String,
    count: usize,
}

/// One link of the label co-occurrence flow between consecutive columns.
#[derive(Debug, PartialEq, Serialize)]
struct FlowLink {
    source_column: &'static str,
    source: String,
    target_column: &'static str,
    target: String,
    count: usize,
}

#[derive(Debug, Serialize)]
struct NoteEntry {
    incident_id: String,
    title: Option<String>,
    annotator: String,
    harm_type: Option<String>,
    stakeholders: Vec<String>,
    harm_subcategories: Vec<String>,
    notes: String,
}

pub fn run(args: SummaryArgs) -> Result<()> {
    let catalog = Catalog::load(args.catalog.as_deref())?;
    let rows = load_filtered_rows(&args.store, &args.filters)?;
    let summary = summarize(&rows, &catalog);

    info!(
        rows = summary.row_count,
        flows = summary.flows.len(),
        notes = summary.notes.len(),
        "summarized annotations"
    );

    if args.json {
        write_json_stdout(&summary)
    } else {
        write_text_summary(&summary)
    }
}

fn summarize(rows: &[StoreRow], catalog: &Catalog) -> Summary {
    Summary {
        row_count: rows.len(),
        counts: COUNT_COLUMNS
            .iter()
            .map(|column| ColumnCounts {
                column: column.name(),
                values: value_counts(rows, *column),
            })
            .collect(),
        flows: flow_links(rows, &FLOW_COLUMNS),
        notes: collect_notes(rows, catalog),
    }
}

/// Most frequent first, ties by value.
fn value_counts(rows: &[StoreRow], column: SummaryColumn) -> Vec<ValueCount> {
    let mut counts = BTreeMap::<&str, usize>::new();
    for row in rows {
        if let Some(value) = column.value(row) {
            *counts.entry(value).or_default() += 1;
        }
    }

    let mut out = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect::<Vec<_>>();
    out.sort_by(|left, right| right.count.cmp(&left.count).then(left.value.cmp(&right.value)));
    out
}

fn flow_links(rows: &[StoreRow], columns: &[SummaryColumn]) -> Vec<FlowLink> {
    let mut links = BTreeMap::<(usize, &str, &str), usize>::new();
    for row in rows {
        for (position, pair) in columns.windows(2).enumerate() {
            if let (Some(source), Some(target)) = (pair[0].value(row), pair[1].value(row)) {
                *links.entry((position, source, target)).or_default() += 1;
            }
        }
    }

    links
        .into_iter()
        .map(|((position, source, target), count)| FlowLink {
            source_column: columns[position].name(),
            source: source.to_string(),
            target_column: columns[position + 1].name(),
            target: target.to_string(),
            count,
        })
        .collect()
}

/// Notes are repeated on every row of a submission; each submission's note
/// is listed once with the labels it was written against.
fn collect_notes(rows: &[StoreRow], catalog: &Catalog) -> Vec<NoteEntry> {
    let mut grouped = BTreeMap::<(String, String, String, String), NoteAccumulator>::new();

    for row in rows {
        let Some(note) = row.label(FieldName::Notes) else {
            continue;
        };
        let (Some(incident), Some(annotator)) = (
            SummaryColumn::Incident.value(row),
            SummaryColumn::Annotator.value(row),
        ) else {
            continue;
        };
        let session = row
            .session_id
            .as_deref()
            .or(row.timestamp.as_deref())
            .unwrap_or_default();

        let entry = grouped
            .entry((
                incident.to_string(),
                annotator.to_string(),
                session.to_string(),
                note.to_string(),
            ))
            .or_default();
        if let Some(harm_type) = row.label(FieldName::HarmType) {
            entry.harm_types.insert(harm_type.to_string());
        }
        if let Some(stakeholder) = row.label(FieldName::Stakeholder) {
            entry.stakeholders.insert(stakeholder.to_string());
        }
        if let Some(subcategory) = row.label(FieldName::HarmSubcategory) {
            entry.harm_subcategories.insert(subcategory.to_string());
        }
    }

    grouped
        .into_iter()
        .map(|((incident_id, annotator, _, notes), accumulated)| NoteEntry {
            title: catalog.title(&incident_id).map(ToOwned::to_owned),
            incident_id,
            annotator,
            harm_type: (!accumulated.harm_types.is_empty())
                .then(|| accumulated.harm_types.into_iter().collect::<Vec<_>>().join(", ")),
            stakeholders: accumulated.stakeholders.into_iter().collect(),
            harm_subcategories: accumulated.harm_subcategories.into_iter().collect(),
            notes,
        })
        .collect()
}

#[derive(Debug, Default)]
struct NoteAccumulator {
    harm_types: BTreeSet<String>,
    stakeholders: BTreeSet<String>,
    harm_subcategories: BTreeSet<String>,
}

fn write_text_summary(summary: &Summary) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Rows: {}", summary.row_count)?;
    for column in &summary.counts {
        writeln!(output, "\n{}", column.column)?;
        for value in &column.values {
            writeln!(output, "  {:>5}  {}", value.count, value.value)?;
        }
    }

    writeln!(output, "\nFlows: {}", summary.flows.len())?;
    for link in &summary.flows {
        writeln!(
            output,
            "  {:>5}  {}={} -> {}={}",
            link.count, link.source_column, link.source, link.target_column, link.target
        )?;
    }

    writeln!(output, "\nNotes: {}", summary.notes.len())?;
    for note in &summary.notes {
        writeln!(
            output,
            "  [{}] {} ({}): {} harm on {} of {}",
            note.annotator,
            note.title.as_deref().unwrap_or(&note.incident_id),
            note.incident_id,
            note.harm_type.as_deref().unwrap_or("unspecified"),
            note.stakeholders.join(", "),
            note.harm_subcategories.join(", "),
        )?;
        writeln!(output, "      {}", note.notes)?;
    }

    output.flush()?;
    Ok(())
}
