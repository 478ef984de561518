use std::fs;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::agreement::LongRow;
use crate::cli::{ImportArgs, ImportFormat};
use crate::model::{AnnotationRow, StoreRow};
use crate::store::{append_rows, open_store};
use crate::util::date_from_unix;

#[derive(Debug, Default)]
struct ImportBatch {
    rows: Vec<StoreRow>,
    blank: usize,
    skipped: usize,
}

pub fn run(args: ImportArgs) -> Result<()> {
    let raw = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let batch = parse_import(&raw, args.format)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;

    info!(
        input = %args.input.display(),
        rows = batch.rows.len(),
        blank = batch.blank,
        skipped = batch.skipped,
        "parsed annotation import"
    );

    if args.dry_run {
        info!("import dry-run complete, store untouched");
        return Ok(());
    }

    let db_path = args.store.db_path();
    let mut connection = open_store(&db_path)?;
    let appended = append_rows(&mut connection, &batch.rows)?;
    info!(path = %db_path.display(), appended, "import completed");

    Ok(())
}

fn parse_import(raw: &[u8], format: ImportFormat) -> Result<ImportBatch> {
    let values = parse_json_values(raw)?;
    let mut batch = ImportBatch::default();

    for (index, value) in values.into_iter().enumerate() {
        match format {
            ImportFormat::Wide => match serde_json::from_value::<StoreRow>(value) {
                Ok(row) if is_blank(&row) => batch.blank += 1,
                Ok(mut row) => {
                    fill_datetime(&mut row);
                    batch.rows.push(row);
                }
                Err(err) => {
                    batch.skipped += 1;
                    warn!(row = index, error = %err, "skipping unreadable import row");
                }
            },
            ImportFormat::Long => {
                let parsed = serde_json::from_value::<LongRow>(value)
                    .map_err(|err| err.to_string())
                    .and_then(|row| AnnotationRow::from_long(&row).map_err(|err| err.to_string()));
                match parsed {
                    Ok(Some(row)) => {
                        let mut row = row.to_store_row();
                        fill_datetime(&mut row);
                        batch.rows.push(row);
                    }
                    Ok(None) => batch.blank += 1,
                    Err(err) => {
                        batch.skipped += 1;
                        warn!(row = index, error = %err, "skipping malformed import row");
                    }
                }
            }
        }
    }

    Ok(batch)
}

/// Accepts a JSON array or one JSON value per line.
fn parse_json_values(raw: &[u8]) -> Result<Vec<Value>> {
    let text = std::str::from_utf8(raw).context("import file is not valid UTF-8")?;
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<Value>>(trimmed).context("invalid JSON array");
    }

    let mut values = Vec::new();
    for (line_number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_str::<Value>(line)
            .with_context(|| format!("invalid JSON on line {}", line_number + 1))?;
        values.push(value);
    }
    Ok(values)
}

fn is_blank(row: &StoreRow) -> bool {
    [
        &row.datetime,
        &row.annotator,
        &row.incident_id,
        &row.stakeholders,
        &row.harm_category,
        &row.harm_subcategory,
        &row.harm_type,
        &row.notes,
        &row.timestamp,
        &row.session_id,
    ]
    .iter()
    .all(|value| value.as_deref().map(str::trim).unwrap_or_default().is_empty())
}

fn fill_datetime(row: &mut StoreRow) {
    if row.datetime.as_deref().is_some_and(|value| !value.trim().is_empty()) {
        return;
    }
    row.datetime = row.timestamp.as_deref().and_then(date_from_unix);
}
