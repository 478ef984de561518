use anyhow::Result;
use tracing::{info, warn};

use crate::cli::{FilterArgs, StoreArgs};
use crate::model::{ReportFilters, StoreRow};
use crate::store::{load_snapshot, open_store_read_only};

/// Reads the whole store once and applies the date and incident filters.
pub(super) fn load_filtered_rows(store: &StoreArgs, filters: &FilterArgs) -> Result<Vec<StoreRow>> {
    let db_path = store.db_path();
    let connection = open_store_read_only(&db_path)?;
    let rows = load_snapshot(&connection)?;
    let total = rows.len();

    let filtered = apply_filters(rows, filters);
    info!(
        path = %db_path.display(),
        total,
        kept = filtered.len(),
        "loaded annotation snapshot"
    );
    Ok(filtered)
}

pub(super) fn apply_filters(rows: Vec<StoreRow>, filters: &FilterArgs) -> Vec<StoreRow> {
    let date_filtered = filters.since.is_some() || filters.until.is_some();
    let incident = filters
        .incident
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let mut undated = 0_usize;

    let kept = rows
        .into_iter()
        .filter(|row| {
            if let Some(incident) = incident
                && row.incident_id.as_deref().map(str::trim) != Some(incident)
            {
                return false;
            }

            if !date_filtered {
                return true;
            }

            let Some(date) = row.submission_date() else {
                undated += 1;
                return false;
            };
            filters.since.is_none_or(|since| date >= since)
                && filters.until.is_none_or(|until| date <= until)
        })
        .collect();

    if undated > 0 {
        warn!(undated, "rows without a submission date were left out by the date filter");
    }

    kept
}

pub(super) fn report_filters(filters: &FilterArgs) -> ReportFilters {
    ReportFilters {
        since: filters.since.map(|value| value.to_string()),
        until: filters.until.map(|value| value.to_string()),
        incident: filters.incident.clone(),
    }
}
