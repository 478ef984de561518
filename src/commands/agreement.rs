use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::agreement::{DistanceKind, aggregate, compute_agreement, explode_store_rows};
use crate::cache::ReportCache;
use crate::cli::AgreementArgs;
use crate::config::AppConfig;
use crate::error::AgreementError;
use crate::model::{
    AgreementReport, AgreementResult, FieldName, FieldOutcome, ReportFilters, StoreRow,
};
use crate::util::{now_utc_string, sha256_json, write_json_pretty, write_json_stdout};

use super::snapshot::{load_filtered_rows, report_filters};

const REPORT_VERSION: u32 = 1;

/// What a report was asked for; part of the cache key.
#[derive(Debug, Serialize)]
struct AgreementRequest<'a> {
    report_version: u32,
    fields: &'a [FieldName],
    distance: DistanceKind,
    filters: &'a ReportFilters,
}

pub fn run(args: AgreementArgs, config: &AppConfig) -> Result<()> {
    let fields = if args.fields.is_empty() {
        config.agreement.fields.clone()
    } else {
        args.fields.clone()
    };
    let distance = args.distance.unwrap_or(config.agreement.distance);
    let filters = report_filters(&args.filters);

    let rows = load_filtered_rows(&args.store, &args.filters)?;
    let snapshot_hash = sha256_json(&rows)?;

    let cache = ReportCache::new(&args.store.cache_root);
    let cache_key = ReportCache::key(
        &snapshot_hash,
        &AgreementRequest {
            report_version: REPORT_VERSION,
            fields: &fields,
            distance,
            filters: &filters,
        },
    )?;

    let cached = if args.refresh {
        None
    } else {
        cache.load(&cache_key)?
    };

    let report = match cached {
        Some(report) => {
            info!(snapshot_hash = %snapshot_hash, "using cached agreement report");
            report
        }
        None => {
            let report = build_report(&rows, &fields, distance, snapshot_hash, filters);
            let path = cache.store(&cache_key, &report)?;
            info!(path = %path.display(), "cached agreement report");
            report
        }
    };

    if let Some(report_path) = &args.report_path {
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote agreement report");
    }

    if args.json {
        write_json_stdout(&report)
    } else {
        write_text_report(&report)
    }
}

/// Computes every requested field independently; a field that cannot be
/// scored is reported as such without affecting the others.
fn build_report(
    rows: &[StoreRow],
    fields: &[FieldName],
    distance: DistanceKind,
    snapshot_hash: String,
    filters: ReportFilters,
) -> AgreementReport {
    let judgments = aggregate(&explode_store_rows(rows));
    info!(
        rows = rows.len(),
        judgments = judgments.len(),
        distance = distance.as_str(),
        "aggregated judgments"
    );

    let outcomes = fields
        .iter()
        .map(|field| field_outcome(compute_agreement(&judgments, *field, distance), *field))
        .collect();

    AgreementReport {
        report_version: REPORT_VERSION,
        generated_at: now_utc_string(),
        snapshot_hash,
        row_count: rows.len(),
        judgment_count: judgments.len(),
        distance: distance.as_str().to_string(),
        filters,
        fields: outcomes,
    }
}

fn field_outcome(
    result: std::result::Result<AgreementResult, AgreementError>,
    field: FieldName,
) -> FieldOutcome {
    match result {
        Ok(result) => {
            info!(
                field = %field,
                alpha = result.alpha,
                items = result.n_items,
                raters = result.n_raters,
                "computed agreement"
            );
            FieldOutcome::Computed(result)
        }
        Err(
            err @ (AgreementError::InsufficientData { .. } | AgreementError::MalformedRow { .. }),
        ) => {
            info!(field = %field, reason = %err, "agreement not computable");
            FieldOutcome::InsufficientData {
                field,
                message: err.user_message(),
            }
        }
        Err(err @ AgreementError::DegenerateDistribution { .. }) => {
            info!(field = %field, reason = %err, "agreement undefined");
            FieldOutcome::Degenerate {
                field,
                message: err.user_message(),
            }
        }
    }
}

fn write_text_report(report: &AgreementReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(
        output,
        "Agreement (Krippendorff's alpha, {} distance)",
        report.distance
    )?;
    writeln!(
        output,
        "Snapshot: rows={} judgments={} hash={}",
        report.row_count,
        report.judgment_count,
        &report.snapshot_hash[..report.snapshot_hash.len().min(12)]
    )?;
    if report.filters != ReportFilters::default() {
        writeln!(
            output,
            "Filters: since={} until={} incident={}",
            report.filters.since.as_deref().unwrap_or("-"),
            report.filters.until.as_deref().unwrap_or("-"),
            report.filters.incident.as_deref().unwrap_or("-"),
        )?;
    }

    for outcome in &report.fields {
        let name = outcome.field().as_str();
        match outcome {
            FieldOutcome::Computed(result) => writeln!(
                output,
                "  {:<18} alpha={:.3} items={} raters={} values={}",
                name,
                result.alpha,
                result.n_items,
                result.n_raters,
                result.n_pairable_values,
            )?,
            FieldOutcome::InsufficientData { message, .. }
            | FieldOutcome::Degenerate { message, .. } => {
                writeln!(output, "  {:<18} {}", name, message)?
            }
        }
    }

    output.flush()?;
    Ok(())
}
