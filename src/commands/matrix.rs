use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::agreement::{ReliabilityMatrix, aggregate, assemble_matrix, explode_store_rows};
use crate::catalog::Catalog;
use crate::cli::MatrixArgs;
use crate::model::FieldName;
use crate::util::{write_json_pretty, write_json_stdout};

use super::snapshot::load_filtered_rows;

#[derive(Debug, Serialize)]
struct MatrixExport {
    field: FieldName,
    columns: Vec<String>,
    comparable_columns: usize,
    items: Vec<MatrixItem>,
}

#[derive(Debug, Serialize)]
struct MatrixItem {
    item_id: String,
    title: Option<String>,
    source_link: Option<String>,
    cells: Vec<Option<Vec<String>>>,
}

pub fn run(args: MatrixArgs) -> Result<()> {
    let catalog = Catalog::load(args.catalog.as_deref())?;
    let rows = load_filtered_rows(&args.store, &args.filters)?;
    let judgments = aggregate(&explode_store_rows(&rows));
    let matrix = assemble_matrix(&judgments, args.field);

    let export = export_matrix(&matrix, &catalog);
    if export.comparable_columns < 2 {
        warn!(
            field = %args.field,
            comparable_columns = export.comparable_columns,
            "matrix has no overlapping raters, agreement is not computable"
        );
    }

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &export)?;
            info!(
                path = %path.display(),
                items = export.items.len(),
                columns = export.columns.len(),
                "wrote reliability matrix"
            );
            Ok(())
        }
        None => write_json_stdout(&export),
    }
}

fn export_matrix(matrix: &ReliabilityMatrix, catalog: &Catalog) -> MatrixExport {
    let items = matrix
        .items
        .iter()
        .enumerate()
        .map(|(index, item_id)| MatrixItem {
            item_id: item_id.clone(),
            title: catalog.title(item_id).map(ToOwned::to_owned),
            source_link: catalog.source_link(item_id).map(ToOwned::to_owned),
            cells: matrix
                .row(index)
                .iter()
                .map(|cell| cell.as_ref().map(|labels| labels.iter().cloned().collect()))
                .collect(),
        })
        .collect();

    MatrixExport {
        field: matrix.field,
        columns: matrix.columns.clone(),
        comparable_columns: matrix.comparable_columns().len(),
        items,
    }
}
