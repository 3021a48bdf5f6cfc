//! TABLE <-> VECTOR conversions.

use ndarray::Array2;
use serde_json::{json, Value};
use tracing::debug;

use super::ConversionOutcome;
use crate::error::{ConversionError, ConvertResult};
use crate::model::{ColumnType, DataFormat, DataPayload, TablePayload, VectorPayload};

/// Convert the numeric columns of a table to a dense array.
///
/// Non-numeric columns cannot be carried and are dropped with a warning;
/// preservation is the fraction of columns that survived. Null numeric
/// cells are zero-filled. The first identifier column, when present, names
/// the output rows.
pub fn table_to_vector(table: &TablePayload) -> ConvertResult<ConversionOutcome> {
    let mut numeric_indices = Vec::new();
    let mut dropped = Vec::new();
    let mut id_column = None;

    for (idx, name) in table.columns.iter().enumerate() {
        match table.infer_column_type(idx) {
            ColumnType::Numeric => numeric_indices.push(idx),
            ColumnType::Identifier => {
                if id_column.is_none() {
                    id_column = Some(idx);
                }
                dropped.push(name.clone());
            }
            ColumnType::Categorical => dropped.push(name.clone()),
        }
    }

    if numeric_indices.is_empty() {
        return Err(ConversionError::MalformedPayload {
            format: DataFormat::Table,
            message: "no numeric columns to vectorize".to_string(),
        });
    }

    let mut warnings = Vec::new();
    if !dropped.is_empty() {
        warnings.push(format!(
            "dropped non-numeric column(s): {}",
            dropped.join(", ")
        ));
    }

    let mut zero_filled = 0usize;
    let mut flat = Vec::with_capacity(table.rows.len() * numeric_indices.len());
    for row in &table.rows {
        for &idx in &numeric_indices {
            match row.get(idx).and_then(Value::as_f64) {
                Some(v) if v.is_finite() => flat.push(v),
                _ => {
                    zero_filled += 1;
                    flat.push(0.0);
                }
            }
        }
    }
    if zero_filled > 0 {
        warnings.push(format!(
            "{} null or non-finite numeric cell(s) zero-filled",
            zero_filled
        ));
    }

    let data = Array2::from_shape_vec((table.rows.len(), numeric_indices.len()), flat)
        .map_err(|e| ConversionError::MalformedPayload {
            format: DataFormat::Table,
            message: format!("could not shape numeric columns: {}", e),
        })?;

    let row_ids = match id_column {
        Some(idx) => table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| match row.get(idx) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => format!("row_{}", i),
            })
            .collect(),
        None => Vec::new(),
    };

    let preservation_score = numeric_indices.len() as f64 / table.columns.len() as f64;

    debug!(
        rows = table.rows.len(),
        numeric_columns = numeric_indices.len(),
        dropped = dropped.len(),
        "Converted table to vectors"
    );

    Ok(ConversionOutcome {
        data: DataPayload::Vector(VectorPayload::new(data).with_row_ids(row_ids)),
        preservation_score,
        warnings,
    })
}

/// Convert a dense array to a table with one `dim_{i}` column per vector
/// column, plus a leading `id` column when the payload names its rows.
pub fn vector_to_table(vector: &VectorPayload) -> ConvertResult<ConversionOutcome> {
    let has_ids = vector.row_ids.len() == vector.nrows() && !vector.row_ids.is_empty();

    let mut columns = Vec::with_capacity(vector.dim() + 1);
    if has_ids {
        columns.push("id".to_string());
    }
    for i in 0..vector.dim() {
        columns.push(format!("dim_{}", i));
    }

    let rows = vector
        .data
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = Vec::with_capacity(columns.len());
            if has_ids {
                cells.push(Value::String(vector.row_ids[i].clone()));
            }
            cells.extend(row.iter().map(|v| json!(v)));
            cells
        })
        .collect();

    debug!(
        rows = vector.nrows(),
        columns = columns.len(),
        "Converted vectors to table"
    );

    Ok(ConversionOutcome {
        data: DataPayload::Table(TablePayload::new(columns, rows)),
        // Every numeric value maps to a cell.
        preservation_score: 1.0,
        warnings: Vec::new(),
    })
}
