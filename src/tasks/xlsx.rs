//! Excel (`.xlsx`) task tables.
//!
//! Reading goes through calamine. Writing reopens the original file with
//! umya-spreadsheet and rewrites only the written-back columns, so the rest
//! of the sheet keeps its formatting, formulas and extra columns.

use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx, XlsxError};
use serde_json::{Number, Value};
use tracing::debug;

use super::table::{Sheet, Workbook, GENERATED_COLUMN, HEADER_ROWS, LENGTH_COLUMN, TIME_COLUMN};
use crate::error::{ConfigurationError, ExportError};

/// Whole floats above this are left as floats.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub(super) fn read(path: &Path) -> Result<Workbook, ConfigurationError> {
    let invalid = |message: String| ConfigurationError::InvalidTable {
        path: path.to_path_buf(),
        message,
    };

    let mut book: Xlsx<_> = open_workbook(path).map_err(|e: XlsxError| invalid(e.to_string()))?;
    let mut sheets = Vec::new();
    for name in book.sheet_names() {
        let range = book
            .worksheet_range(&name)
            .map_err(|e| invalid(format!("sheet '{name}': {e}")))?;
        sheets.push(Sheet {
            rows: grid(&range),
            name,
        });
    }
    Ok(Workbook { sheets })
}

/// Lays the used range out from A1, so row and column indices match the
/// sheet's own coordinates.
fn grid(range: &Range<Data>) -> Vec<Vec<Value>> {
    let Some((first_row, first_column)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Vec<Vec<Value>> = vec![Vec::new(); first_row as usize];
    for cells in range.rows() {
        let mut row = vec![Value::Null; first_column as usize];
        row.extend(cells.iter().map(cell_value));
        rows.push(row);
    }
    rows
}

fn cell_value(data: &Data) -> Value {
    match data {
        Data::Empty => Value::Null,
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGER => Value::from(*f as i64),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

/// Copies the written-back columns of every data row from `workbook` into
/// the spreadsheet at `source` and saves the result to `target`.
pub(super) fn write_result_columns(workbook: &Workbook, source: &Path, target: &Path) -> Result<(), ExportError> {
    let failed = |message: String| ExportError::Spreadsheet {
        path: source.to_path_buf(),
        message,
    };

    let mut book = umya_spreadsheet::reader::xlsx::read(source).map_err(|e| failed(e.to_string()))?;
    for sheet in &workbook.sheets {
        let Some(worksheet) = book.get_sheet_by_name_mut(&sheet.name) else {
            return Err(failed(format!("sheet '{}' not found", sheet.name)));
        };

        for (row, cells) in sheet.rows.iter().enumerate().skip(HEADER_ROWS) {
            for column in [GENERATED_COLUMN, TIME_COLUMN, LENGTH_COLUMN] {
                let coordinate = (column as u32 + 1, row as u32 + 1);
                let value = cells.get(column).unwrap_or(&Value::Null);
                if value.is_null() && worksheet.get_cell(coordinate).is_none() {
                    continue;
                }

                let cell = worksheet.get_cell_mut(coordinate);
                match value {
                    Value::Number(n) => {
                        cell.set_value_number(n.as_f64().unwrap_or_default());
                    }
                    Value::String(s) => {
                        cell.set_value_string(s.as_str());
                    }
                    Value::Bool(b) => {
                        cell.set_value_bool(*b);
                    }
                    Value::Null | Value::Array(_) | Value::Object(_) => {
                        cell.set_blank();
                    }
                }
            }
        }
        debug!(sheet = %sheet.name, "Updated spreadsheet result columns");
    }

    umya_spreadsheet::writer::xlsx::write(&book, target).map_err(|e| failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::Float(1261.0)), json!(1261));
        assert_eq!(cell_value(&Data::Float(0.031)), json!(0.031));
        assert_eq!(cell_value(&Data::Int(-4)), json!(-4));
        assert_eq!(cell_value(&Data::String("bfs".into())), json!("bfs"));
        assert_eq!(cell_value(&Data::Bool(true)), json!(true));
    }
}
