use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::types::RowValues;

/// What an engine connection hands back for one statement, before any reshaping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeResult {
    /// Column names, in select-list order
    pub columns: Vec<String>,
    /// Row values, each aligned with `columns`
    pub rows: Vec<Vec<RowValues>>,
    /// Rows affected as reported by the engine (rows returned for a plain SELECT)
    pub rows_affected: u64,
}

/// A row from a query result
///
/// Column names and the name-to-index map are shared by every row of one result.
#[derive(Debug, Clone)]
pub struct DbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<RowValues>,
    column_index: Arc<HashMap<String, usize>>,
}

impl DbRow {
    /// Create a standalone row; rows built by [`normalize`] share their lookup tables.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    /// The row as a JSON object keyed by column name.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for DbRow {
    fn eq(&self, other: &Self) -> bool {
        self.column_names == other.column_names && self.values == other.values
    }
}

impl Serialize for DbRow {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.column_names.iter().zip(&self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Result shape for the direct helpers: `{ rows, rowCount }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub rows: Vec<DbRow>,
    pub row_count: u64,
}

/// Result shape legacy request callers expect: `{ recordset, rowsAffected: [n] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyResult {
    pub recordset: Vec<DbRow>,
    pub rows_affected: Vec<u64>,
}

fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        // first occurrence wins for duplicate names, matching positional access order
        index.entry(name.clone()).or_insert(i);
    }
    index
}

fn build_rows(columns: Vec<String>, rows: Vec<Vec<RowValues>>) -> Vec<DbRow> {
    let column_index = Arc::new(index_columns(&columns));
    let column_names = Arc::new(columns);
    rows.into_iter()
        .map(|values| DbRow {
            column_names: Arc::clone(&column_names),
            values,
            column_index: Arc::clone(&column_index),
        })
        .collect()
}

/// Reshape a native result for the direct helpers.
#[must_use]
pub fn normalize(native: NativeResult) -> QueryResult {
    QueryResult {
        row_count: native.rows_affected,
        rows: build_rows(native.columns, native.rows),
    }
}

/// Reshape a native result for legacy request callers.
#[must_use]
pub fn normalize_legacy(native: NativeResult) -> LegacyResult {
    LegacyResult {
        rows_affected: vec![native.rows_affected],
        recordset: build_rows(native.columns, native.rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NativeResult {
        NativeResult {
            columns: vec!["id".into(), "name".into()],
            rows: vec![
                vec![RowValues::Int(1), RowValues::Text("alice".into())],
                vec![RowValues::Int(2), RowValues::Null],
            ],
            rows_affected: 2,
        }
    }

    #[test]
    fn normalize_shares_columns() {
        let result = normalize(sample());
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows.len(), 2);
        assert!(Arc::ptr_eq(
            &result.rows[0].column_names,
            &result.rows[1].column_names
        ));
        assert_eq!(result.rows[0].get("name").unwrap().as_text(), Some("alice"));
        assert!(result.rows[1].get("name").unwrap().is_null());
        assert!(result.rows[0].get("missing").is_none());
    }

    #[test]
    fn legacy_shape_serializes_with_legacy_names() {
        let legacy = normalize_legacy(sample());
        let json = serde_json::to_value(&legacy).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "recordset": [
                    {"id": 1, "name": "alice"},
                    {"id": 2, "name": null}
                ],
                "rowsAffected": [2]
            })
        );
    }

    #[test]
    fn dml_without_rows() {
        let native = NativeResult {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: 4,
        };
        let legacy = normalize_legacy(native.clone());
        assert!(legacy.recordset.is_empty());
        assert_eq!(legacy.rows_affected, vec![4]);
        let direct = normalize(native);
        assert_eq!(direct.row_count, 4);
        assert_eq!(
            serde_json::to_value(&direct).unwrap(),
            serde_json::json!({"rows": [], "rowCount": 4})
        );
    }

    #[test]
    fn duplicate_column_names_resolve_to_first() {
        let row = DbRow::new(
            Arc::new(vec!["id".into(), "id".into()]),
            vec![RowValues::Int(1), RowValues::Int(2)],
        );
        assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
        assert_eq!(row.get_by_index(1), Some(&RowValues::Int(2)));
        assert_eq!(row.to_json(), serde_json::json!({"id": 2}));
    }
}
