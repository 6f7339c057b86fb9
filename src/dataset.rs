//! Tabular data as fetched from the backend, plus the edit/snapshot bookkeeping used by
//! the matrix editor.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A single cell. The backend sends strings, numbers or null (NaN/inf are nulled server-side).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self { CellValue::Text(s.into()) }

    /// `None` for non-finite floats, which JSON cannot carry.
    pub fn float(f: f64) -> Option<Self> { serde_json::Number::from_f64(f).map(CellValue::Number) }

    pub fn int(i: i64) -> Self { CellValue::Number(i.into()) }

    pub fn is_null(&self) -> bool { matches!(self, CellValue::Null) }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Column name -> cell. Cloned from server records and mutated locally.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, CellValue>);

impl Row {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, column: &str, value: CellValue) -> Self {
        self.0.insert(column.to_string(), value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> { self.0.get(column) }

    pub fn set(&mut self, column: &str, value: CellValue) -> Option<CellValue> {
        self.0.insert(column.to_string(), value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> { self.0.keys() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Identity of the row under `id_field`, as a lookup key. Null ids do not count.
    pub fn id_key(&self, id_field: &str) -> Option<String> {
        match self.0.get(id_field) {
            None | Some(CellValue::Null) => None,
            Some(v) => Some(v.to_string()),
        }
    }

    /// True when any column other than `id_field` differs; a column missing on one side
    /// compares as null.
    pub fn differs_from(&self, other: &Row, id_field: &str) -> bool {
        let cols: BTreeSet<&String> = self.0.keys().chain(other.0.keys()).collect();
        cols.into_iter()
            .filter(|c| c.as_str() != id_field)
            .any(|c| self.0.get(c).unwrap_or(&CellValue::Null) != other.0.get(c).unwrap_or(&CellValue::Null))
    }

    /// Keep exactly `columns`, filling gaps with null.
    pub fn project(&self, columns: &[String]) -> Row {
        Row(columns.iter().map(|c| (c.clone(), self.0.get(c).cloned().unwrap_or_default())).collect())
    }
}

impl FromIterator<(String, CellValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}

/// Rows with an ordered column list, as returned by the risk-base data view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Rows are projected onto `columns` so every row carries every column.
    pub fn from_records(columns: Vec<String>, records: Vec<Row>) -> Self {
        let rows = records.iter().map(|r| r.project(&columns)).collect();
        Dataset { columns, rows }
    }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

/// Editable rows plus the snapshot they were loaded as.
#[derive(Debug, Clone, PartialEq)]
pub struct EditableTable {
    id_field: String,
    rows: Vec<Row>,
    original: Vec<Row>,
}

impl EditableTable {
    pub fn new(id_field: impl Into<String>, rows: Vec<Row>) -> Self {
        Self { id_field: id_field.into(), original: rows.clone(), rows }
    }

    pub fn id_field(&self) -> &str { &self.id_field }

    pub fn rows(&self) -> &[Row] { &self.rows }

    pub fn original(&self) -> &[Row] { &self.original }

    pub fn find(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id_key(&self.id_field).as_deref() == Some(id))
    }

    /// Replace the row carrying the same identifier.
    pub fn commit_row_edit(&mut self, updated: Row) -> AppResult<()> {
        let id = updated.id_key(&self.id_field).ok_or_else(|| AppError::UnknownRow(String::from("<missing id>")))?;
        let slot = self.rows.iter_mut()
            .find(|r| r.id_key(&self.id_field).as_deref() == Some(id.as_str()))
            .ok_or_else(|| AppError::UnknownRow(id.clone()))?;
        *slot = updated;
        Ok(())
    }

    /// Rows that differ from their snapshot in any non-identifier column, in current order.
    /// Rows without a snapshot counterpart are never reported.
    pub fn diff_against_original(&self) -> Vec<Row> {
        let originals: HashMap<String, &Row> = self.original.iter()
            .filter_map(|r| r.id_key(&self.id_field).map(|k| (k, r)))
            .collect();
        self.rows.iter()
            .filter(|row| {
                row.id_key(&self.id_field)
                    .and_then(|k| originals.get(&k))
                    .map(|orig| row.differs_from(orig, &self.id_field))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Adopt `snapshot` as the new original (the rows as they were sent by a successful save).
    pub fn replace_snapshot(&mut self, snapshot: Vec<Row>) {
        self.original = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "id_politica_base_riesgo";

    fn matrix_row(id: i64, factor: f64, class: &str) -> Row {
        Row::new()
            .with(ID, CellValue::int(id))
            .with("factor_prov", CellValue::float(factor).unwrap())
            .with("clasificacion", CellValue::text(class))
    }

    #[test]
    fn cell_values_deserialize_from_json_scalars() {
        let r: Row = serde_json::from_str(r#"{"a":1,"b":"x","c":null,"d":0.25,"e":true}"#).unwrap();
        assert_eq!(r.get("a"), Some(&CellValue::int(1)));
        assert_eq!(r.get("b"), Some(&CellValue::text("x")));
        assert_eq!(r.get("c"), Some(&CellValue::Null));
        assert_eq!(r.get("d").and_then(|v| v.as_f64()), Some(0.25));
        assert_eq!(r.get("e"), Some(&CellValue::Bool(true)));
        assert_eq!(serde_json::to_value(&r).unwrap()["c"], serde_json::Value::Null);
    }

    #[test]
    fn projection_keeps_column_order_and_fills_nulls() {
        let rec: Row = serde_json::from_str(r#"{"a":1,"extra":2}"#).unwrap();
        let ds = Dataset::from_records(vec!["a".into(), "b".into()], vec![rec]);
        let row = &ds.rows[0];
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("b"), Some(&CellValue::Null));
        assert!(row.get("extra").is_none());
    }

    #[test]
    fn diff_reports_only_changed_rows() {
        let mut t = EditableTable::new(ID, vec![matrix_row(5, 0.1, "A"), matrix_row(7, 0.5, "B"), matrix_row(9, 1.0, "C")]);
        assert!(t.diff_against_original().is_empty());

        t.commit_row_edit(matrix_row(7, 0.6, "B")).unwrap();
        let diff = t.diff_against_original();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].id_key(ID).as_deref(), Some("7"));
        assert_eq!(diff[0].get("factor_prov").and_then(|v| v.as_f64()), Some(0.6));

        // idempotent
        assert_eq!(t.diff_against_original(), diff);

        // reverting removes the row from the diff
        t.commit_row_edit(matrix_row(7, 0.5, "B")).unwrap();
        assert!(t.diff_against_original().is_empty());
    }

    #[test]
    fn identifier_is_not_compared_and_unknown_ids_are_rejected() {
        let mut t = EditableTable::new(ID, vec![matrix_row(1, 0.1, "A")]);
        assert_eq!(t.commit_row_edit(matrix_row(2, 0.1, "A")), Err(AppError::UnknownRow("2".into())));
        assert_eq!(t.commit_row_edit(Row::new().with("factor_prov", CellValue::int(1))), Err(AppError::UnknownRow("<missing id>".into())));
        assert!(!matrix_row(1, 0.1, "A").differs_from(&matrix_row(3, 0.1, "A"), ID));
    }

    #[test]
    fn replacing_the_snapshot_clears_the_diff() {
        let mut t = EditableTable::new(ID, vec![matrix_row(1, 0.1, "A")]);
        t.commit_row_edit(matrix_row(1, 0.2, "A")).unwrap();
        assert_eq!(t.diff_against_original().len(), 1);
        t.replace_snapshot(t.rows().to_vec());
        assert!(t.diff_against_original().is_empty());
        assert_eq!(t.original()[0].get("factor_prov").and_then(|v| v.as_f64()), Some(0.2));
    }
}
