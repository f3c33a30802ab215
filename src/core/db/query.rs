/// Query Result Module
///
/// This module defines the shapes a query produces: typed scalar values,
/// result sets aligned to the column list reported by the query's
/// metadata, and ordered field-name-to-value records for the read path.
use crate::core::Result;
use chrono::NaiveDateTime;
use std::fmt;

/// A typed scalar value in a result-set cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl Value {
    /// Converts the value into its JSON representation for export.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Text(t) => serde_json::Value::from(t.as_str()),
            Value::Timestamp(ts) => serde_json::Value::from(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            Value::Bytes(b) => serde_json::Value::from(format!("<BLOB: {} bytes>", b.len())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(t) => write!(f, "{}", t),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Bytes(b) => write!(f, "<BLOB: {} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// One tabular output of a single query or stored-procedure invocation.
///
/// Rows are aligned to `columns`; a row's nth value belongs to the nth
/// column. A single invocation may produce several of these.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    /// Column names from the query result metadata
    pub columns: Vec<String>,
    /// Rows of typed values
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Creates a new ResultSet from column names and row data.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        ResultSet { columns, rows }
    }

    /// Creates a ResultSet with no columns and no rows.
    pub fn empty() -> Self {
        ResultSet {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Number of rows in this result set.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the rows as ordered field-name-to-value records.
    ///
    /// # Errors
    ///
    /// Returns `DwhError::Query` if a row is wider than the column list,
    /// which indicates result metadata out of step with the data.
    pub fn records(&self) -> Result<Vec<Record>> {
        self.rows
            .iter()
            .map(|row| {
                if row.len() > self.columns.len() {
                    return Err(crate::core::DwhError::Query(format!(
                        "row has {} values but result metadata reports {} columns",
                        row.len(),
                        self.columns.len()
                    )));
                }
                Ok(Record {
                    fields: self
                        .columns
                        .iter()
                        .cloned()
                        .zip(row.iter().cloned())
                        .collect(),
                })
            })
            .collect()
    }
}

/// An ordered field-name-to-value mapping for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Looks a value up by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// The fields in column order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ResultSet {
        ResultSet::new(
            vec!["plantname".to_string(), "hours".to_string()],
            vec![
                vec![Value::from("XY-ZK"), Value::Int(168)],
                vec![Value::from("KL-MN"), Value::Int(24)],
            ],
        )
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Bytes(vec![1, 2, 3]).to_string(), "<BLOB: 3 bytes>");
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(Value::Null.to_json(), serde_json::Value::Null);
        assert_eq!(Value::Int(7).to_json(), serde_json::json!(7));
        assert_eq!(Value::from("x").to_json(), serde_json::json!("x"));
        // Non-finite floats cannot be represented in JSON
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_records_preserve_column_order() {
        let records = sample_set().records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("plantname"), Some(&Value::from("XY-ZK")));
        assert_eq!(records[0].get("hours"), Some(&Value::Int(168)));
        assert_eq!(records[0].fields()[0].0, "plantname");
        assert_eq!(records[0].fields()[1].0, "hours");
    }

    #[test]
    fn test_records_with_unknown_column() {
        let records = sample_set().records().unwrap();
        assert_eq!(records[0].get("missing"), None);
    }

    #[test]
    fn test_records_reject_misaligned_rows() {
        let set = ResultSet::new(
            vec!["a".to_string()],
            vec![vec![Value::Int(1), Value::Int(2)]],
        );
        assert!(set.records().is_err());
    }

    #[test]
    fn test_empty_result_set() {
        let set = ResultSet::empty();
        assert!(set.is_empty());
        assert_eq!(set.row_count(), 0);
        assert!(set.records().unwrap().is_empty());
    }
}
