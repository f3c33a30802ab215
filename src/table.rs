use crate::core::db::query::{ResultSet, Value};
use crate::core::{DwhError, Result};

/// Table Module
///
/// This module provides the dataframe-like shape the fetch path can
/// produce: column headers plus typed rows, with terminal rendering and
/// export functionality.

use std::collections::BTreeMap;

/// One result set shaped for display and export.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Self {
        Table {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Shapes a result set into a table. Rows stay aligned to the
    /// column list reported by the query's metadata.
    pub fn from_result_set(set: ResultSet) -> Self {
        Table {
            columns: set.columns,
            rows: set.rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the table as a simple string with headers and rows.
    pub fn render(&self) -> String {
        let mut output = String::new();
        if !self.columns.is_empty() {
            output.push_str(&self.columns.join(" | "));
            output.push('\n');
            let underline: Vec<String> = self
                .columns
                .iter()
                .map(|c| "-".repeat(c.len() + 2))
                .collect();
            output.push_str(&underline.join("-|-"));
            output.push('\n');
        }
        for row in &self.rows {
            let row_content: Vec<String> = row.iter().map(|value| value.to_string()).collect();
            output.push_str(&row_content.join(" | "));
            output.push('\n');
        }
        output
    }

    /// Exports the table data to a specified format.
    /// Supported formats: CSV, JSON, Markdown.
    pub fn export(&self, format: &str) -> Result<String> {
        match format.to_lowercase().as_str() {
            "csv" => self.export_to_csv(),
            "json" => self.export_to_json(),
            "markdown" => self.export_to_markdown(),
            _ => Err(DwhError::NotSupported(format!(
                "Unsupported export format: '{}'. Supported formats: csv, json, markdown",
                format
            ))),
        }
    }

    fn export_to_csv(&self) -> Result<String> {
        let mut output = String::new();
        if !self.columns.is_empty() {
            let headers: Vec<String> = self.columns.iter().map(|c| csv_field(c)).collect();
            output.push_str(&headers.join(","));
            output.push('\n');
        }
        for row in &self.rows {
            let row_content: Vec<String> = row
                .iter()
                .map(|value| csv_field(&value.to_string()))
                .collect();
            output.push_str(&row_content.join(","));
            output.push('\n');
        }
        Ok(output)
    }

    fn export_to_json(&self) -> Result<String> {
        let mut rows = Vec::new();
        for row in &self.rows {
            let mut row_map = BTreeMap::new();
            for (i, value) in row.iter().enumerate() {
                if let Some(column) = self.columns.get(i) {
                    row_map.insert(column.clone(), value.to_json());
                }
            }
            rows.push(row_map);
        }
        serde_json::to_string(&rows).map_err(DwhError::Json)
    }

    fn export_to_markdown(&self) -> Result<String> {
        let mut output = String::new();
        if !self.columns.is_empty() {
            output.push_str(&self.columns.join(" | "));
            output.push('\n');
            let underline: Vec<String> = self
                .columns
                .iter()
                .map(|c| "-".repeat(c.len()))
                .collect();
            output.push_str(&underline.join(" | "));
            output.push('\n');
        }
        for row in &self.rows {
            let row_content: Vec<String> = row.iter().map(|value| value.to_string()).collect();
            output.push_str(&row_content.join(" | "));
            output.push('\n');
        }
        Ok(output)
    }
}

impl Default for Table {
    fn default() -> Self {
        Table::new()
    }
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
