use serde::{Deserialize, Serialize};
use thiserror::Error;

mod secret;

pub use secret::Secret;

/// A single cell of a flattened result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Count(u64),
}

impl CellValue {
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Text(_) => 0.0,
            Self::Number(value) => *value,
            Self::Count(value) => *value as f64,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u64> for CellValue {
    fn from(value: u64) -> Self {
        Self::Count(value)
    }
}

pub type Row = Vec<CellValue>;

/// An ordered set of rows over named columns. Row order reflects the order
/// rows were pushed, which callers rely on for reproducible output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn push(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("requested column '{0}' is not produced by this flattening")]
    UnknownColumn(String),
    #[error("produced cell '{0}' has no place in the requested columns")]
    UnplacedCell(String),
}

/// Maps cells produced in a fixed logical order onto a caller-chosen column
/// order. Output column lists are caller parameters everywhere in this
/// workspace, so the permutation is resolved once up front instead of per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<String>,
    positions: Vec<usize>,
}

impl ColumnLayout {
    /// `producers` lists the logical cell names in the order cells will be
    /// supplied to [`ColumnLayout::arrange`]; `columns` is the requested
    /// output order. The two must name the same set.
    pub fn new(producers: &[&str], columns: &[&str]) -> Result<Self, LayoutError> {
        for column in columns {
            if !producers.contains(column) {
                return Err(LayoutError::UnknownColumn((*column).to_owned()));
            }
        }

        let mut positions = Vec::with_capacity(producers.len());
        for producer in producers {
            let position = columns
                .iter()
                .position(|column| column == producer)
                .ok_or_else(|| LayoutError::UnplacedCell((*producer).to_owned()))?;
            positions.push(position);
        }

        Ok(Self {
            columns: columns.iter().map(|column| (*column).to_owned()).collect(),
            positions,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Reorders `cells` (given in producer order) into the output column
    /// order. `cells` must have one entry per producer.
    pub fn arrange(&self, cells: Vec<CellValue>) -> Row {
        debug_assert_eq!(cells.len(), self.positions.len());

        let mut slots: Vec<Option<CellValue>> = vec![None; self.columns.len()];
        for (cell, position) in cells.into_iter().zip(self.positions.iter()) {
            slots[*position] = Some(cell);
        }

        slots.into_iter().flatten().collect()
    }
}
