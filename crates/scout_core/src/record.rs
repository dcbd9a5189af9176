use serde::{Serialize, Serializer};

/// One cell of a listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Link { link: String, value: String },
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn link(link: impl Into<String>, value: impl Into<String>) -> Self {
        CellValue::Link {
            link: link.into(),
            value: value.into(),
        }
    }

    /// Visible cell text, regardless of whether the cell held a hyperlink.
    pub fn value(&self) -> &str {
        match self {
            CellValue::Text(value) => value,
            CellValue::Link { value, .. } => value,
        }
    }

    pub fn href(&self) -> Option<&str> {
        match self {
            CellValue::Text(_) => None,
            CellValue::Link { link, .. } => Some(link),
        }
    }
}

/// A single row of the listing table keyed by column label.
///
/// Columns keep the order in which they were first inserted. Inserting a label
/// that already exists replaces its value in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskRecord {
    columns: Vec<(String, CellValue)>,
}

impl TaskRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        let column = column.into();
        match self.columns.iter_mut().find(|(label, _)| *label == column) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .find(|(label, _)| label == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.columns
            .iter()
            .map(|(label, value)| (label.as_str(), value))
    }
}

impl Serialize for TaskRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.columns.iter().map(|(label, value)| (label, value)))
    }
}
