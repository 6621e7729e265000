//! Row buffers as the stage sees them: positional, typed fields.
//!
//! The host owns the rows. The stage reads and writes fields by position
//! only, using positions resolved once per run by the column binder.

use chrono::NaiveDateTime;
use serde::Serialize;

/// One field of a buffer row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Unset; what the host initialises output fields with.
    #[default]
    Null,
    WStr(String),
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::WStr(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// Positional access to one row of a host buffer.
///
/// Implementations may panic on an out-of-range index: positions come from
/// the bound layout, so a bad index is a host bug.
pub trait BufferRow {
    /// The string at `index`, or `None` if the field is null or not a string.
    fn get_string(&self, index: usize) -> Option<&str>;

    fn set_string(&mut self, index: usize, value: String);

    fn set_timestamp(&mut self, index: usize, value: NaiveDateTime);
}

/// In-memory buffer row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row {
    fields: Vec<FieldValue>,
}

impl Row {
    pub fn new(fields: Vec<FieldValue>) -> Self {
        Self { fields }
    }

    /// A row of `width` null fields.
    pub fn with_width(width: usize) -> Self {
        Self {
            fields: vec![FieldValue::Null; width],
        }
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl BufferRow for Row {
    fn get_string(&self, index: usize) -> Option<&str> {
        self.fields[index].as_str()
    }

    fn set_string(&mut self, index: usize, value: String) {
        self.fields[index] = FieldValue::WStr(value);
    }

    fn set_timestamp(&mut self, index: usize, value: NaiveDateTime) {
        self.fields[index] = FieldValue::Timestamp(value);
    }
}

/// A buffer position and the column identity stored there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferColumn {
    pub lineage_id: u32,
    pub name: String,
}

/// Column layout of a host buffer, in position order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferLayout {
    columns: Vec<BufferColumn>,
}

impl BufferLayout {
    pub fn new(columns: Vec<BufferColumn>) -> Self {
        Self { columns }
    }

    pub fn push(&mut self, lineage_id: u32, name: impl Into<String>) -> usize {
        self.columns.push(BufferColumn {
            lineage_id,
            name: name.into(),
        });
        self.columns.len() - 1
    }

    pub fn columns(&self) -> &[BufferColumn] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Buffer position of the column with `lineage_id`.
    pub fn find_column_by_lineage_id(&self, lineage_id: u32) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.lineage_id == lineage_id)
    }
}
