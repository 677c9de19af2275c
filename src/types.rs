//! Core data model types.
//!
//! Ingestion turns raw records into rows of typed [`Value`]s, laid out in the field order of the
//! kind's [`crate::schema::Schema`]. A loaded dataset is a [`Table`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{InsightError, InsightResult};
use crate::schema::{Schema, schema_for};

/// The closed set of record families the service can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Academic course sections.
    Courses,
    /// Campus rooms.
    Rooms,
}

impl DatasetKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Courses, DatasetKind::Rooms];

    /// Lowercase name used in logs and listings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Courses => "courses",
            Self::Rooms => "rooms",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Finite 64-bit floating point number.
    Number,
    /// UTF-8 string.
    Utf8,
    /// Boolean.
    Bool,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Number => "number",
            Self::Utf8 => "string",
            Self::Bool => "boolean",
        })
    }
}

/// A single typed value in a row or in a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Number (always finite once ingested).
    Number(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Boolean.
    Bool(bool),
}

impl Value {
    /// The [`DataType`] this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Number(_) => DataType::Number,
            Self::Utf8(_) => DataType::Utf8,
            Self::Bool(_) => DataType::Bool,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Total ordering used for sorting result rows.
    ///
    /// Numbers use IEEE total order, strings compare by code point. Values of different types
    /// never share a column; they are ordered by type so the comparison stays total.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            _ => type_rank(self).cmp(&type_rank(other)),
        }
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Number(_) => 0,
        Value::Utf8(_) => 1,
        Value::Bool(_) => 2,
    }
}

// Largest magnitude at which every integer is exactly representable as f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(v) if v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*v as i64)
            }
            Self::Number(v) => serializer.serialize_f64(*v),
            Self::Utf8(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

/// One validated record, with values in schema field order.
pub type Row = Vec<Value>;

/// A loaded dataset: kind, identifier and rows in source order.
///
/// Every row has one value per field of the kind's schema, of the field's declared type.
/// [`Table::new`] checks this, and the fields are private so the check cannot be bypassed.
/// Tables are never mutated after construction; the store shares them behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    id: String,
    kind: DatasetKind,
    rows: Vec<Row>,
}

impl Table {
    /// Create a table, checking every row against the schema of `kind`.
    ///
    /// Fails with [`InsightError::MalformedDataset`] on the first row with the wrong number of
    /// values or a value of the wrong type.
    pub fn new(id: impl Into<String>, kind: DatasetKind, rows: Vec<Row>) -> InsightResult<Self> {
        let schema = schema_for(kind);
        for (n, row) in rows.iter().enumerate() {
            if row.len() != schema.fields.len() {
                return Err(InsightError::malformed(format!(
                    "row {n} has {} values, {kind} rows have {}",
                    row.len(),
                    schema.fields.len()
                )));
            }
            if let Some((field, value)) = schema
                .fields
                .iter()
                .zip(row)
                .find(|(field, value)| value.data_type() != field.data_type)
            {
                return Err(InsightError::malformed(format!(
                    "row {n}: field '{}' must be a {}, found a {}",
                    field.name,
                    field.data_type,
                    value.data_type()
                )));
            }
        }
        Ok(Self {
            id: id.into(),
            kind,
            rows,
        })
    }

    /// Identifier the dataset was added under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record family of every row.
    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Rows in source order, values in schema field order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows in the table.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Schema of this table's kind.
    pub fn schema(&self) -> &'static Schema {
        schema_for(self.kind)
    }

    /// Summary used by dataset listings.
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id.clone(),
            kind: self.kind,
            num_rows: self.row_count(),
        }
    }
}

/// Identifier, kind and size of a loaded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub id: String,
    pub kind: DatasetKind,
    #[serde(rename = "numRows")]
    pub num_rows: usize,
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::{DatasetKind, Table, Value};
    use crate::error::InsightError;
    use crate::schema::schema_for;

    #[test]
    fn integral_numbers_serialize_as_integers() {
        let out = serde_json::to_string(&vec![
            Value::Number(97.0),
            Value::Number(85.25),
            Value::Utf8("cpsc".to_string()),
            Value::Bool(true),
        ])
        .unwrap();
        assert_eq!(out, r#"[97,85.25,"cpsc",true]"#);
    }

    #[test]
    fn total_cmp_orders_numbers_and_strings() {
        assert_eq!(
            Value::Number(1.5).total_cmp(&Value::Number(2.0)),
            Ordering::Less
        );
        assert_eq!(
            Value::Utf8("b".to_string()).total_cmp(&Value::Utf8("a".to_string())),
            Ordering::Greater
        );
        assert_eq!(
            Value::Utf8("Z".to_string()).total_cmp(&Value::Utf8("a".to_string())),
            Ordering::Less
        );
    }

    #[test]
    fn summary_reports_row_count_and_kind() {
        let schema = schema_for(DatasetKind::Rooms);
        let table = Table::new(
            "rooms",
            DatasetKind::Rooms,
            vec![schema.blank_row(), schema.blank_row()],
        )
        .unwrap();
        let summary = table.summary();
        assert_eq!(summary.num_rows, 2);
        assert_eq!(table.id(), "rooms");
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            serde_json::json!({"id": "rooms", "kind": "rooms", "numRows": 2})
        );
    }

    #[test]
    fn rows_must_match_the_kind_schema() {
        let short = Table::new("courses", DatasetKind::Courses, vec![vec![Value::Number(1.0)]]);
        assert_eq!(
            short.unwrap_err(),
            InsightError::MalformedDataset {
                message: "row 0 has 1 values, courses rows have 10".to_string()
            }
        );

        let mut row = schema_for(DatasetKind::Courses).blank_row();
        row[2] = Value::Utf8("97".to_string());
        let wrong_type = Table::new(
            "courses",
            DatasetKind::Courses,
            vec![schema_for(DatasetKind::Courses).blank_row(), row],
        );
        assert_eq!(
            wrong_type.unwrap_err(),
            InsightError::MalformedDataset {
                message: "row 1: field 'avg' must be a number, found a string".to_string()
            }
        );

        assert!(Table::new("empty", DatasetKind::Rooms, Vec::new()).is_ok());
    }
}
