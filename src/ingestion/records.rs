//! Record parser: unpacked archive files → typed rows.
//!
//! Each file must be JSON, either `{"result": [record, ...]}` or a bare array of records.
//! Records are read field by field through the kind's [`Schema`]; a record that is missing a
//! field, carries a wrong-typed value, or fails the kind's consistency checks is dropped on its
//! own. Only a dataset left with no rows at all is an error.

use std::fmt;

use rayon::prelude::*;

use crate::error::{InsightError, InsightResult};
use crate::schema::{Field, RawForm, Schema, schema_for};
use crate::types::{DataType, DatasetKind, Row, Value};

use super::archive::ArchiveEntry;

type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Counters describing one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    /// File entries found in the archive (directories excluded).
    pub files_read: usize,
    /// Files that were not JSON or had no record array.
    pub files_skipped: usize,
    /// Rows kept.
    pub rows: usize,
    /// Records dropped as malformed.
    pub rows_dropped: usize,
}

/// Rows parsed from an archive, in entry order then record order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDataset {
    pub rows: Vec<Row>,
    pub stats: IngestionStats,
}

/// Why a single record was dropped.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RowRejection {
    NotAnObject,
    Missing(&'static str),
    WrongType {
        field: &'static str,
        expected: DataType,
    },
    NonFinite(&'static str),
    Inconsistent(String),
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("record is not a json object"),
            Self::Missing(field) => write!(f, "missing field '{field}'"),
            Self::WrongType { field, expected } => write!(f, "field '{field}' is not a {expected}"),
            Self::NonFinite(field) => write!(f, "field '{field}' is not a finite number"),
            Self::Inconsistent(message) => f.write_str(message),
        }
    }
}

type RecordParser = fn(&Schema, &JsonObject) -> Result<Row, RowRejection>;

fn parser_for(kind: DatasetKind) -> RecordParser {
    match kind {
        DatasetKind::Courses => parse_course,
        DatasetKind::Rooms => parse_room,
    }
}

/// Parse every file of an archive into rows of `kind`.
///
/// Fails with [`InsightError::MalformedDataset`] when the archive has no files or when no
/// record survives validation.
pub fn parse_dataset(entries: &[ArchiveEntry], kind: DatasetKind) -> InsightResult<ParsedDataset> {
    let files: Vec<&ArchiveEntry> = entries.iter().filter(|e| !e.is_dir()).collect();
    if files.is_empty() {
        return Err(InsightError::malformed("archive contains no files"));
    }

    let schema = schema_for(kind);
    let parser = parser_for(kind);

    // Indexed collect keeps file order.
    let per_file: Vec<Option<FileRows>> = files
        .par_iter()
        .map(|entry| parse_file(entry, schema, parser))
        .collect();

    let mut stats = IngestionStats {
        files_read: files.len(),
        ..Default::default()
    };
    let mut rows = Vec::new();
    let mut first_rejection = None;
    for file in per_file {
        match file {
            Some(file) => {
                stats.rows_dropped += file.dropped;
                first_rejection = first_rejection.or(file.first_rejection);
                rows.extend(file.rows);
            }
            None => stats.files_skipped += 1,
        }
    }
    stats.rows = rows.len();

    if rows.is_empty() {
        let reason = first_rejection
            .map(|r| format!(" (first rejected record: {r})"))
            .unwrap_or_default();
        return Err(InsightError::malformed(format!(
            "no valid {kind} records found in {} file(s){reason}",
            stats.files_read
        )));
    }

    Ok(ParsedDataset { rows, stats })
}

struct FileRows {
    rows: Vec<Row>,
    dropped: usize,
    first_rejection: Option<RowRejection>,
}

fn parse_file(entry: &ArchiveEntry, schema: &Schema, parser: RecordParser) -> Option<FileRows> {
    let doc = serde_json::from_slice::<serde_json::Value>(&entry.bytes).ok()?;
    let records = match doc {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("result") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };

    let mut rows = Vec::with_capacity(records.len());
    let mut dropped = 0;
    let mut first_rejection = None;
    for record in &records {
        let parsed = record
            .as_object()
            .ok_or(RowRejection::NotAnObject)
            .and_then(|obj| parser(schema, obj));
        match parsed {
            Ok(row) => rows.push(row),
            Err(rejection) => {
                dropped += 1;
                first_rejection.get_or_insert(rejection);
            }
        }
    }
    Some(FileRows {
        rows,
        dropped,
        first_rejection,
    })
}

fn read_fields(schema: &Schema, obj: &JsonObject) -> Result<Row, RowRejection> {
    schema
        .fields
        .iter()
        .map(|field| {
            let raw = obj
                .get(field.raw_key)
                .ok_or(RowRejection::Missing(field.name))?;
            convert_raw(field, raw)
        })
        .collect()
}

fn convert_raw(field: &Field, raw: &serde_json::Value) -> Result<Value, RowRejection> {
    use serde_json::Value as Json;

    let wrong_type = || RowRejection::WrongType {
        field: field.name,
        expected: field.data_type,
    };

    match (field.data_type, raw) {
        (DataType::Number, Json::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Value::Number)
            .ok_or(RowRejection::NonFinite(field.name)),
        (DataType::Number, Json::String(s)) if field.raw_form == RawForm::Digits => {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(wrong_type());
            }
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Value::Number)
                .ok_or(RowRejection::NonFinite(field.name))
        }
        (DataType::Utf8, Json::String(s)) => Ok(Value::Utf8(s.clone())),
        (DataType::Utf8, Json::Number(n)) if field.raw_form == RawForm::Digits => {
            if n.is_i64() || n.is_u64() {
                Ok(Value::Utf8(n.to_string()))
            } else {
                Err(wrong_type())
            }
        }
        (DataType::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
        _ => Err(wrong_type()),
    }
}

// Sections summarising every offering of a course carry this year instead of their own.
const OVERALL_SECTION_YEAR: f64 = 1900.0;

fn parse_course(schema: &Schema, obj: &JsonObject) -> Result<Row, RowRejection> {
    let mut row = read_fields(schema, obj)?;
    let overall = obj.get("Section").and_then(|s| s.as_str()) == Some("overall");
    if overall {
        if let Some(idx) = schema.index_of("year") {
            row[idx] = Value::Number(OVERALL_SECTION_YEAR);
        }
    }
    Ok(row)
}

fn parse_room(schema: &Schema, obj: &JsonObject) -> Result<Row, RowRejection> {
    let row = read_fields(schema, obj)?;
    check_room(schema, &row)?;
    Ok(row)
}

fn check_room(schema: &Schema, row: &Row) -> Result<(), RowRejection> {
    let get = |name: &str| schema.index_of(name).and_then(|idx| row.get(idx));
    let number = |name: &str| get(name).and_then(Value::as_f64);
    let text = |name: &str| get(name).and_then(Value::as_str).unwrap_or_default();

    let lat = number("lat").unwrap_or(f64::NAN);
    if !(-90.0..=90.0).contains(&lat) {
        return Err(RowRejection::Inconsistent(format!("lat {lat} out of range")));
    }
    let lon = number("lon").unwrap_or(f64::NAN);
    if !(-180.0..=180.0).contains(&lon) {
        return Err(RowRejection::Inconsistent(format!("lon {lon} out of range")));
    }
    let seats = number("seats").unwrap_or(f64::NAN);
    if !(seats >= 0.0 && seats.fract() == 0.0) {
        return Err(RowRejection::Inconsistent(format!(
            "seats {seats} is not a non-negative integer"
        )));
    }

    let expected_name = format!("{}_{}", text("shortname"), text("number"));
    if text("name") != expected_name {
        return Err(RowRejection::Inconsistent(format!(
            "name '{}' does not match '{expected_name}'",
            text("name")
        )));
    }
    Ok(())
}
