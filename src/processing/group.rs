//! Partition rows by the values of their grouping fields.

use std::collections::HashMap;

use crate::types::{Row, Value};

/// Hashable view of one [`Value`].
///
/// Numbers compare by bit pattern after folding `-0.0` into `0.0`, so two values are the same
/// key exactly when they are equal as numbers (ingested values are never NaN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPart<'a> {
    Number(u64),
    Text(&'a str),
    Bool(bool),
}

impl<'a> From<&'a Value> for KeyPart<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Number(v) if *v == 0.0 => KeyPart::Number(0.0_f64.to_bits()),
            Value::Number(v) => KeyPart::Number(v.to_bits()),
            Value::Utf8(s) => KeyPart::Text(s),
            Value::Bool(b) => KeyPart::Bool(*b),
        }
    }
}

/// Rows sharing one combination of grouping values. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<'a> {
    pub rows: Vec<&'a Row>,
}

impl<'a> Group<'a> {
    /// A row representative of the group; every grouping field has the same value in all rows.
    pub fn first(&self) -> Option<&'a Row> {
        self.rows.first().copied()
    }
}

/// Group `rows` by the values at `fields`.
///
/// Groups appear in the order their first row appears in `rows`, and rows keep their relative
/// order inside each group. A field past the end of a row is part of the key as a missing value.
pub fn group_rows<'a>(rows: &[&'a Row], fields: &[usize]) -> Vec<Group<'a>> {
    let mut index: HashMap<Vec<Option<KeyPart<'a>>>, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for &row in rows {
        let key: Vec<Option<KeyPart<'a>>> = fields
            .iter()
            .map(|&f| row.get(f).map(KeyPart::from))
            .collect();
        match index.get(&key) {
            Some(&pos) => groups[pos].rows.push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(Group { rows: vec![row] });
            }
        }
    }

    groups
}
