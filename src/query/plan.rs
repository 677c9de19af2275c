//! Validated query plan.
//!
//! A [`QueryPlan`] only exists once every rule of the validator has passed: field references are
//! resolved to schema indexes, comparators match field types, and every projected or ordered
//! column is known to exist. The evaluator never re-checks any of this.

use std::sync::Arc;

use crate::processing::AggregateOp;
use crate::types::Table;

/// Executable form of one query. Built per call and dropped afterwards.
///
/// Only [`crate::query::parse_query`] builds plans outside this crate, so a plan seen by a caller
/// has passed validation.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// The single dataset the query reads, resolved at validation time.
    pub(crate) table: Arc<Table>,
    pub(crate) filter: Filter,
    pub(crate) transformations: Option<Transformations>,
    /// Output columns, in declaration order. Never empty.
    pub(crate) columns: Vec<Column>,
    pub(crate) order: Option<OrderSpec>,
}

impl QueryPlan {
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn transformations(&self) -> Option<&Transformations> {
        self.transformations.as_ref()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn order(&self) -> Option<&OrderSpec> {
        self.order.as_ref()
    }
}

/// Predicate tree evaluated per row.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Empty `WHERE`: every row matches.
    All,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Compare(Comparison),
}

/// A typed leaf comparison. `field` is an index into the table's schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Number {
        field: usize,
        op: NumericOp,
        value: f64,
    },
    Text {
        field: usize,
        pattern: WildcardPattern,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Lt,
    Gt,
    Eq,
}

/// Case-sensitive string pattern with optional `*` at either end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    text: String,
    leading: bool,
    trailing: bool,
}

impl WildcardPattern {
    /// Parse an `IS` value. Returns `None` if an asterisk appears anywhere but the ends.
    pub fn parse(raw: &str) -> Option<Self> {
        let leading = raw.starts_with('*');
        let rest = if leading { &raw[1..] } else { raw };
        let trailing = rest.ends_with('*');
        let text = if trailing {
            &rest[..rest.len() - 1]
        } else {
            rest
        };
        if text.contains('*') {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            leading,
            trailing,
        })
    }

    pub fn matches(&self, s: &str) -> bool {
        match (self.leading, self.trailing) {
            (false, false) => s == self.text,
            (true, false) => s.ends_with(&self.text),
            (false, true) => s.starts_with(&self.text),
            (true, true) => s.contains(&self.text),
        }
    }
}

/// `GROUP` keys and `APPLY` rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformations {
    /// Grouping key fields, in declaration order.
    pub group: Vec<GroupKey>,
    pub apply: Vec<Aggregation>,
}

impl Transformations {
    pub fn group_fields(&self) -> Vec<usize> {
        self.group.iter().map(|g| g.field).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKey {
    /// Key as written in the query (`<id>_<field>`).
    pub key: String,
    pub field: usize,
}

/// One `APPLY` rule: `{ name: { op: field } }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub name: String,
    pub op: AggregateOp,
    pub field: usize,
}

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Name as written in `COLUMNS`; also the key in result rows.
    pub name: String,
    pub source: ColumnSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// Schema index of a dataset field.
    Field(usize),
    /// Index into [`Transformations::apply`].
    Aggregate(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Sort keys as indexes into [`QueryPlan::columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub direction: Direction,
    pub keys: Vec<usize>,
}
