//! Query document → [`QueryPlan`].
//!
//! Validation is fail-fast: the first violation found is returned as
//! [`InsightError::InvalidQuery`] and no plan is produced. Sections are visited in the order
//! `WHERE`, `TRANSFORMATIONS`, `COLUMNS`, `ORDER`; the first `<id>_<field>` reference fixes the
//! dataset for the rest of the query.

use std::sync::Arc;

use serde_json::{Map, Value as Json};

use crate::error::{InsightError, InsightResult};
use crate::processing::AggregateOp;
use crate::schema::{Capability, Field};
use crate::store::{DatasetStore, validate_id};
use crate::types::{DataType, Table};

use super::plan::{
    Aggregation, Column, ColumnSource, Comparison, Direction, Filter, GroupKey, NumericOp,
    OrderSpec, QueryPlan, Transformations, WildcardPattern,
};

/// Validate `query` against the datasets currently in `store` and build its plan.
///
/// ```rust
/// use insight_engine::query::parse_query;
/// use insight_engine::store::DatasetStore;
///
/// let store = DatasetStore::new();
/// let query = serde_json::json!({"WHERE": {}, "OPTIONS": {"COLUMNS": ["courses_avg"]}});
/// // Nothing is loaded under "courses" yet.
/// assert!(parse_query(&query, &store).is_err());
/// ```
pub fn parse_query(query: &Json, store: &DatasetStore) -> InsightResult<QueryPlan> {
    QueryParser::new(store).parse(query)
}

fn invalid(message: impl Into<String>) -> InsightError {
    InsightError::invalid_query(message)
}

fn as_object<'a>(value: &'a Json, what: &str) -> InsightResult<&'a Map<String, Json>> {
    value
        .as_object()
        .ok_or_else(|| invalid(format!("{what} must be an object")))
}

/// The only entry of a single-key object.
fn single_entry<'a>(value: &'a Json, what: &str) -> InsightResult<(&'a str, &'a Json)> {
    let obj = as_object(value, what)?;
    let mut entries = obj.iter();
    match (entries.next(), entries.next()) {
        (Some((key, value)), None) => Ok((key.as_str(), value)),
        _ => Err(invalid(format!(
            "{what} must have exactly one key, found {}",
            obj.len()
        ))),
    }
}

fn string_list<'a>(value: &'a Json, what: &str) -> InsightResult<Vec<&'a str>> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("{what} must be an array")))?;
    if items.is_empty() {
        return Err(invalid(format!("{what} must not be empty")));
    }
    items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| invalid(format!("{what} entries must be strings, found {item}")))
        })
        .collect()
}

struct QueryParser<'s> {
    store: &'s DatasetStore,
    dataset: Option<Arc<Table>>,
}

impl<'s> QueryParser<'s> {
    fn new(store: &'s DatasetStore) -> Self {
        Self {
            store,
            dataset: None,
        }
    }

    fn parse(mut self, query: &Json) -> InsightResult<QueryPlan> {
        let obj = as_object(query, "query")?;
        if let Some(key) = obj
            .keys()
            .find(|k| !matches!(k.as_str(), "WHERE" | "OPTIONS" | "TRANSFORMATIONS"))
        {
            return Err(invalid(format!("unexpected top-level key '{key}'")));
        }
        let body = obj
            .get("WHERE")
            .ok_or_else(|| invalid("query is missing WHERE"))?;
        let options = obj
            .get("OPTIONS")
            .ok_or_else(|| invalid("query is missing OPTIONS"))?;
        let options = as_object(options, "OPTIONS")?;
        if let Some(key) = options
            .keys()
            .find(|k| !matches!(k.as_str(), "COLUMNS" | "ORDER"))
        {
            return Err(invalid(format!("unexpected OPTIONS key '{key}'")));
        }

        let filter = self.parse_where(body)?;
        let transformations = obj
            .get("TRANSFORMATIONS")
            .map(|t| self.parse_transformations(t))
            .transpose()?;
        let columns = self.parse_columns(
            options
                .get("COLUMNS")
                .ok_or_else(|| invalid("OPTIONS is missing COLUMNS"))?,
            transformations.as_ref(),
        )?;
        let order = options
            .get("ORDER")
            .map(|o| self.parse_order(o, &columns))
            .transpose()?;

        let table = self
            .dataset
            .ok_or_else(|| invalid("query does not reference any dataset"))?;
        Ok(QueryPlan {
            table,
            filter,
            transformations,
            columns,
            order,
        })
    }

    /// Resolve `<id>_<field>`, fixing the query's dataset on first use.
    fn resolve(
        &mut self,
        key: &str,
        capability: Option<Capability>,
        position: &str,
    ) -> InsightResult<(usize, &'static Field)> {
        let (id, field_name) = key
            .split_once('_')
            .ok_or_else(|| invalid(format!("{position} key '{key}' is not of the form <id>_<field>")))?;
        validate_id(id).map_err(|e| invalid(format!("{position} key '{key}': {e}")))?;

        let table = match &self.dataset {
            Some(table) if table.id() == id => Arc::clone(table),
            Some(table) => {
                return Err(invalid(format!(
                    "{position} key '{key}' references dataset '{id}' but the query reads '{}'",
                    table.id()
                )));
            }
            None => {
                let table = self
                    .store
                    .get(id)
                    .map_err(|_| invalid(format!("dataset '{id}' is not loaded")))?;
                self.dataset = Some(Arc::clone(&table));
                table
            }
        };

        let (idx, field) = table.schema().field(field_name).ok_or_else(|| {
            invalid(format!(
                "{position} key '{key}': '{field_name}' is not a {} field",
                table.kind()
            ))
        })?;
        if let Some(capability) = capability {
            if !field.supports(capability) {
                return Err(invalid(format!(
                    "{position} key '{key}' does not support {capability:?}"
                )));
            }
        }
        Ok((idx, field))
    }

    fn parse_where(&mut self, body: &Json) -> InsightResult<Filter> {
        if as_object(body, "WHERE")?.is_empty() {
            return Ok(Filter::All);
        }
        self.parse_filter(body)
    }

    fn parse_filter(&mut self, value: &Json) -> InsightResult<Filter> {
        let (op, body) = single_entry(value, "filter")?;
        match op {
            "AND" | "OR" => {
                let items = body
                    .as_array()
                    .ok_or_else(|| invalid(format!("{op} must be an array")))?;
                if items.is_empty() {
                    return Err(invalid(format!("{op} must not be empty")));
                }
                let children = items
                    .iter()
                    .map(|item| self.parse_filter(item))
                    .collect::<InsightResult<Vec<_>>>()?;
                Ok(if op == "AND" {
                    Filter::And(children)
                } else {
                    Filter::Or(children)
                })
            }
            "NOT" => Ok(Filter::Not(Box::new(self.parse_filter(body)?))),
            "LT" | "GT" | "EQ" => {
                let (key, operand) = single_entry(body, op)?;
                let (field, def) = self.resolve(key, Some(Capability::Filter), op)?;
                if def.data_type != DataType::Number {
                    return Err(invalid(format!(
                        "{op} needs a numeric field, '{key}' is a {}",
                        def.data_type
                    )));
                }
                let value = operand
                    .as_f64()
                    .ok_or_else(|| invalid(format!("{op} value for '{key}' must be a number")))?;
                let op = match op {
                    "LT" => NumericOp::Lt,
                    "GT" => NumericOp::Gt,
                    _ => NumericOp::Eq,
                };
                Ok(Filter::Compare(Comparison::Number { field, op, value }))
            }
            "IS" => {
                let (key, operand) = single_entry(body, op)?;
                let (field, def) = self.resolve(key, Some(Capability::Filter), op)?;
                if def.data_type != DataType::Utf8 {
                    return Err(invalid(format!(
                        "IS needs a string field, '{key}' is a {}",
                        def.data_type
                    )));
                }
                let raw = operand
                    .as_str()
                    .ok_or_else(|| invalid(format!("IS value for '{key}' must be a string")))?;
                let pattern = WildcardPattern::parse(raw).ok_or_else(|| {
                    invalid(format!(
                        "IS pattern '{raw}' may only use '*' as its first or last character"
                    ))
                })?;
                Ok(Filter::Compare(Comparison::Text { field, pattern }))
            }
            other => Err(invalid(format!("unknown filter '{other}'"))),
        }
    }

    fn parse_transformations(&mut self, value: &Json) -> InsightResult<Transformations> {
        let obj = as_object(value, "TRANSFORMATIONS")?;
        if let Some(key) = obj.keys().find(|k| !matches!(k.as_str(), "GROUP" | "APPLY")) {
            return Err(invalid(format!("unexpected TRANSFORMATIONS key '{key}'")));
        }

        let group_keys = string_list(
            obj.get("GROUP")
                .ok_or_else(|| invalid("TRANSFORMATIONS is missing GROUP"))?,
            "GROUP",
        )?;
        let mut group = Vec::with_capacity(group_keys.len());
        for key in group_keys {
            let (field, _) = self.resolve(key, Some(Capability::Group), "GROUP")?;
            group.push(GroupKey {
                key: key.to_string(),
                field,
            });
        }

        let rules = obj
            .get("APPLY")
            .ok_or_else(|| invalid("TRANSFORMATIONS is missing APPLY"))?
            .as_array()
            .ok_or_else(|| invalid("APPLY must be an array"))?;
        let mut apply: Vec<Aggregation> = Vec::with_capacity(rules.len());
        for rule in rules {
            let (name, body) = single_entry(rule, "APPLY rule")?;
            if name.is_empty() || name.contains('_') {
                return Err(invalid(format!(
                    "apply key '{name}' must be non-empty and must not contain '_'"
                )));
            }
            if apply.iter().any(|a| a.name == name) {
                return Err(invalid(format!("duplicate apply key '{name}'")));
            }

            let (token, target) = single_entry(body, "APPLY body")?;
            let op = AggregateOp::from_token(token)
                .ok_or_else(|| invalid(format!("unknown APPLY token '{token}'")))?;
            let key = target
                .as_str()
                .ok_or_else(|| invalid(format!("{token} target must be a string")))?;
            let capability = op.requires_numeric().then_some(Capability::Aggregate);
            let (field, _) = self.resolve(key, capability, token)?;
            apply.push(Aggregation {
                name: name.to_string(),
                op,
                field,
            });
        }

        Ok(Transformations { group, apply })
    }

    fn parse_columns(
        &mut self,
        value: &Json,
        transformations: Option<&Transformations>,
    ) -> InsightResult<Vec<Column>> {
        let keys = string_list(value, "COLUMNS")?;
        let mut columns = Vec::with_capacity(keys.len());
        for key in keys {
            let source = match transformations {
                Some(t) => {
                    if let Some(g) = t.group.iter().find(|g| g.key == key) {
                        ColumnSource::Field(g.field)
                    } else if let Some(pos) = t.apply.iter().position(|a| a.name == key) {
                        ColumnSource::Aggregate(pos)
                    } else {
                        return Err(invalid(format!(
                            "column '{key}' must be a GROUP key or an APPLY key"
                        )));
                    }
                }
                None if key.contains('_') => ColumnSource::Field(self.resolve(key, None, "COLUMNS")?.0),
                None => {
                    return Err(invalid(format!(
                        "column '{key}' is not a dataset field and the query has no TRANSFORMATIONS"
                    )));
                }
            };
            columns.push(Column {
                name: key.to_string(),
                source,
            });
        }
        Ok(columns)
    }

    fn parse_order(&self, value: &Json, columns: &[Column]) -> InsightResult<OrderSpec> {
        let (direction, keys) = match value {
            Json::String(key) => (Direction::Up, vec![key.as_str()]),
            Json::Object(obj) => {
                if let Some(key) = obj.keys().find(|k| !matches!(k.as_str(), "dir" | "keys")) {
                    return Err(invalid(format!("unexpected ORDER key '{key}'")));
                }
                let direction = match obj.get("dir").and_then(Json::as_str) {
                    Some("UP") => Direction::Up,
                    Some("DOWN") => Direction::Down,
                    _ => return Err(invalid("ORDER dir must be \"UP\" or \"DOWN\"")),
                };
                let keys = string_list(
                    obj.get("keys")
                        .ok_or_else(|| invalid("ORDER is missing keys"))?,
                    "ORDER keys",
                )?;
                (direction, keys)
            }
            _ => return Err(invalid("ORDER must be a string or an object")),
        };

        let table = self.dataset.as_ref();
        let keys = keys
            .into_iter()
            .map(|key| {
                let pos = columns
                    .iter()
                    .position(|c| c.name == key)
                    .ok_or_else(|| invalid(format!("ORDER key '{key}' must be in COLUMNS")))?;
                if let ColumnSource::Field(idx) = columns[pos].source {
                    let sortable = table
                        .and_then(|t| t.schema().fields.get(idx))
                        .is_some_and(|f| f.supports(Capability::Sort));
                    if !sortable {
                        return Err(invalid(format!("ORDER key '{key}' is not sortable")));
                    }
                }
                Ok(pos)
            })
            .collect::<InsightResult<Vec<_>>>()?;

        Ok(OrderSpec { direction, keys })
    }
}
