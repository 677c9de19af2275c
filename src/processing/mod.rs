//! Query evaluation over an in-memory [`crate::types::Table`].
//!
//! A validated [`QueryPlan`] runs as a fixed pipeline:
//!
//! - [`filter`]: keep rows matching the `WHERE` tree
//! - [`group`]: partition by the `GROUP` fields (grouped queries only)
//! - [`aggregate`]: compute each `APPLY` rule per group
//! - [`project`]: build one [`ResultRow`] per row or group
//! - [`order`]: sort by the `ORDER` keys
//!
//! The result-size ceiling is checked before projection, on the filtered row count for plain
//! queries and on the group count for grouped ones.

pub mod aggregate;
pub mod decimal;
pub mod filter;
pub mod group;
pub mod order;
pub mod project;

use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{InsightError, InsightResult};
use crate::query::plan::{ColumnSource, QueryPlan};
use crate::types::{Row, Value};

pub use aggregate::{AggregateOp, aggregate};
pub use decimal::Fixed;
pub use filter::filter_rows;
pub use group::{Group, group_rows};
pub use order::sort_rows;
pub use project::ResultRow;

/// Run `plan`, failing with [`InsightError::ResultTooLarge`] if more than `max_rows` rows would
/// be returned.
///
/// A column the plan cannot fill (an aggregate without `TRANSFORMATIONS`, an aggregate with no
/// numeric input, a field the row does not have) fails with [`InsightError::InvalidQuery`].
pub fn evaluate(plan: &QueryPlan, max_rows: usize) -> InsightResult<Vec<ResultRow>> {
    let matched = filter_rows(plan.table(), plan.filter());
    let names: Arc<[String]> = plan.columns().iter().map(|c| c.name.clone()).collect();

    let mut rows = match plan.transformations() {
        None => {
            check_ceiling(matched.len(), max_rows)?;
            matched
                .iter()
                .map(|row| {
                    let values = plan
                        .columns()
                        .iter()
                        .map(|c| match c.source {
                            ColumnSource::Field(idx) => field_value(row, idx, &c.name),
                            ColumnSource::Aggregate(_) => Err(InsightError::invalid_query(
                                format!("column '{}' needs TRANSFORMATIONS", c.name),
                            )),
                        })
                        .collect::<InsightResult<Vec<_>>>()?;
                    Ok(ResultRow::new(Arc::clone(&names), values))
                })
                .collect::<InsightResult<Vec<_>>>()?
        }
        Some(t) => {
            let groups = group_rows(&matched, &t.group_fields());
            check_ceiling(groups.len(), max_rows)?;
            groups
                .par_iter()
                .map(|group| {
                    let aggregates: Vec<Option<Value>> = t
                        .apply
                        .iter()
                        .map(|a| aggregate(&group.rows, a.field, a.op))
                        .collect();
                    let values = plan
                        .columns()
                        .iter()
                        .map(|c| match c.source {
                            ColumnSource::Field(idx) => match group.first() {
                                Some(row) => field_value(row, idx, &c.name),
                                None => Err(InsightError::invalid_query(format!(
                                    "column '{}' has no rows to read",
                                    c.name
                                ))),
                            },
                            ColumnSource::Aggregate(i) => {
                                aggregates.get(i).cloned().flatten().ok_or_else(|| {
                                    InsightError::invalid_query(format!(
                                        "aggregate '{}' has no value",
                                        c.name
                                    ))
                                })
                            }
                        })
                        .collect::<InsightResult<Vec<_>>>()?;
                    Ok(ResultRow::new(Arc::clone(&names), values))
                })
                .collect::<InsightResult<Vec<_>>>()?
        }
    };

    if let Some(order) = plan.order() {
        sort_rows(&mut rows, order);
    }
    Ok(rows)
}

fn field_value(row: &Row, idx: usize, column: &str) -> InsightResult<Value> {
    row.get(idx).cloned().ok_or_else(|| {
        InsightError::invalid_query(format!("column '{column}' is not a field of the dataset"))
    })
}

fn check_ceiling(rows: usize, limit: usize) -> InsightResult<()> {
    if rows > limit {
        return Err(InsightError::ResultTooLarge { rows, limit });
    }
    Ok(())
}
