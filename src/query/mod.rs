//! Query language: JSON documents validated into executable plans.
//!
//! - [`parser`]: [`parse_query`], the fail-fast validator
//! - [`plan`]: the resolved [`QueryPlan`] handed to [`crate::processing::evaluate`]

pub mod parser;
pub mod plan;

pub use parser::parse_query;
pub use plan::{
    Aggregation, Column, ColumnSource, Comparison, Direction, Filter, GroupKey, NumericOp,
    OrderSpec, QueryPlan, Transformations, WildcardPattern,
};
