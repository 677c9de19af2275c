//! Aggregations applied per group.

use std::collections::HashSet;
use std::fmt;

use crate::types::{Row, Value};

use super::decimal::{Fixed, round2_f64};
use super::group::KeyPart;

/// Built-in aggregation operations over a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    /// Largest numeric value.
    Max,
    /// Smallest numeric value.
    Min,
    /// Mean, rounded to two decimals.
    Avg,
    /// Total, rounded to two decimals.
    Sum,
    /// Number of distinct values (any type).
    Count,
}

impl AggregateOp {
    /// Parse an `APPLY` token (`"MAX"`, `"MIN"`, `"AVG"`, `"SUM"`, `"COUNT"`).
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "MAX" => Self::Max,
            "MIN" => Self::Min,
            "AVG" => Self::Avg,
            "SUM" => Self::Sum,
            "COUNT" => Self::Count,
            _ => return None,
        })
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Avg => "AVG",
            Self::Sum => "SUM",
            Self::Count => "COUNT",
        }
    }

    /// Whether the operation only accepts numeric fields.
    pub fn requires_numeric(self) -> bool {
        !matches!(self, Self::Count)
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Aggregate the values at `field` over `rows`.
///
/// - `Max`/`Min` return the extreme number unchanged.
/// - `Avg`/`Sum` accumulate in [`Fixed`] and round to two decimals. Inputs or totals outside
///   the fixed-point range are accumulated in `f64` instead.
/// - `Count` returns the number of distinct values.
///
/// Returns `None` for the numeric operations when no row holds a number at `field`, and for
/// `Sum` when the total is not finite.
pub fn aggregate(rows: &[&Row], field: usize, op: AggregateOp) -> Option<Value> {
    let numbers = || {
        rows.iter()
            .filter_map(|row| row.get(field).and_then(Value::as_f64))
    };

    match op {
        AggregateOp::Max => numbers().reduce(f64::max).map(Value::Number),
        AggregateOp::Min => numbers().reduce(f64::min).map(Value::Number),
        AggregateOp::Avg => {
            let values: Vec<f64> = numbers().collect();
            let mean = match Fixed::checked_sum(values.iter().copied()) {
                Some(total) => total.mean2(values.len())?,
                None => wide_mean(&values)?,
            };
            Some(Value::Number(mean))
        }
        AggregateOp::Sum => {
            let values: Vec<f64> = numbers().collect();
            if values.is_empty() {
                return None;
            }
            let total = match Fixed::checked_sum(values.iter().copied()) {
                Some(total) => total.round2(),
                None => wide_sum(&values)?,
            };
            Some(Value::Number(total))
        }
        AggregateOp::Count => {
            let distinct: HashSet<KeyPart<'_>> = rows
                .iter()
                .filter_map(|row| row.get(field))
                .map(KeyPart::from)
                .collect();
            Some(Value::Number(distinct.len() as f64))
        }
    }
}

fn wide_sum(values: &[f64]) -> Option<f64> {
    let total: f64 = values.iter().sum();
    total.is_finite().then(|| round2_f64(total))
}

/// Mean of values too large for [`Fixed`]. Dividing before adding keeps the partial sums finite.
fn wide_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean: f64 = values.iter().map(|v| v / n).sum();
    mean.is_finite().then(|| round2_f64(mean))
}

#[cfg(test)]
mod tests {
    use super::{AggregateOp, aggregate};
    use crate::types::{Row, Value};

    fn column(values: &[f64]) -> Vec<Row> {
        values.iter().map(|v| vec![Value::Number(*v)]).collect()
    }

    fn run_on(values: &[f64], op: AggregateOp) -> Option<Value> {
        let rows = column(values);
        let refs: Vec<&Row> = rows.iter().collect();
        aggregate(&refs, 0, op)
    }

    fn rows() -> Vec<Row> {
        [
            ("smith", 90.5),
            ("jones", 70.25),
            ("smith", 88.0),
            ("lee", 90.5),
        ]
        .into_iter()
        .map(|(who, avg)| vec![Value::Utf8(who.to_string()), Value::Number(avg)])
        .collect()
    }

    fn run(op: AggregateOp, field: usize) -> Option<Value> {
        let rows = rows();
        let refs: Vec<&Row> = rows.iter().collect();
        aggregate(&refs, field, op)
    }

    #[test]
    fn tokens_parse_and_display() {
        for op in [
            AggregateOp::Max,
            AggregateOp::Min,
            AggregateOp::Avg,
            AggregateOp::Sum,
            AggregateOp::Count,
        ] {
            assert_eq!(AggregateOp::from_token(&op.to_string()), Some(op));
        }
        assert_eq!(AggregateOp::from_token("max"), None);
        assert!(!AggregateOp::Count.requires_numeric());
        assert!(AggregateOp::Avg.requires_numeric());
    }

    #[test]
    fn extremes_are_returned_unchanged() {
        assert_eq!(run(AggregateOp::Max, 1), Some(Value::Number(90.5)));
        assert_eq!(run(AggregateOp::Min, 1), Some(Value::Number(70.25)));
    }

    #[test]
    fn avg_and_sum_round_to_two_decimals() {
        // (90.5 + 70.25 + 88 + 90.5) / 4 = 84.8125
        assert_eq!(run(AggregateOp::Avg, 1), Some(Value::Number(84.81)));
        assert_eq!(run(AggregateOp::Sum, 1), Some(Value::Number(339.25)));
    }

    #[test]
    fn count_is_distinct_for_any_type() {
        assert_eq!(run(AggregateOp::Count, 0), Some(Value::Number(3.0)));
        assert_eq!(run(AggregateOp::Count, 1), Some(Value::Number(3.0)));
    }

    #[test]
    fn numeric_ops_on_no_numbers_yield_none() {
        assert_eq!(aggregate(&[], 0, AggregateOp::Max), None);
        assert_eq!(aggregate(&[], 0, AggregateOp::Avg), None);
        assert_eq!(aggregate(&[], 0, AggregateOp::Sum), None);
        assert_eq!(aggregate(&[], 0, AggregateOp::Count), Some(Value::Number(0.0)));
        assert_eq!(run(AggregateOp::Sum, 0), None);
    }

    #[test]
    fn totals_beyond_fixed_point_range_stay_exact_in_magnitude() {
        let big = [1e30, 1e30];
        assert_eq!(run_on(&big, AggregateOp::Sum), Some(Value::Number(2e30)));
        assert_eq!(run_on(&big, AggregateOp::Avg), Some(Value::Number(1e30)));
        assert_eq!(run_on(&big, AggregateOp::Max), Some(Value::Number(1e30)));

        // Both fit, their total does not.
        let near = [1.5e28, 1.5e28];
        assert_eq!(run_on(&near, AggregateOp::Sum), Some(Value::Number(3e28)));
        assert_eq!(run_on(&near, AggregateOp::Avg), Some(Value::Number(1.5e28)));

        assert_eq!(run_on(&[f64::MAX, f64::MAX], AggregateOp::Sum), None);
        assert_eq!(
            run_on(&[f64::MAX, f64::MAX], AggregateOp::Avg),
            Some(Value::Number(f64::MAX))
        );
    }

    #[test]
    fn fields_past_the_row_end_are_skipped() {
        let rows = rows();
        let refs: Vec<&Row> = rows.iter().collect();
        assert_eq!(aggregate(&refs, 9, AggregateOp::Sum), None);
        assert_eq!(aggregate(&refs, 9, AggregateOp::Count), Some(Value::Number(0.0)));
    }
}
