//! Result ordering.

use std::cmp::Ordering;

use crate::query::plan::{Direction, OrderSpec};

use super::project::ResultRow;

/// Stable sort of `rows` by the columns at `spec.keys`, compared left to right.
///
/// `DOWN` reverses every comparison; rows that compare equal on all keys keep their order.
pub fn sort_rows(rows: &mut [ResultRow], spec: &OrderSpec) {
    rows.sort_by(|a, b| {
        let ord = spec
            .keys
            .iter()
            .map(|&k| compare_at(a, b, k))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal);
        match spec.direction {
            Direction::Up => ord,
            Direction::Down => ord.reverse(),
        }
    });
}

/// Compare the values of column `k`. A row without the column sorts first.
fn compare_at(a: &ResultRow, b: &ResultRow, k: usize) -> Ordering {
    match (a.values().get(k), b.values().get(k)) {
        (Some(x), Some(y)) => x.total_cmp(y),
        (x, y) => x.is_some().cmp(&y.is_some()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::sort_rows;
    use crate::processing::project::ResultRow;
    use crate::query::plan::{Direction, OrderSpec};
    use crate::types::Value;

    fn rows() -> Vec<ResultRow> {
        let names: Arc<[String]> = vec!["dept".to_string(), "avg".to_string(), "tag".to_string()].into();
        [("math", 80.0, "a"), ("cpsc", 90.0, "b"), ("math", 70.0, "c"), ("cpsc", 90.0, "d")]
            .into_iter()
            .map(|(d, a, t)| {
                ResultRow::new(
                    Arc::clone(&names),
                    vec![
                        Value::Utf8(d.to_string()),
                        Value::Number(a),
                        Value::Utf8(t.to_string()),
                    ],
                )
            })
            .collect()
    }

    fn tags(rows: &[ResultRow]) -> String {
        rows.iter()
            .map(|r| r.values()[2].as_str().unwrap())
            .collect()
    }

    #[test]
    fn up_sorts_ascending_and_keeps_ties_stable() {
        let mut rows = rows();
        sort_rows(
            &mut rows,
            &OrderSpec {
                direction: Direction::Up,
                keys: vec![0],
            },
        );
        assert_eq!(tags(&rows), "bdac");
    }

    #[test]
    fn later_keys_break_ties() {
        let mut rows = rows();
        sort_rows(
            &mut rows,
            &OrderSpec {
                direction: Direction::Up,
                keys: vec![0, 1],
            },
        );
        assert_eq!(tags(&rows), "bdca");
    }

    #[test]
    fn down_reverses_but_ties_keep_input_order() {
        let mut rows = rows();
        sort_rows(
            &mut rows,
            &OrderSpec {
                direction: Direction::Down,
                keys: vec![1],
            },
        );
        assert_eq!(tags(&rows), "bdac");
    }

    #[test]
    fn keys_past_the_last_column_leave_order_unchanged() {
        let mut rows = rows();
        sort_rows(
            &mut rows,
            &OrderSpec {
                direction: Direction::Down,
                keys: vec![5],
            },
        );
        assert_eq!(tags(&rows), "abcd");
    }
}
