//! Row filtering by a validated [`Filter`] tree.

use rayon::prelude::*;

use crate::query::plan::{Comparison, Filter, NumericOp};
use crate::types::{Row, Table};

/// Whether `row` satisfies `filter`.
///
/// A comparison on a field the row does not have, or of the wrong type, is false.
pub fn matches(filter: &Filter, row: &Row) -> bool {
    match filter {
        Filter::All => true,
        Filter::And(children) => children.iter().all(|c| matches(c, row)),
        Filter::Or(children) => children.iter().any(|c| matches(c, row)),
        Filter::Not(inner) => !matches(inner, row),
        Filter::Compare(Comparison::Number { field, op, value }) => {
            row.get(*field).and_then(|v| v.as_f64()).is_some_and(|v| match op {
                NumericOp::Lt => v < *value,
                NumericOp::Gt => v > *value,
                NumericOp::Eq => v == *value,
            })
        }
        Filter::Compare(Comparison::Text { field, pattern }) => {
            row.get(*field)
                .and_then(|v| v.as_str())
                .is_some_and(|s| pattern.matches(s))
        }
    }
}

/// Rows of `table` that satisfy `filter`, in table order.
pub fn filter_rows<'a>(table: &'a Table, filter: &Filter) -> Vec<&'a Row> {
    if matches!(filter, Filter::All) {
        return table.rows().iter().collect();
    }
    table
        .rows()
        .par_iter()
        .filter(|row| matches(filter, row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{filter_rows, matches};
    use crate::query::plan::{Comparison, Filter, NumericOp, WildcardPattern};
    use crate::schema::schema_for;
    use crate::types::{DatasetKind, Row, Table, Value};

    const DEPT: usize = 0;
    const AVG: usize = 2;

    fn table() -> Table {
        let rows = [("cpsc", 95.0), ("math", 72.5), ("cpsc", 60.0), ("engl", 88.0)]
            .into_iter()
            .map(|(dept, avg)| {
                let mut row = schema_for(DatasetKind::Courses).blank_row();
                row[DEPT] = Value::Utf8(dept.to_string());
                row[AVG] = Value::Number(avg);
                row
            })
            .collect();
        Table::new("courses", DatasetKind::Courses, rows).unwrap()
    }

    fn gt(value: f64) -> Filter {
        Filter::Compare(Comparison::Number {
            field: AVG,
            op: NumericOp::Gt,
            value,
        })
    }

    fn is(pattern: &str) -> Filter {
        Filter::Compare(Comparison::Text {
            field: DEPT,
            pattern: WildcardPattern::parse(pattern).unwrap(),
        })
    }

    fn depts(rows: &[&Row]) -> Vec<String> {
        rows.iter()
            .map(|r| format!("{}:{}", r[DEPT].as_str().unwrap(), r[AVG].as_f64().unwrap()))
            .collect()
    }

    #[test]
    fn all_keeps_every_row_in_order() {
        let t = table();
        assert_eq!(filter_rows(&t, &Filter::All).len(), 4);
    }

    #[test]
    fn numeric_comparisons_are_strict() {
        let t = table();
        let row = &t.rows()[1];
        assert!(matches(&gt(72.0), row));
        assert!(!matches(&gt(72.5), row));
        assert!(matches(
            &Filter::Compare(Comparison::Number {
                field: AVG,
                op: NumericOp::Eq,
                value: 72.5
            }),
            row
        ));
        assert!(!matches(
            &Filter::Compare(Comparison::Number {
                field: AVG,
                op: NumericOp::Lt,
                value: 72.5
            }),
            row
        ));
    }

    #[test]
    fn logic_combines_children() {
        let t = table();
        let f = Filter::And(vec![is("cpsc"), Filter::Not(Box::new(gt(90.0)))]);
        assert_eq!(depts(&filter_rows(&t, &f)), vec!["cpsc:60"]);

        let f = Filter::Or(vec![is("*th"), gt(90.0)]);
        assert_eq!(depts(&filter_rows(&t, &f)), vec!["cpsc:95", "math:72.5"]);
    }

    #[test]
    fn filtering_preserves_table_order() {
        let t = table();
        assert_eq!(
            depts(&filter_rows(&t, &gt(70.0))),
            vec!["cpsc:95", "math:72.5", "engl:88"]
        );
    }

    #[test]
    fn out_of_range_fields_never_match() {
        let short: Row = vec![Value::Utf8("cpsc".to_string())];
        assert!(!matches(&gt(0.0), &short));
        assert!(!matches(
            &Filter::Compare(Comparison::Text {
                field: 40,
                pattern: WildcardPattern::parse("*").unwrap(),
            }),
            &short
        ));
        assert!(matches(&Filter::Not(Box::new(gt(0.0))), &short));
    }
}
