//! Sanitizer collaborator behind the `autoclean` verb.

use std::collections::BTreeMap;

use crate::error::VerbError;
use crate::table::Table;
use crate::value::Value;

pub trait Sanitizer: Send + Sync {
    fn clean(&self, data: Value) -> Result<Value, VerbError>;
}

/// Fills missing table cells column by column: numeric columns with the
/// median, text columns with the most frequent value (ties go to the
/// smallest). Columns with no values at all are left as they are, and
/// anything that is not a table passes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnSanitizer;

impl Sanitizer for ColumnSanitizer {
    fn clean(&self, data: Value) -> Result<Value, VerbError> {
        match data {
            Value::Table(table) => Ok(Value::Table(fill_table(table))),
            other => Ok(other),
        }
    }
}

fn fill_table(mut table: Table) -> Table {
    for c in 0..table.columns.len() {
        let present: Vec<&Value> = table
            .rows
            .iter()
            .map(|r| &r[c])
            .filter(|v| !matches!(v, Value::Null))
            .collect();
        if present.len() == table.rows.len() {
            continue;
        }
        let Some(fill) = median(&present).or_else(|| mode(&present)) else {
            continue;
        };
        for row in &mut table.rows {
            if matches!(row[c], Value::Null) {
                row[c] = fill.clone();
            }
        }
        tracing::debug!(column = %table.columns[c], fill = %fill, "filled missing cells");
    }
    table
}

fn median(values: &[&Value]) -> Option<Value> {
    if values.is_empty() {
        return None;
    }
    let mut nums = values.iter().map(|v| v.as_f64()).collect::<Option<Vec<f64>>>()?;
    nums.sort_by(|a, b| a.total_cmp(b));
    let mid = nums.len() / 2;
    let m = if nums.len() % 2 == 0 {
        (nums[mid - 1] + nums[mid]) / 2.0
    } else {
        nums[mid]
    };
    let all_int = values.iter().all(|v| matches!(v, Value::Int(_)));
    if all_int && m.fract() == 0.0 {
        Some(Value::Int(m as i64))
    } else {
        Some(Value::Float(m))
    }
}

fn mode(values: &[&Value]) -> Option<Value> {
    let mut counts: BTreeMap<String, (usize, &Value)> = BTreeMap::new();
    for v in values {
        counts.entry(v.to_string()).or_insert((0, v)).0 += 1;
    }
    // BTreeMap iterates keys in order, so the first maximum is the smallest.
    let mut best: Option<(usize, &Value)> = None;
    for (count, v) in counts.values() {
        if best.map_or(true, |(n, _)| *count > n) {
            best = Some((*count, v));
        }
    }
    best.map(|(_, v)| v.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_csv(csv: &str) -> Table {
        let t = Table::from_csv(csv.as_bytes()).unwrap();
        match ColumnSanitizer.clean(Value::Table(t)).unwrap() {
            Value::Table(t) => t,
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn numeric_columns_take_the_median() {
        let t = clean_csv("a,b\n1,1.0\n,\n3,4.0\n10,\n");
        assert_eq!(t.rows[1][0], Value::Int(3));
        assert_eq!(t.rows[1][1], Value::Float(2.5));
        assert_eq!(t.rows[3][1], Value::Float(2.5));
    }

    #[test]
    fn text_columns_take_the_mode() {
        let t = clean_csv("city,n\nb,1\na,2\nb,3\n,4\na,5\n");
        assert_eq!(t.rows[3][0], Value::Str("a".into()));
    }

    #[test]
    fn empty_columns_and_non_tables_pass_through() {
        let t = clean_csv("a,b\n1,\n2,\n");
        assert_eq!(t.rows[0][1], Value::Null);
        assert_eq!(ColumnSanitizer.clean(Value::Int(3)).unwrap(), Value::Int(3));
    }
}
