use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value, json};
use stepsheet_core::{CellValue, Column, ColumnId, State};
use stepsheet_engine::ValidationError;
use stepsheet_script::literal::float_literal;

use crate::error::SessionError;

/// Unique values past this many are left out of the response.
pub const MAX_UNIQUE_VALUES: usize = 1000;

/// Summary statistics for one column, every value rendered as a string.
///
/// Numeric columns get count, mean, std, min, quartiles, max, median and sum.
/// Other columns get count, unique, top and freq. Both get `count: NaN`.
pub fn column_describe(state: &State, sheet_index: usize, column_id: &ColumnId) -> Result<Value, SessionError> {
    let column = resolve(state, sheet_index, column_id)?;
    let values = column.values();
    let missing = values.iter().filter(|v| v.is_missing()).count();

    let mut describe = Map::new();
    if column.dtype().is_numeric() {
        let mut numbers: Vec<f64> = values.iter().filter_map(CellValue::as_f64).collect();
        numbers.sort_by(f64::total_cmp);
        let count = numbers.len();
        let sum: f64 = numbers.iter().sum();
        let mean = sum / count as f64;
        let std = match count {
            0 | 1 => f64::NAN,
            _ => (numbers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt(),
        };
        describe.insert("count".into(), json!(count.to_string()));
        describe.insert("mean".into(), json!(stat(mean)));
        describe.insert("std".into(), json!(stat(std)));
        describe.insert("min".into(), json!(stat(quantile(&numbers, 0.0))));
        describe.insert("25%".into(), json!(stat(quantile(&numbers, 0.25))));
        describe.insert("50%".into(), json!(stat(quantile(&numbers, 0.5))));
        describe.insert("75%".into(), json!(stat(quantile(&numbers, 0.75))));
        describe.insert("max".into(), json!(stat(quantile(&numbers, 1.0))));
        describe.insert("median".into(), json!(stat(quantile(&numbers, 0.5))));
        describe.insert("sum".into(), json!(stat(sum)));
    } else {
        let counts = value_counts(values.iter().filter(|v| !v.is_missing()));
        describe.insert("count".into(), json!((values.len() - missing).to_string()));
        describe.insert("unique".into(), json!(counts.len().to_string()));
        if let Some(top) = counts.first() {
            describe.insert("top".into(), json!(top.value.to_string()));
            describe.insert("freq".into(), json!(top.count.to_string()));
        }
    }
    describe.insert("count: NaN".into(), json!(missing.to_string()));
    Ok(Value::Object(describe))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: CellValue,
    pub count: usize,
    pub percent: f64,
}

/// Occurrences of each distinct value, most frequent first, missing values
/// included. Ties keep first-appearance order.
pub fn unique_value_counts(
    state: &State,
    sheet_index: usize,
    column_id: &ColumnId,
) -> Result<Value, SessionError> {
    let column = resolve(state, sheet_index, column_id)?;
    let mut counts = value_counts(column.values().iter());
    let is_all_data = counts.len() <= MAX_UNIQUE_VALUES;
    counts.truncate(MAX_UNIQUE_VALUES);
    Ok(json!({
        "uniqueValueCounts": counts,
        "isAllData": is_all_data,
    }))
}

fn resolve<'a>(state: &'a State, sheet_index: usize, column_id: &ColumnId) -> Result<&'a Column, SessionError> {
    let table = state
        .table(sheet_index)
        .map_err(|_| ValidationError::NoSheet(sheet_index))?;
    let missing = || ValidationError::NoColumn {
        sheet_index,
        column_id: column_id.clone(),
    };
    let header = state.header(sheet_index, column_id).map_err(|_| missing())?;
    Ok(table.column(header).map_err(|_| missing())?)
}

fn value_counts<'a>(values: impl Iterator<Item = &'a CellValue>) -> Vec<ValueCount> {
    let mut order: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<ValueCount> = Vec::new();
    let mut total = 0;
    for value in values {
        total += 1;
        // Null and NaN count as one missing value.
        let key = if value.is_missing() {
            "missing".to_string()
        } else {
            format!("{value:?}")
        };
        match order.get(&key) {
            Some(&index) => counts[index].count += 1,
            None => {
                order.insert(key, counts.len());
                counts.push(ValueCount {
                    value: if value.is_missing() { CellValue::Null } else { value.clone() },
                    count: 1,
                    percent: 0.0,
                });
            }
        }
    }
    for entry in &mut counts {
        entry.percent = entry.count as f64 / total as f64;
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Linear interpolation between closest ranks over sorted input.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

fn stat(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    float_literal((x * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepsheet_core::{AddTable, Provenance, Table};

    fn state() -> State {
        let table = Table::new(vec![
            (
                "n".into(),
                vec![
                    CellValue::Integer(1),
                    CellValue::Integer(2),
                    CellValue::Integer(3),
                    CellValue::Integer(4),
                ],
            ),
            (
                "s".into(),
                vec![
                    CellValue::text("b"),
                    CellValue::text("a"),
                    CellValue::Null,
                    CellValue::text("a"),
                ],
            ),
        ])
        .unwrap();
        let mut state = State::new();
        state.add_table(table, Provenance::Passed, AddTable::append()).unwrap();
        state
    }

    #[test]
    fn describes_numeric_columns() {
        let describe = column_describe(&state(), 0, &ColumnId::from("c1")).unwrap();
        assert_eq!(describe["count"], json!("4"));
        assert_eq!(describe["mean"], json!("2.5"));
        assert_eq!(describe["std"], json!("1.29"));
        assert_eq!(describe["25%"], json!("1.75"));
        assert_eq!(describe["median"], json!("2.5"));
        assert_eq!(describe["max"], json!("4.0"));
        assert_eq!(describe["sum"], json!("10.0"));
        assert_eq!(describe["count: NaN"], json!("0"));
    }

    #[test]
    fn describes_text_columns() {
        let describe = column_describe(&state(), 0, &ColumnId::from("c2")).unwrap();
        assert_eq!(describe["count"], json!("3"));
        assert_eq!(describe["unique"], json!("2"));
        assert_eq!(describe["top"], json!("a"));
        assert_eq!(describe["freq"], json!("2"));
        assert_eq!(describe["count: NaN"], json!("1"));
        assert!(describe.get("mean").is_none());
    }

    #[test]
    fn counts_most_frequent_first() {
        let counts = unique_value_counts(&state(), 0, &ColumnId::from("c2")).unwrap();
        assert_eq!(counts["isAllData"], json!(true));
        let rows = counts["uniqueValueCounts"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], json!({"value": "a", "count": 2, "percent": 0.5}));
        assert_eq!(rows[1]["value"], json!("b"));
        assert_eq!(rows[2]["value"], Value::Null);
    }

    #[test]
    fn unknown_column_is_an_error() {
        assert!(column_describe(&state(), 0, &ColumnId::from("c9")).is_err());
        assert!(unique_value_counts(&state(), 3, &ColumnId::from("c1")).is_err());
    }
}
