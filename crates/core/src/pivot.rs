use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::CoreError;
use crate::header::ColumnHeader;
use crate::table::{Column, Table};
use crate::value::{CellValue, ColumnType};

/// How the values of one column are summarized per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Aggregation {
    #[serde(rename = "sum")]
    Sum,
    #[serde(rename = "mean")]
    Mean,
    #[serde(rename = "median")]
    Median,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "count")]
    Count,
    #[serde(rename = "std")]
    Std,
    #[serde(rename = "count unique")]
    CountUnique,
}

impl Aggregation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
            Self::Std => "std",
            Self::CountUnique => "count unique",
        }
    }

    pub fn accepts(&self, dtype: ColumnType) -> bool {
        match self {
            Self::Sum | Self::Mean | Self::Median | Self::Std => dtype.is_numeric(),
            Self::Min | Self::Max => dtype.is_numeric() || dtype == ColumnType::Text,
            Self::Count | Self::CountUnique => true,
        }
    }
}

/// Group-by keys and the aggregations to run on each value column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotSpec {
    pub rows: Vec<ColumnHeader>,
    pub values: Vec<(ColumnHeader, Vec<Aggregation>)>,
}

impl PivotSpec {
    /// Nothing to group by or nothing to aggregate; the result is an empty table.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.values.iter().all(|(_, aggs)| aggs.is_empty())
    }

    /// Header of the output column for `header` aggregated with `agg`.
    pub fn output_header(header: &ColumnHeader, agg: Aggregation) -> ColumnHeader {
        ColumnHeader::text(format!("{} {}", header.flatten(), agg.name()))
    }
}

fn value_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Boolean(_) => 0,
        CellValue::Integer(_) | CellValue::Float(_) => 1,
        CellValue::Text(_) => 2,
        CellValue::Null => 3,
    }
}

fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Boolean(x), CellValue::Boolean(y)) => x.cmp(y),
        (CellValue::Text(x), CellValue::Text(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => value_rank(a).cmp(&value_rank(b)),
        },
    }
}

fn compare_keys(a: &[CellValue], b: &[CellValue]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_values(x, y))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Running numeric summary of one group, using Welford's update for variance.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    int_sum: i64,
    mean: f64,
    m2: f64,
    numbers: Vec<f64>,
}

impl Accumulator {
    fn update(&mut self, value: &CellValue) {
        let Some(x) = value.as_f64() else {
            return;
        };
        if let CellValue::Integer(n) = value {
            self.int_sum = self.int_sum.wrapping_add(*n);
        }
        self.count += 1;
        self.sum += x;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.numbers.push(x);
    }

    fn median(&mut self) -> Option<f64> {
        if self.numbers.is_empty() {
            return None;
        }
        self.numbers.sort_by(f64::total_cmp);
        let mid = self.numbers.len() / 2;
        Some(match self.numbers.len() % 2 {
            0 => (self.numbers[mid - 1] + self.numbers[mid]) / 2.0,
            _ => self.numbers[mid],
        })
    }
}

fn extreme<'a>(values: impl Iterator<Item = &'a CellValue>, want: Ordering) -> CellValue {
    values
        .filter(|value| !value.is_missing())
        .fold(None::<&CellValue>, |best, value| match best {
            Some(best) if compare_values(value, best) != want => Some(best),
            _ => Some(value),
        })
        .cloned()
        .unwrap_or(CellValue::Null)
}

fn aggregate(column: &Column, rows: &[usize], agg: Aggregation) -> CellValue {
    let values = || rows.iter().map(|&row| &column.values()[row]);
    let float_or_null = |x: Option<f64>| x.map(CellValue::Float).unwrap_or(CellValue::Null);
    match agg {
        Aggregation::Count => CellValue::Integer(values().filter(|v| !v.is_missing()).count() as i64),
        Aggregation::CountUnique => {
            let mut seen: Vec<&CellValue> = Vec::new();
            for value in values().filter(|v| !v.is_missing()) {
                if !seen.contains(&value) {
                    seen.push(value);
                }
            }
            CellValue::Integer(seen.len() as i64)
        }
        Aggregation::Min => extreme(values(), Ordering::Less),
        Aggregation::Max => extreme(values(), Ordering::Greater),
        Aggregation::Sum | Aggregation::Mean | Aggregation::Median | Aggregation::Std => {
            let mut acc = Accumulator::default();
            values().for_each(|value| acc.update(value));
            match agg {
                Aggregation::Sum if column.dtype() == ColumnType::Integer => CellValue::Integer(acc.int_sum),
                Aggregation::Sum => CellValue::Float(acc.sum),
                Aggregation::Mean => float_or_null((acc.count > 0).then(|| acc.sum / acc.count as f64)),
                Aggregation::Std => float_or_null((acc.count > 1).then(|| (acc.m2 / (acc.count as f64 - 1.0)).sqrt())),
                _ => float_or_null(acc.median()),
            }
        }
    }
}

/// Group `source` by the `rows` columns and aggregate each value column.
///
/// Groups come out sorted by key and rows with a missing key are dropped.
/// Output columns are the keys followed by one `"{column} {aggregation}"`
/// column per requested aggregation, in request order.
pub fn pivot_table(source: &Table, spec: &PivotSpec) -> Result<Table, CoreError> {
    if spec.is_empty() {
        return Ok(Table::empty());
    }
    let keys = spec
        .rows
        .iter()
        .map(|header| source.column(header))
        .collect::<Result<Vec<_>, _>>()?;
    for (header, aggs) in &spec.values {
        if spec.rows.contains(header) {
            return Err(CoreError::InvalidData(format!("{header} is both a pivot row and a value")));
        }
        let column = source.column(header)?;
        if let Some(agg) = aggs.iter().find(|agg| !agg.accepts(column.dtype())) {
            return Err(CoreError::InvalidData(format!(
                "cannot take the {} of {header}, a column of type {}",
                agg.name(),
                column.dtype().name()
            )));
        }
    }

    let key_of = |row: usize| -> Vec<CellValue> { keys.iter().map(|c| c.values()[row].clone()).collect() };
    let mut order: Vec<usize> = (0..source.num_rows())
        .filter(|&row| keys.iter().all(|c| !c.values()[row].is_missing()))
        .collect();
    order.sort_by(|&a, &b| compare_keys(&key_of(a), &key_of(b)));

    let mut groups: Vec<(Vec<CellValue>, Vec<usize>)> = Vec::new();
    for row in order {
        let key = key_of(row);
        match groups.last_mut() {
            Some((last, rows)) if compare_keys(last, &key).is_eq() => rows.push(row),
            _ => groups.push((key, vec![row])),
        }
    }

    let mut columns: Vec<(ColumnHeader, Vec<CellValue>)> = spec
        .rows
        .iter()
        .enumerate()
        .map(|(i, header)| (header.clone(), groups.iter().map(|(key, _)| key[i].clone()).collect()))
        .collect();
    for (header, aggs) in &spec.values {
        let column = source.column(header)?;
        for agg in aggs {
            let values = groups.iter().map(|(_, rows)| aggregate(column, rows, *agg)).collect();
            columns.push((PivotSpec::output_header(header, *agg), values));
        }
    }
    Table::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Table {
        Table::new(vec![
            (
                "region".into(),
                vec![
                    CellValue::text("west"),
                    CellValue::text("east"),
                    CellValue::text("west"),
                    CellValue::Null,
                ],
            ),
            (
                "units".into(),
                vec![CellValue::Integer(3), CellValue::Integer(4), CellValue::Integer(5), CellValue::Integer(9)],
            ),
            (
                "rep".into(),
                vec![CellValue::text("b"), CellValue::text("a"), CellValue::text("a"), CellValue::text("c")],
            ),
        ])
        .unwrap()
    }

    fn spec(values: Vec<(&str, Vec<Aggregation>)>) -> PivotSpec {
        PivotSpec {
            rows: vec!["region".into()],
            values: values.into_iter().map(|(h, aggs)| (h.into(), aggs)).collect(),
        }
    }

    #[test]
    fn groups_sorted_and_missing_keys_dropped() {
        let out = pivot_table(&sales(), &spec(vec![("units", vec![Aggregation::Sum, Aggregation::Mean])])).unwrap();
        assert_eq!(
            out.headers(),
            vec![ColumnHeader::text("region"), "units sum".into(), "units mean".into()]
        );
        assert_eq!(out.columns()[0].values(), &[CellValue::text("east"), CellValue::text("west")]);
        assert_eq!(out.columns()[1].values(), &[CellValue::Integer(4), CellValue::Integer(8)]);
        assert_eq!(out.columns()[2].values(), &[CellValue::Float(4.0), CellValue::Float(4.0)]);
    }

    #[test]
    fn text_columns_take_counts_and_extremes() {
        let out = pivot_table(
            &sales(),
            &spec(vec![("rep", vec![Aggregation::CountUnique, Aggregation::Min, Aggregation::Std])]),
        );
        assert!(matches!(out, Err(CoreError::InvalidData(_))));

        let out = pivot_table(&sales(), &spec(vec![("rep", vec![Aggregation::CountUnique, Aggregation::Min])])).unwrap();
        assert_eq!(out.columns()[1].values(), &[CellValue::Integer(1), CellValue::Integer(2)]);
        assert_eq!(out.columns()[2].values(), &[CellValue::text("a"), CellValue::text("a")]);
    }

    #[test]
    fn single_value_groups_have_no_spread() {
        let out = pivot_table(&sales(), &spec(vec![("units", vec![Aggregation::Std, Aggregation::Median])])).unwrap();
        assert_eq!(out.columns()[1].values()[0], CellValue::Null);
        assert_eq!(out.columns()[1].dtype(), ColumnType::Float);
        assert_eq!(out.columns()[2].values(), &[CellValue::Float(4.0), CellValue::Float(4.0)]);
    }

    #[test]
    fn empty_spec_gives_empty_table() {
        let out = pivot_table(&sales(), &PivotSpec::default()).unwrap();
        assert_eq!(out.num_columns(), 0);
        assert!(pivot_table(&sales(), &spec(vec![("region", vec![Aggregation::Count])])).is_err());
    }
}
