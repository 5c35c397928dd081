use serde::{Deserialize, Serialize};

use crate::value::{CellValue, ColumnType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Every condition must match.
    #[default]
    And,
    /// Any condition may match.
    Or,
}

/// One condition applied to the cells of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", content = "value", rename_all = "snake_case")]
pub enum FilterCondition {
    Greater(f64),
    GreaterThanOrEqual(f64),
    Less(f64),
    LessThanOrEqual(f64),
    NumberExactly(f64),
    NumberNotExactly(f64),
    Contains(String),
    StringDoesNotContain(String),
    StringExactly(String),
    StringNotExactly(String),
    StartsWith(String),
    EndsWith(String),
    BooleanIsTrue,
    BooleanIsFalse,
    Empty,
    NotEmpty,
}

impl FilterCondition {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Greater(_) => "greater",
            Self::GreaterThanOrEqual(_) => "greater_than_or_equal",
            Self::Less(_) => "less",
            Self::LessThanOrEqual(_) => "less_than_or_equal",
            Self::NumberExactly(_) => "number_exactly",
            Self::NumberNotExactly(_) => "number_not_exactly",
            Self::Contains(_) => "contains",
            Self::StringDoesNotContain(_) => "string_does_not_contain",
            Self::StringExactly(_) => "string_exactly",
            Self::StringNotExactly(_) => "string_not_exactly",
            Self::StartsWith(_) => "starts_with",
            Self::EndsWith(_) => "ends_with",
            Self::BooleanIsTrue => "boolean_is_true",
            Self::BooleanIsFalse => "boolean_is_false",
            Self::Empty => "empty",
            Self::NotEmpty => "not_empty",
        }
    }

    /// Whether this condition makes sense for a column of `dtype`.
    pub fn applies_to(&self, dtype: ColumnType) -> bool {
        match self {
            Self::Greater(_)
            | Self::GreaterThanOrEqual(_)
            | Self::Less(_)
            | Self::LessThanOrEqual(_)
            | Self::NumberExactly(_)
            | Self::NumberNotExactly(_) => dtype.is_numeric(),
            Self::Contains(_)
            | Self::StringDoesNotContain(_)
            | Self::StringExactly(_)
            | Self::StringNotExactly(_)
            | Self::StartsWith(_)
            | Self::EndsWith(_) => matches!(dtype, ColumnType::Text | ColumnType::Mixed),
            Self::BooleanIsTrue | Self::BooleanIsFalse => dtype == ColumnType::Boolean,
            Self::Empty | Self::NotEmpty => true,
        }
    }

    /// Missing values never satisfy comparisons, mirroring dataframe semantics.
    pub fn matches(&self, value: &CellValue) -> bool {
        match self {
            Self::Greater(v) => value.as_f64().is_some_and(|x| x > *v),
            Self::GreaterThanOrEqual(v) => value.as_f64().is_some_and(|x| x >= *v),
            Self::Less(v) => value.as_f64().is_some_and(|x| x < *v),
            Self::LessThanOrEqual(v) => value.as_f64().is_some_and(|x| x <= *v),
            Self::NumberExactly(v) => value.as_f64().is_some_and(|x| x == *v),
            Self::NumberNotExactly(v) => value.as_f64().is_none_or(|x| x != *v),
            Self::Contains(s) => value.as_text().is_some_and(|t| t.contains(s.as_str())),
            Self::StringDoesNotContain(s) => {
                !value.as_text().is_some_and(|t| t.contains(s.as_str()))
            }
            Self::StringExactly(s) => value.as_text().is_some_and(|t| t == s),
            Self::StringNotExactly(s) => value.as_text().is_none_or(|t| t != s),
            Self::StartsWith(s) => value.as_text().is_some_and(|t| t.starts_with(s.as_str())),
            Self::EndsWith(s) => value.as_text().is_some_and(|t| t.ends_with(s.as_str())),
            Self::BooleanIsTrue => value.as_boolean() == Some(true),
            Self::BooleanIsFalse => value.as_boolean() == Some(false),
            Self::Empty => value.is_missing(),
            Self::NotEmpty => !value.is_missing(),
        }
    }
}

/// The filter attached to a single column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    pub operator: FilterOperator,
    pub filters: Vec<FilterCondition>,
}

impl FilterSpec {
    pub fn new(operator: FilterOperator, filters: Vec<FilterCondition>) -> Self {
        Self { operator, filters }
    }

    /// An unrestricted filter keeps every row.
    pub fn is_unrestricted(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn matches(&self, value: &CellValue) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        match self.operator {
            FilterOperator::And => self.filters.iter().all(|f| f.matches(value)),
            FilterOperator::Or => self.filters.iter().any(|f| f.matches(value)),
        }
    }

    pub fn mask(&self, values: &[CellValue]) -> Vec<bool> {
        values.iter().map(|v| self.matches(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spec_is_unrestricted() {
        let spec = FilterSpec::default();
        assert!(spec.is_unrestricted());
        assert!(spec.matches(&CellValue::Null));
    }

    #[test]
    fn and_or_combinators() {
        let values = vec![CellValue::Integer(1), CellValue::Integer(5), CellValue::Integer(9)];
        let and = FilterSpec::new(
            FilterOperator::And,
            vec![FilterCondition::Greater(2.0), FilterCondition::Less(8.0)],
        );
        assert_eq!(and.mask(&values), vec![false, true, false]);

        let or = FilterSpec::new(
            FilterOperator::Or,
            vec![FilterCondition::Less(2.0), FilterCondition::Greater(8.0)],
        );
        assert_eq!(or.mask(&values), vec![true, false, true]);
    }

    #[test]
    fn missing_values_fail_comparisons() {
        assert!(!FilterCondition::Greater(0.0).matches(&CellValue::Null));
        assert!(FilterCondition::NumberNotExactly(0.0).matches(&CellValue::Null));
        assert!(FilterCondition::Empty.matches(&CellValue::Float(f64::NAN)));
        assert!(!FilterCondition::Contains("a".into()).matches(&CellValue::Null));
    }

    #[test]
    fn wire_shape() {
        let spec: FilterSpec = serde_json::from_str(
            r#"{"operator": "Or", "filters": [{"condition": "contains", "value": "ab"}, {"condition": "empty"}]}"#,
        )
        .unwrap();
        assert_eq!(spec.operator, FilterOperator::Or);
        assert_eq!(
            spec.filters,
            vec![FilterCondition::Contains("ab".into()), FilterCondition::Empty]
        );
    }
}
