use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b).is_eq(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CellValue {}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Null and NaN both count as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(x) => x.is_nan(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(x) if !x.is_nan() => Some(*x),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Cast user-entered text into a value for a column of `dtype`.
    ///
    /// Empty text becomes null. A decimal entered into an integer column is
    /// kept as a float; the caller is responsible for widening the column.
    pub fn parse_for(dtype: ColumnType, raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::Null);
        }
        let cast_error = || CoreError::InvalidData(format!("cannot cast {raw:?} to {}", dtype.name()));
        match dtype {
            ColumnType::Integer if trimmed.contains('.') => {
                trimmed.parse::<f64>().map(Self::Float).map_err(|_| cast_error())
            }
            ColumnType::Integer => trimmed.parse::<i64>().map(Self::Integer).map_err(|_| cast_error()),
            ColumnType::Float => trimmed.parse::<f64>().map(Self::Float).map_err(|_| cast_error()),
            ColumnType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Self::Boolean(true)),
                "false" | "0" => Ok(Self::Boolean(false)),
                _ => Err(cast_error()),
            },
            ColumnType::Text | ColumnType::Mixed => Ok(Self::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NaN"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// The storage type of a column, inferred from its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    Mixed,
}

impl ColumnType {
    /// Missing values do not decide the type, except that integers with a
    /// gap can only be held as floats.
    pub fn infer(values: &[CellValue]) -> Self {
        let mut seen: Option<ColumnType> = None;
        let mut has_null = false;
        for value in values {
            let kind = match value {
                CellValue::Null => {
                    has_null = true;
                    continue;
                }
                CellValue::Boolean(_) => ColumnType::Boolean,
                CellValue::Integer(_) => ColumnType::Integer,
                CellValue::Float(_) => ColumnType::Float,
                CellValue::Text(_) => ColumnType::Text,
            };
            seen = Some(match (seen, kind) {
                (None, kind) => kind,
                (Some(prev), kind) if prev == kind => kind,
                (Some(ColumnType::Integer), ColumnType::Float)
                | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
                _ => return ColumnType::Mixed,
            });
        }
        match seen {
            Some(ColumnType::Integer) if has_null => ColumnType::Float,
            Some(kind) => kind,
            None => ColumnType::Mixed,
        }
    }

    /// The dtype name reported to the frontend and used in generated code.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "int64",
            ColumnType::Float => "float64",
            ColumnType::Boolean => "bool",
            ColumnType::Text | ColumnType::Mixed => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}
