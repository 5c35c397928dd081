use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A column header as the user sees it.
///
/// Headers are not restricted to strings: imported data may carry numeric or
/// boolean headers, and pivoted data carries multi-part (hierarchical) headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnHeader {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    MultiPart(Vec<ColumnHeader>),
}

impl PartialEq for ColumnHeader {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b).is_eq(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::MultiPart(a), Self::MultiPart(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ColumnHeader {}

impl Hash for ColumnHeader {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Boolean(b) => b.hash(state),
            Self::Integer(n) => n.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::MultiPart(parts) => parts.hash(state),
        }
    }
}

impl ColumnHeader {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_multi_part(&self) -> bool {
        matches!(self, Self::MultiPart(_))
    }

    /// Flatten the header into plain text, joining multi-part headers with `_`.
    pub fn flatten(&self) -> String {
        match self {
            Self::MultiPart(parts) => parts
                .iter()
                .map(ColumnHeader::flatten)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join("_"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ColumnHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::MultiPart(parts) => {
                f.write_str("(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<&str> for ColumnHeader {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ColumnHeader {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ColumnHeader {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}
