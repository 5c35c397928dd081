//! Naming rules for generated variables and legacy column ids.

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Append `_1`, `_2`, ... until the name is not taken.
pub fn first_unused_name(existing: &[String], proposed: &str) -> String {
    if !existing.iter().any(|name| name == proposed) {
        return proposed.to_string();
    }
    (1..)
        .map(|i| format!("{proposed}_{i}"))
        .find(|candidate| !existing.iter().any(|name| name == candidate))
        .unwrap_or_else(|| proposed.to_string())
}

/// Turn arbitrary text (often a file name) into an unused variable name.
pub fn valid_dataframe_name(existing: &[String], original: &str) -> String {
    let words: Vec<&str> = original
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty() && *word != "csv" && *word != "xlsx")
        .collect();
    let mut name = words.join("_");
    if name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || PYTHON_KEYWORDS.contains(&name.as_str())
    {
        name = format!("df_{name}");
    }
    first_unused_name(existing, &name)
}

pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !PYTHON_KEYWORDS.contains(&name)
}

/// The deprecated column id algorithm: the header text made into an identifier.
///
/// Whitespace becomes `_`, other non-identifier characters are dropped, and an
/// id that would be empty or start with a digit gets a `c` prefix.
pub fn legacy_column_id(header_text: &str) -> String {
    let mut id: String = header_text
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    if id.is_empty() || id.starts_with(|c: char| c.is_ascii_digit()) {
        id.insert(0, 'c');
    }
    id
}
