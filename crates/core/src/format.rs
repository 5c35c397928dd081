use serde::{Deserialize, Serialize};

/// Display formatting for a column. Formatting never changes cell values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FormatType {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "plain text")]
    PlainText,
    #[serde(rename = "percentage")]
    Percentage,
    #[serde(rename = "accounting")]
    Accounting,
    #[serde(rename = "currency")]
    Currency,
    #[serde(rename = "round decimals")]
    RoundDecimals {
        #[serde(rename = "numDecimals")]
        num_decimals: u32,
    },
    #[serde(rename = "k_m_b")]
    AbbreviatedKmb,
    #[serde(rename = "scientific notation")]
    ScientificNotation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_wire_shape() {
        let json = serde_json::to_string(&FormatType::RoundDecimals { num_decimals: 2 }).unwrap();
        assert_eq!(json, r#"{"type":"round decimals","numDecimals":2}"#);
        let parsed: FormatType = serde_json::from_str(r#"{"type": "k_m_b"}"#).unwrap();
        assert_eq!(parsed, FormatType::AbbreviatedKmb);
    }
}
