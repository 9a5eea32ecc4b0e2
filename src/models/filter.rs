// src/models/filter.rs

//! Filter dimensions offered for a category bucket.

use serde::{Deserialize, Serialize};

/// One selectable filter dimension (`{key, name, value:[{n, v}]}`).
///
/// Field order and option order are reproduced verbatim when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDimension {
    /// Template placeholder the chosen value is substituted into
    pub key: String,

    /// Display name of the dimension
    pub name: String,

    #[serde(rename = "value")]
    pub options: Vec<FilterOption>,
}

/// A (display label, filter value) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    #[serde(rename = "n")]
    pub label: String,

    #[serde(rename = "v")]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &str = r#"[{"key":"by","name":"排序","value":[{"n":"时间","v":"time"},{"n":"人气","v":"hits"},{"n":"评分","v":"score"}]}]"#;

    #[test]
    fn test_reserializes_to_same_shape() {
        let dims: Vec<FilterDimension> = serde_json::from_str(BUCKET).unwrap();
        assert_eq!(dims[0].options.len(), 3);
        assert_eq!(dims[0].options[1].label, "人气");
        assert_eq!(serde_json::to_string(&dims).unwrap(), BUCKET);
    }
}
