//! Value operations applied to output columns.

use serde::{Deserialize, Serialize};

/// A text operation on a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Remove every occurrence of a character.
    ///
    /// Textual, not numeric: `-150.00` becomes `150.00` and `1-50` becomes
    /// `150`, keeping the source punctuation.
    StripChar { char: char },

    /// Replace a whole value (compared after trimming) with another.
    MapValue { from: String, to: String },

    /// Remove leading and trailing whitespace
    Trim,
}

impl Operation {
    /// Apply this operation to a value
    pub fn apply(&self, value: &str) -> String {
        match self {
            Operation::StripChar { char } => value.replace(*char, ""),
            Operation::MapValue { from, to } => {
                if value.trim() == from {
                    to.clone()
                } else {
                    value.to_string()
                }
            }
            Operation::Trim => value.trim().to_string(),
        }
    }

    /// Apply a chain of operations in order.
    pub fn apply_all(operations: &[Operation], value: &str) -> String {
        operations
            .iter()
            .fold(value.to_string(), |acc, op| op.apply(&acc))
    }
}

/// Short human-readable description of every operation.
pub fn operations_description() -> String {
    [
        "strip_char { char }     remove every occurrence of a character",
        "map_value { from, to }  replace a value equal to `from` (trimmed) with `to`",
        "trim                    remove surrounding whitespace",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minus() -> Operation {
        Operation::StripChar { char: '-' }
    }

    fn remap() -> Operation {
        Operation::MapValue {
            from: "81".into(),
            to: "83".into(),
        }
    }

    #[test]
    fn test_strip_char_is_textual() {
        assert_eq!(minus().apply("-150.00"), "150.00");
        assert_eq!(minus().apply("1-50"), "150");
        assert_eq!(minus().apply("-1.234,56"), "1.234,56");
        assert_eq!(minus().apply(""), "");
    }

    #[test]
    fn test_strip_char_is_idempotent() {
        for v in ["-1210,00", "1210,00", "--5-", "abc"] {
            let once = minus().apply(v);
            assert_eq!(minus().apply(&once), once);
        }
    }

    #[test]
    fn test_map_value_only_touches_exact_match() {
        assert_eq!(remap().apply("81"), "83");
        assert_eq!(remap().apply(" 81 "), "83");
        assert_eq!(remap().apply("1"), "1");
        assert_eq!(remap().apply("811"), "811");
        assert_eq!(remap().apply("83"), "83");
        assert_eq!(remap().apply("8"), "8");
    }

    #[test]
    fn test_apply_all_in_order() {
        let ops = vec![Operation::Trim, minus()];
        assert_eq!(Operation::apply_all(&ops, " -10 "), "10");
    }

    #[test]
    fn test_operation_json_tags() {
        let json = serde_json::to_string(&remap()).unwrap();
        assert_eq!(json, r#"{"type":"map_value","from":"81","to":"83"}"#);
        let parsed: Operation = serde_json::from_str(r#"{"type":"strip_char","char":"-"}"#).unwrap();
        assert_eq!(parsed, minus());
    }
}
