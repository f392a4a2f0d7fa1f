//! Building the parameter-name corpus used by similarity-based naming.
//!
//! [`harvest`] scans a tree of C# files and writes one [`ContextRecord`] per
//! method parameter into numbered batch files. [`populate`] embeds those
//! records and upserts them into a [`crate::naming::SimilarityIndex`].

pub mod harvest;
pub mod populate;

use serde::{Deserialize, Serialize};

pub use harvest::{harvest, HarvestSummary};
pub use populate::{populate, PopulateSummary};

/// One harvested parameter with the context it was declared in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRecord {
    /// Text in the shared context format, see [`crate::naming::format_context`]
    #[serde(alias = "transformerContext")]
    pub context: String,
    /// Canonical parameter type
    pub param_type: String,
    /// Declared parameter name
    pub param_name: String,
}

/// File name of the `n`th batch
pub fn batch_file_name(n: usize) -> String {
    format!("contexts_{}.json", n)
}

/// Batch number encoded in a file name produced by [`batch_file_name`]
pub fn batch_number(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix("contexts_")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_names_round_trip() {
        assert_eq!(batch_file_name(3), "contexts_3.json");
        assert_eq!(batch_number("contexts_12.json"), Some(12));
        assert_eq!(batch_number("contexts_x.json"), None);
        assert_eq!(batch_number("index.json"), None);
    }

    #[test]
    fn record_uses_corpus_field_names() {
        let record = ContextRecord {
            context: "Method description: \nType: int in method Run".to_string(),
            param_type: "int".to_string(),
            param_name: "count".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["context"], record.context.as_str());
        assert_eq!(json["paramType"], "int");
        assert_eq!(json["paramName"], "count");

        let aliased: ContextRecord = serde_json::from_str(
            r#"{"transformerContext": "c", "paramType": "string", "paramName": "name"}"#,
        )
        .unwrap();
        assert_eq!(aliased.context, "c");
    }
}
