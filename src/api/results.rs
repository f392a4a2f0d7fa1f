//! Transformation results and reporting structures.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rewrite::RewriteStats;

/// Outcome of transforming one compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResult {
    /// Whether at least one single-parameter procedure was present
    pub found_any: bool,

    /// Number of procedures transformed
    pub changes_count: usize,

    /// Rendered source after all edits
    pub transformed_text: String,

    /// Run counters
    pub statistics: RewriteStatistics,
}

/// Counters and timing collected while rewriting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteStatistics {
    /// Procedures visited, whatever their arity
    pub procedures_seen: usize,

    /// Transformed procedures whose first usage was duplicated
    pub usages_duplicated: usize,

    /// Wall time spent parsing, analysing and rendering
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl RewriteResult {
    /// Assemble a result from rewrite counters and the rendered text.
    pub fn from_stats(stats: RewriteStats, transformed_text: String, elapsed: Duration) -> Self {
        Self {
            found_any: stats.found_any,
            changes_count: stats.changes_count,
            transformed_text,
            statistics: RewriteStatistics {
                procedures_seen: stats.procedures_seen,
                usages_duplicated: stats.usages_duplicated,
                elapsed,
            },
        }
    }

    /// Line reported to the user once the output has been written to `output`.
    pub fn summary_message(&self, output: &Path) -> String {
        if self.found_any {
            format!(
                "Processed file. Methods changed: {}. Output written to: {}",
                self.changes_count,
                output.display()
            )
        } else {
            "No method declarations with a single parameter were found. No changes made."
                .to_string()
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
