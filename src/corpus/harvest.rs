//! Parallel extraction of parameter contexts from a source tree.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{batch_file_name, ContextRecord};
use crate::core::config::HarvestConfig;
use crate::core::errors::{ParamdupError, Result};
use crate::core::file_utils::{discover_source_files, FileReader};
use crate::lang::registry::registered_languages;
use crate::lang::{CSharpAdapter, ParsedSource};
use crate::naming::format_context;
use crate::rewrite::context_builder::UNRESOLVED_TYPE;
use crate::semantic::canonical_type_name;

/// What a harvest run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestSummary {
    /// Source files found under the root
    pub files_discovered: usize,
    /// Files that yielded records (possibly none)
    pub files_processed: usize,
    /// Empty or unreadable files
    pub files_skipped: usize,
    /// Records written across all batches
    pub records: usize,
    /// Batch files written, in order
    pub batch_files: Vec<PathBuf>,
}

/// Harvest every `*.cs` file under `root` into batch files in
/// `config.output_dir`. Files are processed on the rayon pool; record order
/// across files is unspecified.
pub fn harvest(root: &Path, config: &HarvestConfig) -> Result<HarvestSummary> {
    config.validate()?;

    let extensions: Vec<&str> = registered_languages()
        .iter()
        .flat_map(|language| language.extensions.iter().copied())
        .collect();
    let files = discover_source_files(root, &extensions, &config.exclude_patterns)?;
    info!("Scanning {} files under {}", files.len(), root.display());

    let outcomes: Vec<Option<Vec<ContextRecord>>> = files
        .par_iter()
        .map_init(CSharpAdapter::new, |adapter, path| {
            let result = adapter
                .as_mut()
                .map_err(|e| ParamdupError::internal(format!("Parser unavailable: {}", e)))
                .and_then(|adapter| harvest_file(adapter, path, config.min_name_length));
            match result {
                Ok(records) => records,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            }
        })
        .collect();

    let mut summary = HarvestSummary {
        files_discovered: files.len(),
        ..HarvestSummary::default()
    };
    let mut records = Vec::new();
    for outcome in outcomes {
        match outcome {
            Some(file_records) => {
                summary.files_processed += 1;
                records.extend(file_records);
            }
            None => summary.files_skipped += 1,
        }
    }

    summary.records = records.len();
    summary.batch_files = write_batches(&records, &config.output_dir, config.batch_size)?;
    info!(
        "Extracted {} parameter contexts to {} batch file(s) in {}",
        summary.records,
        summary.batch_files.len(),
        config.output_dir.display()
    );
    Ok(summary)
}

/// Records for one file; `None` when the file is blank.
fn harvest_file(
    adapter: &mut CSharpAdapter,
    path: &Path,
    min_name_length: usize,
) -> Result<Option<Vec<ContextRecord>>> {
    let source = FileReader::read_to_string(path)?;
    if source.trim().is_empty() {
        debug!("Empty file: {}", path.display());
        return Ok(None);
    }

    let parsed = adapter.parse_source(source)?;
    Ok(Some(extract_records(&parsed, min_name_length)))
}

/// One record per parameter of every method (local functions excluded).
pub fn extract_records(parsed: &ParsedSource, min_name_length: usize) -> Vec<ContextRecord> {
    let mut records = Vec::new();

    for procedure in parsed.procedures(false) {
        for parameter in procedure.parameters() {
            let name = parameter.name();
            if name.starts_with('_') || name.chars().count() < min_name_length {
                continue;
            }

            let param_type = parameter
                .type_node()
                .and_then(|node| canonical_type_name(procedure.text(node)))
                .unwrap_or_else(|| UNRESOLVED_TYPE.to_string());

            records.push(ContextRecord {
                context: format_context(procedure.documentation(), &param_type, procedure.name()),
                param_type,
                param_name: name.to_string(),
            });
        }
    }

    records
}

fn write_batches(records: &[ContextRecord], dir: &Path, batch_size: usize) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (n, batch) in records.chunks(batch_size.max(1)).enumerate() {
        let path = dir.join(batch_file_name(n));
        FileReader::write(&path, &serde_json::to_string_pretty(batch)?)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn records_for(source: &str) -> Vec<ContextRecord> {
        let parsed = CSharpAdapter::new().unwrap().parse_source(source).unwrap();
        extract_records(&parsed, 2)
    }

    #[test]
    fn records_every_parameter_with_shared_context() {
        let records = records_for(
            r#"
class Store {
    /// <summary>Saves an order.</summary>
    void Save(Order order, System.Int32 retries, int _hidden, int x) { }
}"#,
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].param_name, "order");
        assert_eq!(records[0].param_type, "Order");
        assert_eq!(
            records[0].context,
            "Method description: Saves an order.\nType: Order in method Save"
        );
        assert_eq!(records[1].param_name, "retries");
        assert_eq!(records[1].param_type, "int");
    }

    #[test]
    fn local_functions_are_not_harvested() {
        let records = records_for("class A { void Run() { int Inner(int count) => count; } }");
        assert!(records.is_empty());
    }

    #[test]
    fn harvest_writes_batches_and_skips_excluded_and_empty() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("repo");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("obj")).unwrap();
        std::fs::write(
            root.join("src/A.cs"),
            "class A { void Greet(string name) { } void Add(int left, int right) { } }",
        )
        .unwrap();
        std::fs::write(root.join("src/Empty.cs"), "  \n").unwrap();
        std::fs::write(root.join("obj/Gen.cs"), "class G { void Gen(int generated) { } }").unwrap();
        std::fs::write(root.join("src/notes.txt"), "void Nope(int ignored)").unwrap();

        let config = HarvestConfig {
            batch_size: 2,
            output_dir: temp.path().join("contexts"),
            ..HarvestConfig::default()
        };
        let summary = harvest(&root, &config).unwrap();

        assert_eq!(summary.files_discovered, 2);
        assert_eq!(summary.files_processed, 1);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.records, 3);
        assert_eq!(summary.batch_files.len(), 2);

        let first: Vec<ContextRecord> =
            serde_json::from_str(&std::fs::read_to_string(&summary.batch_files[0]).unwrap())
                .unwrap();
        assert_eq!(first.len(), 2);
        assert!(summary.batch_files[1].ends_with("contexts_1.json"));
    }

    #[test]
    fn missing_root_is_input_not_found() {
        let temp = TempDir::new().unwrap();
        let err = harvest(&temp.path().join("absent"), &HarvestConfig::default()).unwrap_err();
        assert!(matches!(err, ParamdupError::InputNotFound { .. }));
    }
}
