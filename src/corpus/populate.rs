//! Loading harvested batches into a similarity index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use super::{batch_number, ContextRecord};
use crate::core::errors::{ParamdupError, Result, ResultExt};
use crate::core::file_utils::FileReader;
use crate::naming::index::{IndexRecord, RecordMetadata};
use crate::naming::{Embedder, SimilarityIndex};

/// What a populate run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulateSummary {
    /// Batch files read successfully
    pub files_read: usize,
    /// Batch files that could not be read or decoded
    pub files_skipped: usize,
    /// Records accepted by the index
    pub records_upserted: usize,
}

/// Embed every record in the batch files of `dir` and upsert them, `batch_size`
/// records per embedding call and index request.
pub async fn populate(
    dir: &Path,
    embedder: Arc<dyn Embedder>,
    index: &dyn SimilarityIndex,
    batch_size: usize,
) -> Result<PopulateSummary> {
    let files = batch_files(dir)?;
    info!(
        "Populating {} index from {} batch file(s) in {}",
        index.name(),
        files.len(),
        dir.display()
    );

    let mut summary = PopulateSummary::default();
    for path in files {
        let records = match read_batch(&path) {
            Ok(records) => records,
            Err(e) => {
                warn!("Skipping batch {}: {}", path.display(), e);
                summary.files_skipped += 1;
                continue;
            }
        };
        summary.files_read += 1;

        for chunk in records.chunks(batch_size.max(1)) {
            let texts: Vec<String> = chunk.iter().map(|record| record.context.clone()).collect();
            let embedder = Arc::clone(&embedder);
            let vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
                .await
                .map_err(|e| ParamdupError::internal(format!("Embedding task failed: {}", e)))??;

            let upserts: Vec<IndexRecord> = chunk
                .iter()
                .zip(vectors)
                .map(|(record, values)| IndexRecord {
                    id: record_id(record),
                    values,
                    metadata: RecordMetadata {
                        param_type: record.param_type.clone(),
                        param_name: record.param_name.clone(),
                    },
                })
                .collect();

            summary.records_upserted += index.upsert(&upserts).await?;
        }
        debug!("Upserted batch {}", path.display());
    }
    index.flush().await?;

    info!(
        "Upserted {} records ({} batch file(s) skipped)",
        summary.records_upserted, summary.files_skipped
    );
    Ok(summary)
}

/// Stable identifier of a record: xxh3 of its context and name.
pub fn record_id(record: &ContextRecord) -> String {
    let mut key = String::with_capacity(record.context.len() + record.param_name.len() + 1);
    key.push_str(&record.context);
    key.push('\n');
    key.push_str(&record.param_name);
    format!("{:016x}", xxh3_64(key.as_bytes()))
}

/// `contexts_<n>.json` files in `dir`, ordered by batch number.
fn batch_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ParamdupError::input_not_found(dir));
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| ParamdupError::io(format!("Failed to list {}", dir.display()), e))?;

    let mut numbered: Vec<(usize, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let n = batch_number(path.file_name()?.to_str()?)?;
            Some((n, path))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

fn read_batch(path: &Path) -> Result<Vec<ContextRecord>> {
    let content = FileReader::read_to_string(path)?;
    serde_json::from_str::<Vec<ContextRecord>>(&content)
        .with_context(|| format!("Invalid batch file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::InMemoryIndex;
    use tempfile::TempDir;

    struct LengthEmbedder;

    impl Embedder for LengthEmbedder {
        fn dimension(&self) -> usize {
            2
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![1.0, t.len() as f32]).collect())
        }
    }

    fn record(name: &str, ty: &str) -> ContextRecord {
        ContextRecord {
            context: format!("Method description: \nType: {} in method Run", ty),
            param_type: ty.to_string(),
            param_name: name.to_string(),
        }
    }

    #[test]
    fn record_ids_are_stable_and_distinct() {
        let a = record("count", "int");
        assert_eq!(record_id(&a), record_id(&a.clone()));
        assert_ne!(record_id(&a), record_id(&record("total", "int")));
        assert_eq!(record_id(&a).len(), 16);
    }

    #[tokio::test]
    async fn upserts_all_readable_batches() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        std::fs::write(
            dir.join("contexts_0.json"),
            serde_json::to_string(&vec![record("count", "int"), record("name", "string")]).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join("contexts_1.json"),
            serde_json::to_string(&vec![record("total", "int")]).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.join("contexts_2.json"), "not json").unwrap();
        std::fs::write(dir.join("readme.md"), "ignored").unwrap();

        let index = InMemoryIndex::new();
        let summary = populate(dir, Arc::new(LengthEmbedder), &index, 1).await.unwrap();

        assert_eq!(summary.files_read, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.records_upserted, 3);
        assert_eq!(index.len(), 3);

        let ints = index.query(&[1.0, 40.0], 5, "int").await.unwrap();
        assert_eq!(ints.len(), 2);
    }

    #[tokio::test]
    async fn local_index_is_written_once_populated() {
        let temp = TempDir::new().unwrap();
        let batches = temp.path().join("contexts");
        std::fs::create_dir_all(&batches).unwrap();
        std::fs::write(
            batches.join("contexts_0.json"),
            serde_json::to_string(&vec![record("count", "int"), record("name", "string")]).unwrap(),
        )
        .unwrap();

        let index_path = temp.path().join("index.json");
        let index = InMemoryIndex::open(&index_path).unwrap();
        populate(&batches, Arc::new(LengthEmbedder), &index, 1).await.unwrap();

        let reloaded = InMemoryIndex::open(&index_path).unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn missing_directory_is_input_not_found() {
        let temp = TempDir::new().unwrap();
        let index = InMemoryIndex::new();
        let err = populate(&temp.path().join("absent"), Arc::new(LengthEmbedder), &index, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, ParamdupError::InputNotFound { .. }));
    }
}
