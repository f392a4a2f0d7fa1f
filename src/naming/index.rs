//! Similarity index backends holding previously-seen parameter names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::embeddings::cosine_similarity;
use crate::core::config::{validate_non_blank, IndexConfig};
use crate::core::errors::{ParamdupError, Result};
use crate::core::file_utils::FileReader;

/// Metadata stored alongside each vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Parameter type the name was seen with
    pub param_type: String,
    /// The parameter name
    pub param_name: String,
}

/// One stored vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Stable record id
    pub id: String,
    /// Embedding of the context string
    pub values: Vec<f32>,
    /// Type and name
    pub metadata: RecordMetadata,
}

/// A ranked query hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredName {
    /// Suggested parameter name
    pub param_name: String,
    /// Similarity score, higher is closer
    pub score: f32,
}

/// Nearest-neighbour lookup over stored parameter contexts.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// The `top_k` nearest stored names whose type equals `param_type`.
    async fn query(&self, vector: &[f32], top_k: usize, param_type: &str)
        -> Result<Vec<ScoredName>>;

    /// Insert or replace records by id; returns how many were written.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize>;

    /// Persist buffered upserts. Remote indexes write through and need nothing.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    filter: serde_json::Value,
    include_metadata: bool,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<RecordMetadata>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexRecord],
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

/// Hosted Pinecone-compatible index accessed over HTTP
pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    namespace: String,
    api_key: String,
}

impl PineconeIndex {
    /// Create a client for the configured host and namespace.
    pub fn new(config: &IndexConfig, api_key: impl Into<String>) -> Result<Self> {
        validate_non_blank(config.host.as_deref(), "index.host")?;
        let host = config.host.as_deref().unwrap_or_default();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParamdupError::naming("pinecone", format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            host: normalize_host(host),
            namespace: config.namespace.clone(),
            api_key: api_key.into(),
        })
    }

    /// Base URL requests are sent to
    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.host, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ParamdupError::naming("pinecone", format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ParamdupError::naming(
                "pinecone",
                format!("{} returned {}: {}", path, status, error_text),
            ));
        }

        Ok(response.json().await?)
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn type_filter(param_type: &str) -> serde_json::Value {
    json!({ "paramType": { "$eq": param_type } })
}

#[async_trait]
impl SimilarityIndex for PineconeIndex {
    fn name(&self) -> &'static str {
        "pinecone"
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        param_type: &str,
    ) -> Result<Vec<ScoredName>> {
        let request = QueryRequest {
            vector,
            top_k,
            filter: type_filter(param_type),
            include_metadata: true,
            namespace: &self.namespace,
        };
        let response: QueryResponse = self.post("query", &request).await?;
        debug!("Index returned {} matches", response.matches.len());

        Ok(response
            .matches
            .into_iter()
            .filter_map(|m| {
                m.metadata.map(|meta| ScoredName {
                    param_name: meta.param_name,
                    score: m.score,
                })
            })
            .collect())
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let request = UpsertRequest {
            vectors: records,
            namespace: &self.namespace,
        };
        let response: UpsertResponse = self.post("vectors/upsert", &request).await?;
        Ok(response.upserted_count)
    }
}

/// Index held in memory and optionally persisted as a JSON array of records
pub struct InMemoryIndex {
    records: DashMap<String, IndexRecord>,
    path: Option<PathBuf>,
}

impl InMemoryIndex {
    /// Empty, unpersisted index
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            path: None,
        }
    }

    /// Load records from `path` (empty when the file does not exist yet).
    /// [`SimilarityIndex::flush`] writes upserts back to the same file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = DashMap::new();

        if path.exists() {
            let content = FileReader::read_to_string(&path)?;
            let loaded: Vec<IndexRecord> = serde_json::from_str(&content)?;
            info!("Loaded {} index records from {}", loaded.len(), path.display());
            for record in loaded {
                records.insert(record.id.clone(), record);
            }
        }

        Ok(Self {
            records,
            path: Some(path),
        })
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write all records to `path`, sorted by id.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut records: Vec<IndexRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        FileReader::write(path, &serde_json::to_string_pretty(&records)?)
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        param_type: &str,
    ) -> Result<Vec<ScoredName>> {
        let mut scored: Vec<(f32, String, String)> = self
            .records
            .iter()
            .filter(|entry| entry.metadata.param_type == param_type)
            .map(|entry| {
                (
                    cosine_similarity(vector, &entry.values),
                    entry.id.clone(),
                    entry.metadata.param_name.clone(),
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, _, param_name)| ScoredName { param_name, score })
            .collect())
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        for record in records {
            self.records.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn flush(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, values: Vec<f32>, param_type: &str, param_name: &str) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            values,
            metadata: RecordMetadata {
                param_type: param_type.to_string(),
                param_name: param_name.to_string(),
            },
        }
    }

    #[test]
    fn query_request_wire_format() {
        let vector = [0.5f32, 0.25];
        let request = QueryRequest {
            vector: &vector,
            top_k: 3,
            filter: type_filter("int"),
            include_metadata: true,
            namespace: "code-contexts",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "vector": [0.5, 0.25],
                "topK": 3,
                "filter": { "paramType": { "$eq": "int" } },
                "includeMetadata": true,
                "namespace": "code-contexts"
            })
        );
    }

    #[test]
    fn record_wire_format_uses_camel_case_metadata() {
        let value = serde_json::to_value(record("a", vec![1.0], "string", "name")).unwrap();
        assert_eq!(value["metadata"]["paramType"], "string");
        assert_eq!(value["metadata"]["paramName"], "name");
    }

    #[test]
    fn query_response_skips_matches_without_metadata() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"matches":[{"id":"1","score":0.9,"metadata":{"paramType":"int","paramName":"count"}},{"id":"2","score":0.5}],"namespace":"x"}"#,
        )
        .unwrap();
        assert_eq!(response.matches.len(), 2);
        assert!(response.matches[1].metadata.is_none());
    }

    #[test]
    fn host_normalization() {
        assert_eq!(normalize_host("names-abc.svc.pinecone.io/"), "https://names-abc.svc.pinecone.io");
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn pinecone_requires_host() {
        let config = IndexConfig::default();
        assert!(PineconeIndex::new(&config, "key").is_err());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_naming_error() {
        let config = IndexConfig {
            host: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 2,
            ..IndexConfig::default()
        };
        let index = PineconeIndex::new(&config, "key").unwrap();
        let err = index.query(&[1.0], 1, "int").await.unwrap_err();
        assert!(matches!(err, ParamdupError::Naming { .. }));
    }

    #[tokio::test]
    async fn in_memory_ranks_by_cosine_within_type() {
        let index = InMemoryIndex::new();
        index
            .upsert(&[
                record("1", vec![1.0, 0.0], "int", "count"),
                record("2", vec![0.7, 0.7], "int", "total"),
                record("3", vec![1.0, 0.0], "string", "label"),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.1], 5, "int").await.unwrap();
        let names: Vec<_> = hits.iter().map(|h| h.param_name.as_str()).collect();
        assert_eq!(names, vec!["count", "total"]);

        let top = index.query(&[1.0, 0.1], 1, "int").await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn flush_persists_to_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");

        let index = InMemoryIndex::open(&path).unwrap();
        assert!(index.is_empty());
        index
            .upsert(&[record("a", vec![1.0], "int", "count")])
            .await
            .unwrap();
        index
            .upsert(&[record("a", vec![1.0], "int", "amount")])
            .await
            .unwrap();
        assert!(!path.exists());
        index.flush().await.unwrap();

        let reloaded = InMemoryIndex::open(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        let hits = reloaded.query(&[1.0], 1, "int").await.unwrap();
        assert_eq!(hits[0].param_name, "amount");
    }
}
