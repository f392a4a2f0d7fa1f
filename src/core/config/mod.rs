//! Configuration types and management for paramdup.
//!
//! All paths, hosts and credential locations live here and are passed into the
//! transformation service explicitly. Nothing in the pipeline reads a hard-coded
//! location.

pub mod validation;

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::errors::{ParamdupError, Result};

pub use validation::{validate_non_blank, validate_positive_u64, validate_positive_usize};

/// Main configuration for the paramdup pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamdupConfig {
    /// Naming strategy selection
    #[serde(default)]
    pub naming: NamingConfig,

    /// Embedding model settings for the similarity-based strategy
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Similarity index connection settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Corpus harvesting settings
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Rewrite behaviour
    #[serde(default)]
    pub rewrite: RewriteConfig,
}

/// Configuration construction and I/O methods for [`ParamdupConfig`].
impl ParamdupConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ParamdupError::io(format!("Failed to read config file: {}", path.display()), e)
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            ParamdupError::config(format!(
                "Invalid config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content).map_err(|e| {
            ParamdupError::io(
                format!("Failed to write config file: {}", path.display()),
                e,
            )
        })
    }

    /// Override the naming strategy, typically from the command line
    pub fn with_strategy(mut self, strategy: NamingStrategyKind) -> Self {
        self.naming.strategy = strategy;
        self
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        self.naming.validate()?;
        self.embedding.validate()?;
        self.harvest.validate()?;
        self.index.validate()?;

        if self.naming.strategy == NamingStrategyKind::SimilarityBased {
            self.index.validate_backend()?;
        }

        Ok(())
    }
}

/// Available naming strategies
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum NamingStrategyKind {
    /// Suffix-based names (`x2`, `xCopy`, `x_copy`, `x_1` ...), always succeeds
    Deterministic,
    /// Nearest previously-seen parameter names from a similarity index
    #[default]
    SimilarityBased,
}

impl NamingStrategyKind {
    /// Stable name used in logs and config files
    pub fn as_str(self) -> &'static str {
        match self {
            NamingStrategyKind::Deterministic => "deterministic",
            NamingStrategyKind::SimilarityBased => "similarity-based",
        }
    }
}

impl std::str::FromStr for NamingStrategyKind {
    type Err = ParamdupError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deterministic" => Ok(Self::Deterministic),
            "similarity-based" | "similarity" => Ok(Self::SimilarityBased),
            other => Err(ParamdupError::validation_field(
                format!(
                    "Unknown naming strategy '{}', expected 'deterministic' or 'similarity-based'",
                    other
                ),
                "naming.strategy",
            )),
        }
    }
}

/// Naming strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Strategy used to name the duplicated parameter
    #[serde(default)]
    pub strategy: NamingStrategyKind,

    /// Number of candidates requested per parameter
    #[serde(default = "NamingConfig::default_candidate_count")]
    pub candidate_count: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            strategy: NamingStrategyKind::default(),
            candidate_count: Self::default_candidate_count(),
        }
    }
}

impl NamingConfig {
    const fn default_candidate_count() -> usize {
        1
    }

    /// Validate naming configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.candidate_count, "naming.candidate_count")
    }
}

/// Embedding models usable for context embedding (subset of fastembed models)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// All-MiniLM-L6-v2 - 384 dim, fast and lightweight
    #[default]
    AllMiniLML6V2,
    /// All-MiniLM-L6-v2 Quantized - 384 dim, very fast
    AllMiniLML6V2Q,
    /// BGE Small EN v1.5 - 384 dim, very fast
    BGESmallENV15,
    /// Nomic Embed Text v1.5 - 768 dim, good for code
    NomicEmbedTextV15,
    /// Jina Embeddings v2 Base Code - 768 dim, optimized for code
    JinaEmbeddingsV2BaseCode,
}

impl EmbeddingModel {
    /// Get the embedding dimension for this model
    pub fn dimension(&self) -> usize {
        match self {
            EmbeddingModel::AllMiniLML6V2
            | EmbeddingModel::AllMiniLML6V2Q
            | EmbeddingModel::BGESmallENV15 => 384,
            EmbeddingModel::NomicEmbedTextV15 | EmbeddingModel::JinaEmbeddingsV2BaseCode => 768,
        }
    }

    /// Get a human-readable name for this model
    pub fn display_name(&self) -> &'static str {
        match self {
            EmbeddingModel::AllMiniLML6V2 => "all-MiniLM-L6-v2",
            EmbeddingModel::AllMiniLML6V2Q => "all-MiniLM-L6-v2 (quantized)",
            EmbeddingModel::BGESmallENV15 => "BGE-small-en-v1.5",
            EmbeddingModel::NomicEmbedTextV15 => "nomic-embed-text-v1.5",
            EmbeddingModel::JinaEmbeddingsV2BaseCode => "jina-embeddings-v2-base-code",
        }
    }
}

/// Configuration for embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model to use
    #[serde(default)]
    pub model: EmbeddingModel,
    /// Cache directory for model files (user cache directory when unset)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Whether to show download progress for model files
    #[serde(default)]
    pub show_download_progress: bool,
    /// Maximum batch size for embedding generation
    #[serde(default = "EmbeddingConfig::default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: EmbeddingModel::default(),
            cache_dir: None,
            show_download_progress: false,
            batch_size: Self::default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    const fn default_batch_size() -> usize {
        32
    }

    /// Validate embedding configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.batch_size, "embedding.batch_size")
    }
}

/// Similarity index backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Hosted Pinecone-compatible vector index over HTTP
    #[default]
    Pinecone,
    /// JSON file loaded into memory and ranked by cosine similarity
    Local,
}

/// Similarity index connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Which backend serves similarity queries
    #[serde(default)]
    pub backend: IndexBackend,
    /// Index host URL (pinecone backend)
    #[serde(default)]
    pub host: Option<String>,
    /// Namespace holding the parameter-name corpus
    #[serde(default = "IndexConfig::default_namespace")]
    pub namespace: String,
    /// Environment variable that holds the API key
    #[serde(default = "IndexConfig::default_api_key_env")]
    pub api_key_env: String,
    /// Path of the JSON corpus file (local backend)
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    /// Request timeout in seconds
    #[serde(default = "IndexConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            host: None,
            namespace: Self::default_namespace(),
            api_key_env: Self::default_api_key_env(),
            local_path: None,
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl IndexConfig {
    fn default_namespace() -> String {
        "code-contexts".to_string()
    }

    fn default_api_key_env() -> String {
        "PINECONE_API_KEY".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        30
    }

    /// Validate index configuration independent of the selected strategy
    pub fn validate(&self) -> Result<()> {
        validate_positive_u64(self.timeout_secs, "index.timeout_secs")?;
        if self.namespace.trim().is_empty() {
            return Err(ParamdupError::config_field(
                "index.namespace must not be empty",
                "index.namespace",
            ));
        }
        Ok(())
    }

    /// Validate the settings the selected backend needs to be reachable
    pub fn validate_backend(&self) -> Result<()> {
        match self.backend {
            IndexBackend::Pinecone => validate_non_blank(self.host.as_deref(), "index.host"),
            IndexBackend::Local => validate_non_blank(
                self.local_path.as_ref().and_then(|p| p.to_str()),
                "index.local_path",
            ),
        }
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ParamdupError::config_field(
                format!("{} environment variable is not set", self.api_key_env),
                "index.api_key_env",
            )),
        }
    }
}

/// Corpus harvesting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Records per output batch file
    #[serde(default = "HarvestConfig::default_batch_size")]
    pub batch_size: usize,
    /// Directory receiving `contexts_<n>.json` files
    #[serde(default = "HarvestConfig::default_output_dir")]
    pub output_dir: PathBuf,
    /// Glob patterns excluded from discovery
    #[serde(default = "HarvestConfig::default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    /// Parameters with shorter names are not harvested
    #[serde(default = "HarvestConfig::default_min_name_length")]
    pub min_name_length: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::default_batch_size(),
            output_dir: Self::default_output_dir(),
            exclude_patterns: Self::default_exclude_patterns(),
            min_name_length: Self::default_min_name_length(),
        }
    }
}

impl HarvestConfig {
    const fn default_batch_size() -> usize {
        10_000
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from("contexts")
    }

    fn default_exclude_patterns() -> Vec<String> {
        vec!["**/obj/**".to_string(), "**/bin/**".to_string()]
    }

    const fn default_min_name_length() -> usize {
        2
    }

    /// Validate harvesting configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.batch_size, "harvest.batch_size")?;
        validate_positive_usize(self.min_name_length, "harvest.min_name_length")
    }
}

/// Rewrite behaviour switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Treat local functions as procedures in their own right
    #[serde(default = "RewriteConfig::default_include_local_functions")]
    pub include_local_functions: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            include_local_functions: Self::default_include_local_functions(),
        }
    }
}

impl RewriteConfig {
    const fn default_include_local_functions() -> bool {
        true
    }
}
