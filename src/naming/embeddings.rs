//! Embedding generation using fastembed with caching.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

use crate::core::config::{EmbeddingConfig, EmbeddingModel};
use crate::core::errors::{ParamdupError, Result};

/// Turns context strings into fixed-size vectors.
pub trait Embedder: Send + Sync {
    /// Vector length produced by this embedder
    fn dimension(&self) -> usize;

    /// Embed several texts, preserving order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| ParamdupError::naming("embedder", "Embedding returned empty result"))
    }
}

/// Embedder backed by a local fastembed model.
///
/// The model is loaded on first use, so a run that never needs an embedding
/// never downloads one.
pub struct FastEmbedder {
    config: EmbeddingConfig,
    model: Mutex<Option<TextEmbedding>>,
    cache: Arc<RwLock<EmbeddingCache>>,
}

/// In-memory cache for embeddings (hash -> vector)
struct EmbeddingCache {
    entries: HashMap<u64, Vec<f32>>,
    max_entries: usize,
    hits: usize,
    misses: usize,
}

impl EmbeddingCache {
    fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
            hits: 0,
            misses: 0,
        }
    }

    fn get(&mut self, hash: u64) -> Option<Vec<f32>> {
        if let Some(vec) = self.entries.get(&hash) {
            self.hits += 1;
            Some(vec.clone())
        } else {
            self.misses += 1;
            None
        }
    }

    fn insert(&mut self, hash: u64, embedding: Vec<f32>) {
        // At capacity: drop half the entries
        if self.entries.len() >= self.max_entries {
            let to_remove: Vec<u64> = self
                .entries
                .keys()
                .take(self.max_entries / 2)
                .copied()
                .collect();
            for key in to_remove {
                self.entries.remove(&key);
            }
        }
        self.entries.insert(hash, embedding);
    }

    fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

fn lock_error(what: &str, err: impl std::fmt::Display) -> ParamdupError {
    ParamdupError::internal(format!("Failed to acquire {} lock: {}", what, err))
}

impl FastEmbedder {
    const MAX_CACHE_ENTRIES: usize = 10_000;

    /// Create an embedder for the configured model without loading it.
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            config: config.clone(),
            model: Mutex::new(None),
            cache: Arc::new(RwLock::new(EmbeddingCache::new(Self::MAX_CACHE_ENTRIES))),
        }
    }

    /// Load (downloading on first use) the model now rather than on first embed.
    pub fn preload(&self) -> Result<()> {
        self.with_model(|_| Ok(()))
    }

    /// Cached entry count and hit rate
    pub fn cache_stats(&self) -> Result<(usize, f64)> {
        let cache = self.cache.read().map_err(|e| lock_error("cache", e))?;
        Ok((cache.entries.len(), cache.hit_rate()))
    }

    fn with_model<T>(&self, f: impl FnOnce(&mut TextEmbedding) -> Result<T>) -> Result<T> {
        let mut guard = self.model.lock().map_err(|e| lock_error("model", e))?;
        if guard.is_none() {
            *guard = Some(load_model(&self.config)?);
        }
        match guard.as_mut() {
            Some(model) => f(model),
            None => Err(ParamdupError::internal("Embedding model missing after load")),
        }
    }
}

fn load_model(config: &EmbeddingConfig) -> Result<TextEmbedding> {
    let mut init_options = InitOptions::new(to_fastembed_model(config.model))
        .with_show_download_progress(config.show_download_progress);
    if let Some(cache_dir) = model_cache_dir(config) {
        debug!("Embedding model cache: {}", cache_dir.display());
        init_options = init_options.with_cache_dir(cache_dir);
    }

    info!("Loading embedding model {}", config.model.display_name());
    TextEmbedding::try_new(init_options).map_err(|e| {
        ParamdupError::naming(
            "embedder",
            format!("Failed to initialize embedding model: {}", e),
        )
    })
}

impl Embedder for FastEmbedder {
    fn dimension(&self) -> usize {
        self.config.model.dimension()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut uncached: Vec<usize> = Vec::new();
        {
            let mut cache = self.cache.write().map_err(|e| lock_error("cache", e))?;
            for (i, text) in texts.iter().enumerate() {
                match cache.get(xxh3_64(text.as_bytes())) {
                    Some(embedding) => results[i] = Some(embedding),
                    None => uncached.push(i),
                }
            }
        }

        if !uncached.is_empty() {
            debug!("Embedding {} uncached texts", uncached.len());
            let batch: Vec<&str> = uncached.iter().map(|&i| texts[i].as_str()).collect();
            let embeddings = self.with_model(|model| {
                model.embed(batch, Some(self.config.batch_size)).map_err(|e| {
                    ParamdupError::naming("embedder", format!("Embedding generation failed: {}", e))
                })
            })?;

            let mut cache = self.cache.write().map_err(|e| lock_error("cache", e))?;
            for (i, embedding) in uncached.into_iter().zip(embeddings) {
                cache.insert(xxh3_64(texts[i].as_bytes()), embedding.clone());
                results[i] = Some(embedding);
            }
        }

        results
            .into_iter()
            .enumerate()
            .map(|(i, embedding)| {
                embedding.ok_or_else(|| {
                    ParamdupError::naming("embedder", format!("Missing embedding for text {}", i))
                })
            })
            .collect()
    }
}

/// Configured cache directory, else `<user cache>/paramdup/models`.
fn model_cache_dir(config: &EmbeddingConfig) -> Option<PathBuf> {
    config
        .cache_dir
        .clone()
        .or_else(|| dirs::cache_dir().map(|dir| dir.join("paramdup").join("models")))
}

fn to_fastembed_model(model: EmbeddingModel) -> FastEmbedModel {
    match model {
        EmbeddingModel::AllMiniLML6V2 => FastEmbedModel::AllMiniLML6V2,
        EmbeddingModel::AllMiniLML6V2Q => FastEmbedModel::AllMiniLML6V2Q,
        EmbeddingModel::BGESmallENV15 => FastEmbedModel::BGESmallENV15,
        EmbeddingModel::NomicEmbedTextV15 => FastEmbedModel::NomicEmbedTextV15,
        EmbeddingModel::JinaEmbeddingsV2BaseCode => FastEmbedModel::JinaEmbeddingsV2BaseCode,
    }
}

/// Cosine similarity of two vectors; 0.0 for empty or mismatched input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_cache_basic_operations() {
        let mut cache = EmbeddingCache::new(100);

        assert!(cache.get(123).is_none());
        assert_eq!(cache.misses, 1);

        cache.insert(123, vec![1.0, 2.0, 3.0]);
        assert_eq!(cache.get(123), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(cache.hits, 1);
        assert!((cache.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn embedding_cache_evicts_at_capacity() {
        let mut cache = EmbeddingCache::new(4);
        for key in 0..4 {
            cache.insert(key, vec![key as f32]);
        }
        cache.insert(99, vec![99.0]);
        assert_eq!(cache.entries.len(), 3);
        assert!(cache.entries.contains_key(&99));
    }

    #[test]
    fn explicit_cache_dir_wins() {
        let config = EmbeddingConfig {
            cache_dir: Some(PathBuf::from("/tmp/models")),
            ..EmbeddingConfig::default()
        };
        assert_eq!(model_cache_dir(&config), Some(PathBuf::from("/tmp/models")));
    }

    #[test]
    fn cosine_similarity_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    struct Constant;

    impl Embedder for Constant {
        fn dimension(&self) -> usize {
            2
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    #[test]
    fn embed_one_uses_batch() {
        assert_eq!(Constant.embed_one("abc").unwrap(), vec![3.0, 1.0]);
    }
}
