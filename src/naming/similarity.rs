//! Names drawn from the nearest previously-seen parameter contexts.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::embeddings::Embedder;
use super::index::SimilarityIndex;
use super::{NameSuggester, NamingContext, ScopeNameSet};
use crate::core::errors::{ParamdupError, Result};

/// Similarity-based naming strategy. Not total: may return no candidates.
pub struct SimilaritySuggester {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
}

impl SimilaritySuggester {
    /// Combine an embedder with an index holding vectors of the same dimension.
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn SimilarityIndex>) -> Self {
        Self { embedder, index }
    }

    async fn try_suggest(
        &self,
        context: &NamingContext,
        type_name: &str,
        existing: &ScopeNameSet,
        count: usize,
    ) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let text = context.describe();
        let embedder = Arc::clone(&self.embedder);
        let vector = tokio::task::spawn_blocking(move || embedder.embed_one(&text))
            .await
            .map_err(|e| ParamdupError::internal(format!("Embedding task failed: {}", e)))??;

        let hits = self.index.query(&vector, count, type_name).await?;
        debug!(
            "{} index returned {} names for type {}",
            self.index.name(),
            hits.len(),
            type_name
        );

        Ok(clean_candidates(
            hits.into_iter().map(|hit| hit.param_name),
            existing,
            count,
        ))
    }
}

/// Strip surrounding quotes, then drop empty, duplicate and already-bound names.
pub fn clean_candidates(
    names: impl IntoIterator<Item = String>,
    existing: &ScopeNameSet,
    count: usize,
) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|name| !name.is_empty() && !existing.contains(name))
        .filter(|name| seen.insert(name.clone()))
        .take(count)
        .collect()
}

#[async_trait]
impl NameSuggester for SimilaritySuggester {
    fn name(&self) -> &'static str {
        "similarity-based"
    }

    async fn suggest(
        &self,
        _original: &str,
        context: &NamingContext,
        type_name: &str,
        existing: &ScopeNameSet,
        count: usize,
    ) -> Vec<String> {
        match self.try_suggest(context, type_name, existing, count).await {
            Ok(names) => names,
            Err(e) => {
                warn!("Similarity naming unavailable, no candidates: {}", e);
                Vec::new()
            }
        }
    }
}
