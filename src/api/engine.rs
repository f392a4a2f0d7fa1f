//! Transformation service: parse, rewrite and render one C# compilation unit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::api::results::RewriteResult;
use crate::core::config::{IndexBackend, IndexConfig, NamingStrategyKind, ParamdupConfig};
use crate::core::errors::{ParamdupError, Result, ResultExt};
use crate::core::file_utils::FileReader;
use crate::lang::{language_key_for_path, CSharpAdapter};
use crate::naming::{
    DeterministicSuggester, FastEmbedder, InMemoryIndex, NameSuggester, PineconeIndex,
    SimilarityIndex, SimilaritySuggester,
};
use crate::rewrite::{DuplicateSingleParameterRewriter, SourceRenderer};
use crate::semantic::SemanticModel;

/// Where to read a file from and where to write the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProcessingOptions {
    /// Source file to transform
    pub input_path: PathBuf,

    /// Destination; the input is overwritten when absent
    pub output_path: Option<PathBuf>,
}

impl FileProcessingOptions {
    /// Overwrite `input_path` in place
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
        }
    }

    /// Write to `output_path` instead of the input
    pub fn with_output(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    /// Whether the input file is rewritten in place
    pub fn overwrites_input(&self) -> bool {
        self.output_path.is_none()
    }

    /// The path the transformed text is written to
    pub fn resolved_output(&self) -> &Path {
        self.output_path.as_deref().unwrap_or(&self.input_path)
    }
}

/// Main paramdup transformation service
pub struct TransformationService {
    /// Service configuration
    config: Arc<ParamdupConfig>,

    /// Strategy naming the duplicated parameter
    suggester: Arc<dyn NameSuggester>,
}

impl TransformationService {
    /// Create a service around an already-built naming strategy
    pub fn new(config: ParamdupConfig, suggester: Arc<dyn NameSuggester>) -> Self {
        info!(
            "Initializing transformation service with {} naming",
            suggester.name()
        );
        Self {
            config: Arc::new(config),
            suggester,
        }
    }

    /// Validate `config` and build the naming strategy it selects
    pub fn from_config(config: ParamdupConfig) -> Result<Self> {
        let suggester = build_suggester(&config)?;
        Ok(Self::new(config, suggester))
    }

    /// Active configuration
    pub fn config(&self) -> &ParamdupConfig {
        &self.config
    }

    /// Transform source text without touching the filesystem
    pub async fn transform_source(&self, source: &str) -> Result<RewriteResult> {
        let started = Instant::now();

        let mut adapter = CSharpAdapter::new()?;
        let parsed = adapter.parse_source(source)?;
        let model = SemanticModel::build(&parsed);
        debug!("Semantic model holds {} symbols", model.symbols().count());

        let rewriter = DuplicateSingleParameterRewriter::new(
            self.suggester.as_ref(),
            self.config.rewrite.include_local_functions,
        )
        .with_candidate_count(self.config.naming.candidate_count);
        let outcome = rewriter.rewrite(&parsed, &model).await;
        let transformed_text = SourceRenderer::render(parsed.source(), &outcome.edits)?;

        Ok(RewriteResult::from_stats(
            outcome.stats,
            transformed_text,
            started.elapsed(),
        ))
    }

    /// Read, transform and write one file.
    ///
    /// The output is written even when nothing was eligible, so callers always
    /// find a normalised file at [`FileProcessingOptions::resolved_output`].
    pub async fn transform_file(&self, options: &FileProcessingOptions) -> Result<RewriteResult> {
        let input = &options.input_path;
        info!("Transforming {}", input.display());
        if language_key_for_path(input).is_none() {
            warn!("{} has no C# extension; parsing it as C# anyway", input.display());
        }

        let source = FileReader::read_to_string(input)?;
        let result = self
            .transform_source(&source)
            .await
            .with_context(|| format!("While transforming {}", input.display()))?;

        let output = options.resolved_output();
        FileReader::write(output, &result.transformed_text)?;
        info!(
            "Wrote {} ({} procedures changed in {:?})",
            output.display(),
            result.changes_count,
            result.statistics.elapsed
        );

        Ok(result)
    }
}

/// Build the naming strategy selected by `config`.
///
/// For the similarity strategy the index credential is checked here, before
/// any input is read. The embedding model itself loads on first use.
pub fn build_suggester(config: &ParamdupConfig) -> Result<Arc<dyn NameSuggester>> {
    config.validate()?;

    match config.naming.strategy {
        NamingStrategyKind::Deterministic => Ok(Arc::new(DeterministicSuggester::new())),
        NamingStrategyKind::SimilarityBased => {
            let index = build_index(&config.index)?;
            let embedder = Arc::new(FastEmbedder::new(&config.embedding));
            Ok(Arc::new(SimilaritySuggester::new(embedder, index)))
        }
    }
}

/// Connect to the configured similarity index backend
pub fn build_index(config: &IndexConfig) -> Result<Arc<dyn SimilarityIndex>> {
    match config.backend {
        IndexBackend::Pinecone => {
            let api_key = config.api_key()?;
            Ok(Arc::new(PineconeIndex::new(config, api_key)?))
        }
        IndexBackend::Local => {
            let path = config.local_path.as_ref().ok_or_else(|| {
                ParamdupError::config_field("index.local_path must be set", "index.local_path")
            })?;
            Ok(Arc::new(InMemoryIndex::open(path)?))
        }
    }
}
