//! Command execution for the paramdup CLI.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::debug;

use paramdup_rs::api::engine::build_index;
use paramdup_rs::corpus;
use paramdup_rs::naming::{Embedder, FastEmbedder};
use paramdup_rs::{
    build_suggester, FileProcessingOptions, ParamdupConfig, ParamdupError, TransformationService,
};

use super::args::{HarvestArgs, PopulateArgs, TransformArgs};

/// Exit status for a failed command: 2 when the input file is missing,
/// 1 for every other failure.
pub fn exit_code_for(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<ParamdupError>() {
        Some(ParamdupError::InputNotFound { .. }) => 2,
        _ => 1,
    }
}

/// Load configuration from `path`, or the defaults when none is given
pub fn load_configuration(path: Option<&Path>) -> anyhow::Result<ParamdupConfig> {
    match path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            Ok(ParamdupConfig::from_yaml_file(path)?)
        }
        None => Ok(ParamdupConfig::default()),
    }
}

/// Rewrite one file and report the outcome on stdout
pub async fn transform_command(args: TransformArgs) -> anyhow::Result<()> {
    let mut config = load_configuration(args.config.as_deref())?;
    if let Some(strategy) = args.strategy {
        config = config.with_strategy(strategy);
    }

    // Credentials are checked before the input is touched.
    let suggester = build_suggester(&config)?;
    let service = TransformationService::new(config, suggester);

    let mut options = FileProcessingOptions::new(&args.input);
    if let Some(output) = args.output {
        options = options.with_output(output);
    }

    let result = service.transform_file(&options).await?;
    println!("{}", result.summary_message(options.resolved_output()));
    Ok(())
}

/// Scan a directory tree and write context batch files
pub async fn harvest_command(args: HarvestArgs) -> anyhow::Result<()> {
    let mut config = load_configuration(args.config.as_deref())?;
    if let Some(out) = args.out {
        config.harvest.output_dir = out;
    }
    if let Some(batch_size) = args.batch_size {
        config.harvest.batch_size = batch_size;
    }

    let pb = spinner(format!("Harvesting parameter contexts under {}", args.root.display()))?;
    let root = args.root.clone();
    let harvest_config = config.harvest.clone();
    let summary = tokio::task::spawn_blocking(move || corpus::harvest(&root, &harvest_config))
        .await
        .context("Harvest task failed")??;
    pb.finish_and_clear();

    println!(
        "{} {} parameter contexts to {} batch file(s) in {}",
        "Extracted".bright_green().bold(),
        summary.records,
        summary.batch_files.len(),
        config.harvest.output_dir.display().to_string().cyan()
    );
    println!(
        "   {} of {} files processed, {} skipped",
        summary.files_processed, summary.files_discovered, summary.files_skipped
    );
    Ok(())
}

/// Embed batch files and upsert them into the configured index
pub async fn populate_command(args: PopulateArgs) -> anyhow::Result<()> {
    let config = load_configuration(args.config.as_deref())?;
    config.embedding.validate()?;
    config.index.validate()?;
    config.index.validate_backend()?;

    let index = build_index(&config.index)?;
    let embedder = Arc::new(FastEmbedder::new(&config.embedding));

    let pb = spinner(format!(
        "Loading embedding model {}",
        config.embedding.model.display_name()
    ))?;
    let loader = Arc::clone(&embedder);
    tokio::task::spawn_blocking(move || loader.preload())
        .await
        .context("Model loading task failed")??;

    pb.set_message(format!("Populating {} index", index.name()));
    let shared: Arc<dyn Embedder> = Arc::clone(&embedder) as Arc<dyn Embedder>;
    let summary = corpus::populate(
        &args.dir,
        shared,
        index.as_ref(),
        config.embedding.batch_size,
    )
    .await?;
    pb.finish_and_clear();

    let (cached, hit_rate) = embedder.cache_stats()?;
    debug!(
        "Embedding cache: {} entries, {:.1}% hit rate",
        cached,
        hit_rate * 100.0
    );

    println!(
        "{} {} records from {} batch file(s)",
        "Upserted".bright_green().bold(),
        summary.records_upserted,
        summary.files_read
    );
    if summary.files_skipped > 0 {
        println!(
            "   {} {} unreadable batch file(s) skipped",
            "Warning:".yellow().bold(),
            summary.files_skipped
        );
    }
    Ok(())
}

/// Print the default configuration as YAML
pub async fn print_default_config() -> anyhow::Result<()> {
    println!("{}", "# Default paramdup configuration".dimmed());
    println!("{}", "# Save this to a file and customize as needed".dimmed());
    println!(
        "{}",
        "# Usage: paramdup transform <INPUT> --config your-config.yml".dimmed()
    );
    println!();

    let yaml_output = serde_yaml::to_string(&ParamdupConfig::default())?;
    println!("{}", yaml_output);
    Ok(())
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.blue} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}
