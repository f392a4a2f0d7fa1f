//! CLI argument structures.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use paramdup_rs::NamingStrategyKind;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Duplicate single parameters of C# methods with collision-free names
#[derive(Parser)]
#[command(name = "paramdup")]
#[command(version = VERSION)]
#[command(about = "Duplicate the parameter of every single-parameter C# method")]
#[command(long_about = "
Rewrites a C# file so that every method or local function with exactly one
parameter gains a second parameter of the same type, and the first statement
using the original parameter is duplicated for the new one.

Common Usage:

  # Rewrite in place with suffix-based names
  paramdup transform Program.cs --strategy deterministic

  # Write to another file, naming from a similarity index
  paramdup transform Program.cs Program.out.cs --config paramdup.yml

  # Build and load the naming corpus
  paramdup harvest ./repos --out contexts
  paramdup populate contexts --config paramdup.yml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite one C# file
    Transform(TransformArgs),

    /// Extract parameter contexts from a tree of C# files
    Harvest(HarvestArgs),

    /// Embed harvested contexts and upsert them into the similarity index
    Populate(PopulateArgs),

    /// Print default configuration in YAML format
    #[command(name = "print-default-config")]
    PrintDefaultConfig,
}

#[derive(Args)]
pub struct TransformArgs {
    /// C# source file to rewrite
    pub input: PathBuf,

    /// Destination file (defaults to overwriting the input)
    pub output: Option<PathBuf>,

    /// Naming strategy, overriding the configuration file
    #[arg(short, long, value_enum)]
    pub strategy: Option<NamingStrategyKind>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct HarvestArgs {
    /// Directory scanned for `*.cs` files
    pub root: PathBuf,

    /// Directory receiving the batch files
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Records per batch file
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct PopulateArgs {
    /// Directory holding `contexts_<n>.json` batch files
    pub dir: PathBuf,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
