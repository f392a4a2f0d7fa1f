//! # Paramdup: single-parameter duplication for C# sources
//!
//! Rewrites a C# compilation unit so that every method or local function with
//! exactly one parameter gains a second, collision-free parameter of the same
//! type, and the first statement referencing the original parameter is
//! duplicated with the references renamed.
//!
//! - **Syntax**: tree-sitter C# grammar, edits applied as text insertions
//! - **Semantics**: lexical scope resolution so shadowed names are never renamed
//! - **Naming**: a deterministic suffix strategy or nearest-neighbour lookup in an
//!   embedding index built from harvested code
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                TransformationService (api)                   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Rewrite        │  Naming         │  Lang / Semantic │ Corpus │
//! │ • Orchestrator  │ • Deterministic │ • C# adapter     │ • Harvest
//! │ • Locator       │ • Similarity    │ • Scope model    │ • Populate
//! │ • Edits         │ • Index/Embed   │ • Type names     │        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paramdup_rs::{DeterministicSuggester, ParamdupConfig, TransformationService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = TransformationService::new(
//!         ParamdupConfig::default(),
//!         Arc::new(DeterministicSuggester::new()),
//!     );
//!     let result = service
//!         .transform_source("class M { int Abs(int value) { return value < 0 ? -value : value; } }")
//!         .await?;
//!
//!     println!("{} procedures changed", result.changes_count);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

// Configuration, errors and file handling
pub mod core {
    //! Configuration, error types and file utilities.

    pub mod config;
    pub mod errors;
    pub mod file_utils;
}

pub mod corpus;
pub mod lang;
pub mod naming;
pub mod rewrite;
pub mod semantic;

// Public API layer
pub mod api {
    //! High-level transformation API.

    pub mod engine;
    pub mod results;
}

pub use crate::api::engine::{build_suggester, FileProcessingOptions, TransformationService};
pub use crate::api::results::{RewriteResult, RewriteStatistics};
pub use crate::core::config::{NamingStrategyKind, ParamdupConfig};
pub use crate::core::errors::{ParamdupError, Result};
pub use crate::naming::{DeterministicSuggester, NameSuggester, SimilaritySuggester};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
