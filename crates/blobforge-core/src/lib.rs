//! # blobforge-core
//!
//! A library for converting a flat binary into C/C++ source text that, when
//! compiled and executed, reconstructs the original bytes in memory.
//!
//! The forward pipeline — optional compression, optional keyed encoding,
//! optional printable-text envelope — runs here at build time. The reverse
//! runs in the emitted code, assembled from C templates declared in an
//! external YAML catalog alongside optional auxiliary snippets (delay
//! loops, anti-emulation probes) with caller-bound arguments.
//!
//! ## Architecture
//!
//! - [`catalog`]: catalog loading, validation, and the codec registry
//! - [`transform`]: forward byte transforms and their test-side inverses
//! - [`pipeline`]: stage composition and metadata threading
//! - [`render`]: placeholder substitution, argument binding, source emission
//! - [`error`]: error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use blobforge_core::{Catalog, Emitter, Executor, PipelineConfig};
//!
//! let data = std::fs::read("./payload.bin")?;
//!
//! let catalog = Catalog::builtin()?;
//! let config = PipelineConfig {
//!     encoder: 1, // single-byte xor
//!     ..Default::default()
//! };
//!
//! let output = Executor::new(&catalog).run(&data, &config)?;
//! println!("{}", Emitter::new(&catalog).emit(&output)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! New algorithms are catalog entries, not code: an entry binds one of the
//! built-in [`TransformKind`]s, optionally pins parameters, and carries the
//! C template that reverses it in the emitted source.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod catalog;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod transform;

// Re-export primary types for convenience
pub use catalog::{Catalog, CatalogEntry, Category};
pub use error::{Error, Result};
pub use pipeline::{Executor, PipelineConfig, PipelineOutput, SnippetSelection};
pub use render::{Emitter, RenderContext, RenderOptions};
pub use transform::{Artifact, MetaValue, Metadata, TransformKind};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
