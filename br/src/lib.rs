//! blockrender - static template renderer for reusable text blocks
//!
//! Blocks are named text fragments loaded from a directory of sources.
//! Templates reference them with `${name}` placeholders and are rendered into
//! an output directory with the same file names.
//!
//! # Layout
//!
//! ```text
//! prompts/
//! ├── blocks/       # *.md / *.txt tagged text, *.yaml / *.yml mappings
//! ├── templates/    # *.md with ${name} placeholders
//! └── rendered/     # output, one file per template
//! ```
//!
//! # Modules
//!
//! - [`blocks`] - block source parsing, validation and the caching loader
//! - [`render`] - placeholder substitution and batch rendering
//! - [`cycle`] - one load-then-render pass
//! - [`watcher`] - re-render on file changes
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//!
//! # Example
//!
//! ```ignore
//! use blockrender::{Config, RenderCycle};
//!
//! let mut cycle = RenderCycle::new(Config::default());
//! let report = cycle.run()?;
//! assert!(report.is_success());
//! ```

pub mod blocks;
pub mod cli;
pub mod config;
pub mod cycle;
pub mod error;
pub mod render;
pub mod watcher;

pub use blocks::{BlockLoader, BlockMap, ShapeProblem, SourceFormat, TagProblem, load_blocks};
pub use config::{BatchPolicy, Config};
pub use cycle::RenderCycle;
pub use error::BlockError;
pub use render::{RenderFailure, RenderReport, TemplateRenderer, placeholders, render};
pub use watcher::{ChangeFilter, watch};
