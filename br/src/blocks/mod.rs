//! Block sources and the block loader
//!
//! A block is a named text fragment. Sources come in two encodings:
//!
//! - [`tagged`] - inline `<!name>` ... `<!/name>` markers in a text file
//! - [`structured`] - a YAML mapping of names to strings or string lists
//!
//! [`BlockLoader`] reads a directory of sources, validates each one and merges
//! them into a single [`BlockMap`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::BlockError;

mod loader;
pub mod structured;
pub mod tagged;

pub use loader::{BlockLoader, load_blocks};
pub use structured::ShapeProblem;
pub use tagged::{Marker, TagProblem};

/// Merged mapping of block name to flattened content
pub type BlockMap = BTreeMap<String, String>;

/// Pattern every block name matches
pub const NAME_PATTERN: &str = "[A-Za-z0-9_-]+";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{NAME_PATTERN}$")).expect("name regex is valid"));

/// Check whether a string is a usable block name
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Encoding of a block source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Tagged,
    Structured,
}

/// Parse one source file's text, logging a warning per problem found
pub fn parse_source(path: &Path, text: &str, format: SourceFormat) -> Result<BlockMap, BlockError> {
    debug!(?path, ?format, "parse_source: called");
    let problems = match format {
        SourceFormat::Tagged => match tagged::parse(text) {
            Ok(blocks) => return Ok(blocks),
            Err(problems) => problems.iter().map(ToString::to_string).collect::<Vec<_>>(),
        },
        SourceFormat::Structured => {
            let document = structured::parse_document(text).map_err(|source| BlockError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
            match structured::extract(&document) {
                Ok(blocks) => return Ok(blocks),
                Err(problems) => problems.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }
        }
    };

    for problem in &problems {
        warn!("{}: {}", path.display(), problem);
    }

    Err(BlockError::BlockFormat {
        file: path.to_path_buf(),
        problems,
    })
}
