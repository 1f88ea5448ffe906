//! Block loading and rendering error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading blocks or rendering templates
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("Block file {} format is invalid ({} problem(s)): {}", file.display(), problems.len(), problems.join("; "))]
    BlockFormat { file: PathBuf, problems: Vec<String> },

    #[error("Template {template} references block '{block}' which is missing or empty")]
    UnresolvedBlock { template: String, block: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl BlockError {
    /// Wrap an I/O error with the path that produced it
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BlockError::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this error came from malformed block source
    pub fn is_format_error(&self) -> bool {
        matches!(self, BlockError::BlockFormat { .. })
    }

    /// Check if this error is a missing or empty block reference
    pub fn is_unresolved(&self) -> bool {
        matches!(self, BlockError::UnresolvedBlock { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_format_message_lists_problems() {
        let err = BlockError::BlockFormat {
            file: PathBuf::from("blocks/docs.md"),
            problems: vec!["first".to_string(), "second".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("blocks/docs.md"));
        assert!(msg.contains("2 problem(s)"));
        assert!(msg.contains("first; second"));
        assert!(err.is_format_error());
        assert!(!err.is_unresolved());
    }

    #[test]
    fn test_unresolved_message_names_template_and_block() {
        let err = BlockError::UnresolvedBlock {
            template: "agents.md".to_string(),
            block: "intro".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("agents.md"));
        assert!(msg.contains("'intro'"));
        assert!(err.is_unresolved());
    }

    #[test]
    fn test_io_keeps_path() {
        let err = BlockError::io("missing/dir", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.to_string().contains("missing/dir"));
    }
}
