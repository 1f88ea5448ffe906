//! Template rendering
//!
//! Templates contain `${name}` placeholders. Each placeholder is replaced by
//! the content of the block with that name, in a single left-to-right pass.
//! Substituted content is never re-scanned.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error, info};

use crate::blocks::{BlockMap, NAME_PATTERN};
use crate::config::{BatchPolicy, Config};
use crate::error::BlockError;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\$\{{{NAME_PATTERN}\}}")).expect("placeholder regex is valid"));

// "${" + name + "}"
fn placeholder_name(token: &str) -> &str {
    &token[2..token.len() - 1]
}

/// Names referenced by a template, in order of appearance
pub fn placeholders(content: &str) -> Vec<&str> {
    PLACEHOLDER_RE
        .find_iter(content)
        .map(|m| placeholder_name(m.as_str()))
        .collect()
}

/// Render one template against a block mapping
///
/// Fails on the first placeholder whose block is missing or empty; no partial
/// output is returned.
pub fn render(template_name: &str, content: &str, blocks: &BlockMap) -> Result<String, BlockError> {
    debug!(%template_name, len = content.len(), "render: called");
    let mut out = String::with_capacity(content.len());
    let mut last = 0;

    for m in PLACEHOLDER_RE.find_iter(content) {
        let name = placeholder_name(m.as_str());
        let block = blocks
            .get(name)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| BlockError::UnresolvedBlock {
                template: template_name.to_string(),
                block: name.to_string(),
            })?;
        out.push_str(&content[last..m.start()]);
        out.push_str(block);
        last = m.end();
    }

    out.push_str(&content[last..]);
    Ok(out)
}

/// A template that failed to render
#[derive(Debug)]
pub struct RenderFailure {
    pub template: String,
    pub error: BlockError,
}

/// Outcome of rendering a directory of templates
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Output files written, in render order
    pub rendered: Vec<PathBuf>,
    /// Templates that failed, in render order
    pub failures: Vec<RenderFailure>,
    /// Templates not attempted because the batch aborted
    pub skipped: Vec<String>,
}

impl RenderReport {
    /// True when every template rendered
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    /// One line per failure
    pub fn failure_lines(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.error.to_string()).collect()
    }
}

/// Renders every template in a directory into an output directory
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates_dir: PathBuf,
    rendered_dir: PathBuf,
    extensions: Vec<String>,
    policy: BatchPolicy,
}

impl TemplateRenderer {
    /// Create a renderer for the given directories
    pub fn new(
        templates_dir: impl Into<PathBuf>,
        rendered_dir: impl Into<PathBuf>,
        extensions: Vec<String>,
        policy: BatchPolicy,
    ) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            rendered_dir: rendered_dir.into(),
            extensions,
            policy,
        }
    }

    /// Create a renderer from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.templates_dir.clone(),
            config.rendered_dir.clone(),
            config.template_extensions.clone(),
            config.batch_policy,
        )
    }

    /// Check whether a path has a template extension
    pub fn is_template(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// List template files, sorted by name
    pub fn templates(&self) -> Result<Vec<PathBuf>, BlockError> {
        let entries = fs::read_dir(&self.templates_dir).map_err(|e| BlockError::io(&self.templates_dir, e))?;
        let mut templates = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BlockError::io(&self.templates_dir, e))?.path();
            if path.is_file() && self.is_template(&path) {
                templates.push(path);
            }
        }
        templates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(templates)
    }

    /// Render every template
    ///
    /// Listing the template directory or creating the output directory are
    /// fatal. Per-template failures are collected in the report; with
    /// [`BatchPolicy::Abort`] the remaining templates are skipped.
    pub fn render_all(&self, blocks: &BlockMap) -> Result<RenderReport, BlockError> {
        let templates = self.templates()?;
        fs::create_dir_all(&self.rendered_dir).map_err(|e| BlockError::io(&self.rendered_dir, e))?;
        debug!(count = templates.len(), policy = ?self.policy, "TemplateRenderer::render_all: called");

        let mut report = RenderReport::default();
        let mut remaining = templates.iter();

        for path in remaining.by_ref() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match self.render_file(path, &name, blocks) {
                Ok(output) => report.rendered.push(output),
                Err(e) => {
                    error!("Failed to render {}: {}", name, e);
                    report.failures.push(RenderFailure {
                        template: name,
                        error: e,
                    });
                    if self.policy == BatchPolicy::Abort {
                        break;
                    }
                }
            }
        }

        report.skipped = remaining
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        Ok(report)
    }

    fn render_file(&self, path: &Path, name: &str, blocks: &BlockMap) -> Result<PathBuf, BlockError> {
        let content = fs::read_to_string(path).map_err(|e| BlockError::io(path, e))?;
        let rendered = render(name, &content, blocks)?;
        // `name` is lossy; the output keeps the template's exact file name
        let filename = path.file_name().unwrap_or(path.as_os_str());
        self.save_rendered(filename, name, &rendered)
    }

    fn save_rendered(&self, filename: &OsStr, display_name: &str, content: &str) -> Result<PathBuf, BlockError> {
        let output = self.rendered_dir.join(filename);
        fs::write(&output, content).map_err(|e| BlockError::io(&output, e))?;
        info!("Rendered file {} saved", display_name);
        Ok(output)
    }
}
