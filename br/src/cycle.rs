//! One full load-then-render pass

use tracing::{debug, error, info};

use crate::blocks::BlockLoader;
use crate::config::Config;
use crate::error::BlockError;
use crate::render::{RenderReport, TemplateRenderer};

/// Owns the loader cache and renderer for repeated render cycles
#[derive(Debug)]
pub struct RenderCycle {
    config: Config,
    loader: BlockLoader,
    renderer: TemplateRenderer,
}

impl RenderCycle {
    pub fn new(config: Config) -> Self {
        debug!(?config, "RenderCycle::new: called");
        let loader = BlockLoader::from_config(&config);
        let renderer = TemplateRenderer::from_config(&config);
        Self {
            config,
            loader,
            renderer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn loader(&self) -> &BlockLoader {
        &self.loader
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Load blocks (cached when unchanged) and render every template
    ///
    /// A block load failure aborts the cycle before any template is touched.
    pub fn run(&mut self) -> Result<RenderReport, BlockError> {
        let blocks = self.loader.load()?;
        self.renderer.render_all(&blocks)
    }

    /// Run a cycle and log the outcome instead of returning it
    ///
    /// Returns true when every template rendered.
    pub fn run_logged(&mut self) -> bool {
        match self.run() {
            Ok(report) if report.is_success() => {
                info!("Render cycle complete: {} file(s) rendered", report.rendered.len());
                true
            }
            Ok(report) => {
                error!(
                    "Render cycle finished with {} failure(s), {} rendered, {} skipped",
                    report.failures.len(),
                    report.rendered.len(),
                    report.skipped.len()
                );
                false
            }
            Err(e) => {
                error!("Render cycle failed: {}", e);
                false
            }
        }
    }
}
