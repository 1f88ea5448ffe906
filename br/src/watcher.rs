//! Re-render on file changes
//!
//! Watches the block and template directories (non-recursively) and runs a
//! full render cycle for each qualifying change. Render failures are logged
//! and watching continues.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::cycle::RenderCycle;
use crate::error::BlockError;

/// How often the stop flag is checked while waiting for events
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Decides which file events should trigger a render cycle
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    blocks_dir: PathBuf,
    templates_dir: PathBuf,
    block_extensions: Vec<String>,
    template_extensions: Vec<String>,
}

impl ChangeFilter {
    pub fn new(
        blocks_dir: impl Into<PathBuf>,
        templates_dir: impl Into<PathBuf>,
        block_extensions: Vec<String>,
        template_extensions: Vec<String>,
    ) -> Self {
        Self {
            blocks_dir: blocks_dir.into(),
            templates_dir: templates_dir.into(),
            block_extensions,
            template_extensions,
        }
    }

    /// Build a filter for a cycle, resolving directories to absolute paths
    pub fn for_cycle(cycle: &RenderCycle) -> Result<Self, BlockError> {
        let config = cycle.config();
        let canonical = |dir: &Path| dir.canonicalize().map_err(|e| BlockError::io(dir, e));
        Ok(Self::new(
            canonical(&config.blocks_dir)?,
            canonical(&config.templates_dir)?,
            config.block_extensions().map(str::to_string).collect(),
            config.template_extensions.clone(),
        ))
    }

    pub fn blocks_dir(&self) -> &Path {
        &self.blocks_dir
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    /// Check whether a single path is a watched source or template
    pub fn is_relevant(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        // Editor swap and backup files
        if path_str.contains(".tmp.") || path_str.ends_with('~') || path_str.ends_with(".swp") {
            return false;
        }

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let parent = path.parent();

        (parent == Some(self.blocks_dir.as_path()) && self.block_extensions.iter().any(|e| e == ext))
            || (parent == Some(self.templates_dir.as_path()) && self.template_extensions.iter().any(|e| e == ext))
    }

    /// Check whether an event should trigger a render cycle
    pub fn qualifies(&self, event: &Event) -> bool {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                event.paths.iter().any(|p| self.is_relevant(p))
            }
            _ => false,
        }
    }
}

/// Watch for changes and re-render until `stop` is set
///
/// Runs one cycle immediately, then one per qualifying event. Events are not
/// debounced beyond what the platform notifier coalesces.
pub fn watch(cycle: &mut RenderCycle, stop: &AtomicBool) -> Result<(), BlockError> {
    let filter = ChangeFilter::for_cycle(cycle)?;

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
    watcher.watch(filter.blocks_dir(), RecursiveMode::NonRecursive)?;
    watcher.watch(filter.templates_dir(), RecursiveMode::NonRecursive)?;
    info!(
        "Watching {} and {} for changes (Ctrl+C to stop)",
        filter.blocks_dir().display(),
        filter.templates_dir().display()
    );

    cycle.run_logged();

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(STOP_POLL_INTERVAL) {
            Ok(Ok(event)) => {
                if filter.qualifies(&event) {
                    debug!(paths = ?event.paths, kind = ?event.kind, "watch: change detected");
                    info!("Change detected, re-rendering");
                    cycle.run_logged();
                }
            }
            Ok(Err(e)) => warn!("Watch error: {}", e),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Watch channel closed");
                break;
            }
        }
    }

    info!("Stopped watching");
    Ok(())
}
