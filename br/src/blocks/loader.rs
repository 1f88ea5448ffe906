//! Block loader with modification-time caching

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info};

use super::{BlockMap, SourceFormat, parse_source};
use crate::config::Config;
use crate::error::BlockError;

/// Loads every block source in a directory into one [`BlockMap`]
///
/// The loader remembers the path and modification time of every source it
/// parsed. While that snapshot is unchanged, [`BlockLoader::load`] returns the
/// cached mapping without reading anything. Any difference invalidates the
/// cache, including a file replaced by one with an older mtime.
#[derive(Debug)]
pub struct BlockLoader {
    dir: PathBuf,
    tagged_extensions: Vec<String>,
    structured_extensions: Vec<String>,
    cache: Option<Arc<BlockMap>>,
    snapshot: Vec<(PathBuf, SystemTime)>,
    parse_count: usize,
}

impl BlockLoader {
    /// Create a loader for the given directory and extension sets
    pub fn new(dir: impl Into<PathBuf>, tagged_extensions: Vec<String>, structured_extensions: Vec<String>) -> Self {
        let dir = dir.into();
        debug!(?dir, ?tagged_extensions, ?structured_extensions, "BlockLoader::new: called");
        Self {
            dir,
            tagged_extensions,
            structured_extensions,
            cache: None,
            snapshot: Vec::new(),
            parse_count: 0,
        }
    }

    /// Create a loader from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.blocks_dir.clone(),
            config.tagged_extensions.clone(),
            config.structured_extensions.clone(),
        )
    }

    /// Directory this loader reads from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of times sources have actually been parsed
    pub fn parse_count(&self) -> usize {
        self.parse_count
    }

    /// Drop the cached mapping so the next load re-parses
    pub fn invalidate(&mut self) {
        debug!("BlockLoader::invalidate: called");
        self.cache = None;
        self.snapshot.clear();
    }

    /// Determine the encoding for a path from its extension
    pub fn format_for(&self, path: &Path) -> Option<SourceFormat> {
        let ext = path.extension()?.to_str()?;
        if self.tagged_extensions.iter().any(|e| e == ext) {
            Some(SourceFormat::Tagged)
        } else if self.structured_extensions.iter().any(|e| e == ext) {
            Some(SourceFormat::Structured)
        } else {
            None
        }
    }

    /// List source files in the directory, sorted by name
    pub fn sources(&self) -> Result<Vec<(PathBuf, SourceFormat)>, BlockError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| BlockError::io(&self.dir, e))?;
        let mut sources = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BlockError::io(&self.dir, e))?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(format) = self.format_for(&path) {
                sources.push((path, format));
            }
        }
        sources.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
        debug!(count = sources.len(), "BlockLoader::sources: listed");
        Ok(sources)
    }

    /// Load the merged mapping, reusing the cache when nothing has changed
    pub fn load(&mut self) -> Result<Arc<BlockMap>, BlockError> {
        debug!(dir = ?self.dir, "BlockLoader::load: called");
        let sources = self.sources()?;
        let snapshot = snapshot(&sources)?;

        if let Some(cached) = &self.cache {
            if snapshot == self.snapshot {
                debug!("BlockLoader::load: sources unchanged, using cache");
                return Ok(Arc::clone(cached));
            }
            debug!("BlockLoader::load: sources changed, re-parsing");
        }

        let blocks = Arc::new(load_blocks(&sources)?);
        self.parse_count += 1;
        self.cache = Some(Arc::clone(&blocks));
        self.snapshot = snapshot;
        info!("Loaded {} blocks from {} source file(s)", blocks.len(), sources.len());
        Ok(blocks)
    }
}

fn snapshot(sources: &[(PathBuf, SourceFormat)]) -> Result<Vec<(PathBuf, SystemTime)>, BlockError> {
    sources
        .iter()
        .map(|(path, _)| {
            fs::metadata(path)
                .and_then(|m| m.modified())
                .map(|modified| (path.clone(), modified))
                .map_err(|e| BlockError::io(path, e))
        })
        .collect()
}

/// Parse and merge the given sources in order
///
/// Later sources overwrite earlier ones on name collision. The first invalid
/// source fails the whole load.
pub fn load_blocks(sources: &[(PathBuf, SourceFormat)]) -> Result<BlockMap, BlockError> {
    let mut blocks = BlockMap::new();
    for (path, format) in sources {
        let text = fs::read_to_string(path).map_err(|e| BlockError::io(path, e))?;
        let file_blocks = parse_source(path, &text, *format)?;
        debug!(?path, count = file_blocks.len(), "load_blocks: merged file");
        blocks.extend(file_blocks);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn loader(dir: &Path) -> BlockLoader {
        BlockLoader::new(
            dir,
            vec!["md".to_string(), "txt".to_string()],
            vec!["yaml".to_string(), "yml".to_string()],
        )
    }

    fn set_mtime(path: &Path, modified: SystemTime) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    fn touch_forward(path: &Path, secs: u64) {
        set_mtime(path, SystemTime::now() + Duration::from_secs(secs));
    }

    #[test]
    fn test_load_merges_both_encodings() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.md"), "<!intro>Hi<!/intro>").unwrap();
        fs::write(temp.path().join("b.yaml"), "steps:\n  - one\n  - two\n").unwrap();
        fs::write(temp.path().join("notes.json"), "{}").unwrap();

        let blocks = loader(temp.path()).load().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks["intro"], "Hi");
        assert_eq!(blocks["steps"], "one\n\ntwo");
    }

    #[test]
    fn test_later_file_overwrites_earlier() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("01-base.md"), "<!x>base<!/x><!y>only base<!/y>").unwrap();
        fs::write(temp.path().join("02-override.yml"), "x: override\n").unwrap();

        let blocks = loader(temp.path()).load().unwrap();
        assert_eq!(blocks["x"], "override");
        assert_eq!(blocks["y"], "only base");
    }

    #[test]
    fn test_sources_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("c.md"), "").unwrap();
        fs::write(temp.path().join("a.yml"), "").unwrap();
        fs::write(temp.path().join("b.png"), "").unwrap();
        fs::create_dir(temp.path().join("sub.md")).unwrap();

        let sources = loader(temp.path()).sources().unwrap();
        let names = sources
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.yml", "c.md"]);
        assert_eq!(sources[0].1, SourceFormat::Structured);
        assert_eq!(sources[1].1, SourceFormat::Tagged);
    }

    #[test]
    fn test_invalid_file_fails_whole_load() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.md"), "<!good>ok<!/good>").unwrap();
        fs::write(temp.path().join("b.md"), "<!bad>never closed").unwrap();

        let err = loader(temp.path()).load().unwrap_err();
        assert!(matches!(err, BlockError::BlockFormat { ref file, .. } if file.ends_with("b.md")));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = loader(&temp.path().join("nope")).load().unwrap_err();
        assert!(matches!(err, BlockError::Io { ref path, .. } if path.ends_with("nope")));
    }

    #[test]
    fn test_cache_reused_when_unchanged() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.md"), "<!x>1<!/x>").unwrap();

        let mut loader = loader(temp.path());
        let first = loader.load().unwrap();
        let second = loader.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.parse_count(), 1);
    }

    #[test]
    fn test_cache_invalidated_by_newer_mtime() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.md");
        fs::write(&path, "<!x>1<!/x>").unwrap();

        let mut loader = loader(temp.path());
        loader.load().unwrap();

        fs::write(&path, "<!x>2<!/x>").unwrap();
        touch_forward(&path, 5);

        let blocks = loader.load().unwrap();
        assert_eq!(blocks["x"], "2");
        assert_eq!(loader.parse_count(), 2);
    }

    #[test]
    fn test_cache_invalidated_by_older_mtime() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.md");
        fs::write(&path, "<!x>1<!/x>").unwrap();

        let mut loader = loader(temp.path());
        assert_eq!(loader.load().unwrap()["x"], "1");

        // a restored backup carries its original, older timestamp
        fs::write(&path, "<!x>2<!/x>").unwrap();
        set_mtime(&path, SystemTime::now() - Duration::from_secs(3600));

        let blocks = loader.load().unwrap();
        assert_eq!(blocks["x"], "2");
        assert_eq!(loader.parse_count(), 2);
    }

    #[test]
    fn test_cache_invalidated_by_removed_source() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.md"), "<!x>1<!/x>").unwrap();
        fs::write(temp.path().join("b.md"), "<!y>2<!/y>").unwrap();

        let mut loader = loader(temp.path());
        assert_eq!(loader.load().unwrap().len(), 2);

        fs::remove_file(temp.path().join("b.md")).unwrap();
        let blocks = loader.load().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(loader.parse_count(), 2);
    }

    #[test]
    fn test_invalidate_forces_reparse() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.md"), "<!x>1<!/x>").unwrap();

        let mut loader = loader(temp.path());
        loader.load().unwrap();
        loader.invalidate();
        loader.load().unwrap();
        assert_eq!(loader.parse_count(), 2);
    }

    #[test]
    fn test_failed_load_keeps_failing_until_fixed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.md");
        fs::write(&path, "<!x>1<!/x>").unwrap();

        let mut loader = loader(temp.path());
        loader.load().unwrap();

        fs::write(&path, "<!x>1").unwrap();
        touch_forward(&path, 5);
        assert!(loader.load().is_err());
        assert!(loader.load().is_err());

        fs::write(&path, "<!x>3<!/x>").unwrap();
        touch_forward(&path, 10);
        assert_eq!(loader.load().unwrap()["x"], "3");
    }
}
