use std::{
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

use super::{ImageSource, SourceQueue};
use crate::{CoverError, CoverResult, ImageHandle, LocalConfig, SourceMode};

/// Serves the files of one directory in shuffled order, rescanning when a pass is used up.
pub struct LocalSource {
    directory: PathBuf,
    queue: SourceQueue<PathBuf>,
}

impl LocalSource {
    pub fn new(config: LocalConfig) -> Self {
        Self {
            directory: config.directory,
            queue: SourceQueue::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Point the source at another directory; the current pass is dropped.
    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) {
        let directory = directory.into();
        if directory == self.directory {
            return;
        }
        self.directory = directory;
        self.queue.invalidate();
    }
}

/// List the regular files directly inside `path`, in random order.
pub fn scan_directory(path: &Path) -> CoverResult<Vec<PathBuf>> {
    let entries = fs::read_dir(path).map_err(|err| CoverError::SourceUnavailable {
        kind: SourceMode::Local,
        message: format!("can't read {}: {}", path.display(), err),
    })?;

    let mut files = Vec::new();
    for entry in entries.filter_map(|result| result.ok()) {
        // Skip directories, sockets, pipes etc.
        match entry.file_type() {
            Ok(file_type) if file_type.is_file() => files.push(entry.path()),
            _ => continue,
        }
    }

    if files.is_empty() {
        return Err(CoverError::SourceUnavailable {
            kind: SourceMode::Local,
            message: format!("no files in {}", path.display()),
        });
    }

    fastrand::shuffle(&mut files);
    Ok(files)
}

#[async_trait]
impl ImageSource for LocalSource {
    type Locator = PathBuf;

    fn mode(&self) -> SourceMode {
        SourceMode::Local
    }

    fn queue(&self) -> &SourceQueue<PathBuf> {
        &self.queue
    }

    fn queue_mut(&mut self) -> &mut SourceQueue<PathBuf> {
        &mut self.queue
    }

    async fn load_locators(&self) -> CoverResult<Vec<PathBuf>> {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || scan_directory(&directory))
            .await
            .map_err(|err| CoverError::SourceUnavailable {
                kind: SourceMode::Local,
                message: err.to_string(),
            })?
    }

    async fn resolve(&self, locator: &PathBuf) -> CoverResult<ImageHandle> {
        let bytes = tokio::fs::read(locator).await.map_err(|source| CoverError::ReadFile {
            path: locator.clone(),
            source,
        })?;
        ImageHandle::decode_async(locator.to_string_lossy().replace('\\', "/"), bytes).await
    }
}
