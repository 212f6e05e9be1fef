use crate::errors::{ErrorKind, MigrationError, MigrationResult};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Destination of a finished artifact.
///
/// Storing is split in two: [stage](ArtifactSink::stage) keeps the contents
/// out of sight and [publish](ArtifactSink::publish) makes them visible, so
/// a caller can stage several artifacts and publish only when all of them
/// staged.
pub trait ArtifactSink: Send {
    /// Holds the complete artifact without publishing it.
    fn stage(&mut self, contents: &str) -> MigrationResult<()>;

    /// Makes the staged artifact visible. A sink with nothing staged is
    /// left as is.
    fn publish(&mut self) -> MigrationResult<()>;

    /// Drops the staged artifact, and the published one if any.
    fn discard(&mut self);

    /// Human readable destination, used in logs.
    fn describe(&self) -> String;

    /// Stages and publishes in one step.
    fn commit(&mut self, contents: &str) -> MigrationResult<()> {
        self.stage(contents)?;
        self.publish()
    }
}

/// Writes the artifact to a file.
///
/// The contents land in a sibling `.partial` file when staged and are
/// renamed into place on publish, so readers never observe a half written
/// artifact.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    staged: Option<PathBuf>,
    published: bool,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileSink {
            path: path.as_ref().to_path_buf(),
            staged: None,
            published: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn partial_path(&self) -> PathBuf {
        let mut partial = self.path.clone().into_os_string();
        partial.push(".partial");
        PathBuf::from(partial)
    }
}

impl ArtifactSink for FileSink {
    fn stage(&mut self, contents: &str) -> MigrationResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                log::error!("Failed to create directory {}: {}", parent.display(), err);
                MigrationError::new_with_cause(
                    ErrorKind::ResourceError,
                    &format!("cannot create output directory {}", parent.display()),
                    err.into(),
                )
            })?;
        }

        let partial = self.partial_path();
        if let Err(err) = fs::write(&partial, contents) {
            log::error!("Failed to write {}: {}", partial.display(), err);
            let _ = fs::remove_file(&partial);
            return Err(MigrationError::new_with_cause(
                ErrorKind::ResourceError,
                &format!("cannot write artifact {}", self.path.display()),
                err.into(),
            ));
        }

        log::debug!("Staged {} byte(s) for {}", contents.len(), self.path.display());
        self.staged = Some(partial);
        Ok(())
    }

    fn publish(&mut self) -> MigrationResult<()> {
        let Some(partial) = self.staged.take() else {
            return Ok(());
        };
        if let Err(err) = fs::rename(&partial, &self.path) {
            log::error!("Failed to move {} into place: {}", partial.display(), err);
            let _ = fs::remove_file(&partial);
            return Err(MigrationError::new_with_cause(
                ErrorKind::ResourceError,
                &format!("cannot write artifact {}", self.path.display()),
                err.into(),
            ));
        }
        self.published = true;
        log::debug!("Published {}", self.path.display());
        Ok(())
    }

    fn discard(&mut self) {
        if let Some(partial) = self.staged.take() {
            let _ = fs::remove_file(&partial);
        }
        if self.published {
            self.published = false;
            if let Err(err) = fs::remove_file(&self.path) {
                log::warn!("Failed to remove {}: {}", self.path.display(), err);
            }
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps the artifact in memory. Clones share the published buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    label: String,
    staged: Option<String>,
    published: bool,
    buffer: Arc<Mutex<Option<String>>>,
}

impl BufferSink {
    pub fn new(label: &str) -> Self {
        BufferSink {
            label: label.to_string(),
            staged: None,
            published: false,
            buffer: Arc::new(Mutex::new(None)),
        }
    }

    /// The published artifact, if any.
    pub fn contents(&self) -> Option<String> {
        self.buffer.lock().clone()
    }
}

impl ArtifactSink for BufferSink {
    fn stage(&mut self, contents: &str) -> MigrationResult<()> {
        self.staged = Some(contents.to_string());
        Ok(())
    }

    fn publish(&mut self) -> MigrationResult<()> {
        if let Some(contents) = self.staged.take() {
            *self.buffer.lock() = Some(contents);
            self.published = true;
        }
        Ok(())
    }

    fn discard(&mut self) {
        self.staged = None;
        if self.published {
            self.published = false;
            *self.buffer.lock() = None;
        }
    }

    fn describe(&self) -> String {
        format!("buffer '{}'", self.label)
    }
}
