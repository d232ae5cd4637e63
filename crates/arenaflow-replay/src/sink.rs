//! Where saved records go.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

/// Persists record text under a new, unique name.
pub trait RecordSink {
    /// Writes `contents` as a new artifact called `name` (or a variant of
    /// it if that name is taken) and returns where it went. Never
    /// overwrites an existing artifact.
    fn write_new(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf>;
}

/// Writes each record as a file in one directory.
///
/// The write is atomic: data goes to a temp file that is synced and then
/// renamed over a reserved final name. On any failure both the temp file
/// and the reservation are removed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates an empty file at the first free name: `name`, `name-1`, ...
    fn reserve(&self, name: &str) -> io::Result<PathBuf> {
        let mut suffix = 0u32;
        loop {
            let candidate = if suffix == 0 {
                self.root.join(name)
            } else {
                self.root.join(format!("{name}-{suffix}"))
            };
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(_) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

impl RecordSink for DirectorySink {
    fn write_new(&self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let reserved = RemoveOnDrop::new(self.reserve(name)?);
        let mut tmp_name = reserved.path().as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = RemoveOnDrop::new(PathBuf::from(tmp_name));

        let mut file = File::create(tmp.path())?;
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);

        fs::rename(tmp.path(), reserved.path())?;
        tmp.disarm();
        let path = reserved.disarm();
        debug!(path = %path.display(), bytes = contents.len(), "record written");
        Ok(path)
    }
}

/// Deletes a file when dropped unless disarmed.
struct RemoveOnDrop {
    path: Option<PathBuf>,
}

impl RemoveOnDrop {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }

    fn disarm(mut self) -> PathBuf {
        self.path.take().unwrap_or_default()
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = fs::remove_file(path);
        }
    }
}
