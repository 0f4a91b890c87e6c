//! Raw text storage behind scoped documents
//!
//! [`FileStore`] is the only thing a [`ScopedDocument`](crate::ScopedDocument)
//! needs from the file system: read text, write text, and make sure a file
//! exists before the first read. Two adapters ship with the crate:
//!
//! - [`FsStore`]: plain files on disk
//! - [`MemoryStore`]: in-process map with write counting and failure injection

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Text written into a document that does not exist yet
pub const EMPTY_SKELETON: &str = r#"{"Features":{}}"#;

/// Text storage used by scoped documents
pub trait FileStore: Send + Sync {
    /// Read the whole file, `None` when it does not exist
    ///
    /// # Errors
    /// Returns any IO error other than "not found"
    fn read_text(&self, path: &Path) -> io::Result<Option<String>>;

    /// Replace the whole file
    ///
    /// # Errors
    /// Returns the underlying IO error (e.g. the file is locked)
    fn write_text(&self, path: &Path, text: &str) -> io::Result<()>;

    /// Create the file with default content if it is missing
    ///
    /// # Errors
    /// Returns the underlying IO error
    fn ensure_exists(&self, path: &Path) -> io::Result<()>;
}

/// File-system backed store
#[derive(Debug, Clone)]
pub struct FsStore {
    default_text: String,
}

impl FsStore {
    /// Store that seeds missing files with the empty skeleton
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_default_text(EMPTY_SKELETON)
    }

    /// Store that seeds missing files with `text`
    ///
    /// Hosts use this to ship a packaged default document.
    #[inline]
    #[must_use]
    pub fn with_default_text(text: impl Into<String>) -> Self {
        Self {
            default_text: text.into(),
        }
    }

    /// Text used for missing files
    #[inline]
    #[must_use]
    pub fn default_text(&self) -> &str {
        &self.default_text
    }
}

impl Default for FsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore for FsStore {
    fn read_text(&self, path: &Path) -> io::Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write a sibling temp file, then rename it over `path`
    ///
    /// Readers see either the old document or the new one, never a torn one.
    fn write_text(&self, path: &Path, text: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(text.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn ensure_exists(&self, path: &Path) -> io::Result<()> {
        if path.exists() {
            return Ok(());
        }
        tracing::debug!(path = %path.display(), "seeding missing settings document");
        self.write_text(path, &self.default_text)
    }
}

/// In-memory store
///
/// Counts every `write_text` call per path and can be told to fail writes
/// or reads, which is how a locked file looks to a document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<PathBuf, String>>,
    writes: Mutex<HashMap<PathBuf, usize>>,
    total_writes: AtomicUsize,
    fail_writes: AtomicBool,
    failing_reads: AtomicUsize,
}

impl MemoryStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one file
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.lock().insert(path.into(), text.into());
        self
    }

    /// Current content of a file
    #[must_use]
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().get(path.as_ref()).cloned()
    }

    /// Overwrite a file without counting it as a write
    pub fn put(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.lock().insert(path.into(), text.into());
    }

    /// Number of successful writes to one path
    #[must_use]
    pub fn write_count(&self, path: impl AsRef<Path>) -> usize {
        self.writes.lock().get(path.as_ref()).copied().unwrap_or(0)
    }

    /// Number of successful writes across all paths
    #[inline]
    #[must_use]
    pub fn total_writes(&self) -> usize {
        self.total_writes.load(Ordering::SeqCst)
    }

    /// Make every following write fail (or succeed again)
    #[inline]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` reads fail
    #[inline]
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Paths currently held
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.files.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl FileStore for MemoryStore {
    fn read_text(&self, path: &Path) -> io::Result<Option<String>> {
        let failing = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file is locked",
            ));
        }
        Ok(self.files.lock().get(path).cloned())
    }

    fn write_text(&self, path: &Path, text: &str) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file is locked",
            ));
        }
        self.files.lock().insert(path.to_path_buf(), text.to_string());
        *self.writes.lock().entry(path.to_path_buf()).or_insert(0) += 1;
        self.total_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn ensure_exists(&self, path: &Path) -> io::Result<()> {
        self.files
            .lock()
            .entry(path.to_path_buf())
            .or_insert_with(|| EMPTY_SKELETON.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_counts_writes() {
        let store = MemoryStore::new();
        let path = Path::new("a.json");

        store.write_text(path, "{}").unwrap();
        store.write_text(path, "{\"x\":1}").unwrap();

        assert_eq!(store.write_count(path), 2);
        assert_eq!(store.total_writes(), 2);
        assert_eq!(store.contents(path).as_deref(), Some("{\"x\":1}"));
    }

    #[test]
    fn memory_store_failing_writes_keep_old_content() {
        let store = MemoryStore::new().with_file("a.json", "old");
        store.set_fail_writes(true);

        let err = store.write_text(Path::new("a.json"), "new").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(store.contents("a.json").as_deref(), Some("old"));
        assert_eq!(store.total_writes(), 0);
    }

    #[test]
    fn memory_store_ensure_exists_does_not_overwrite() {
        let store = MemoryStore::new().with_file("a.json", "kept");
        store.ensure_exists(Path::new("a.json")).unwrap();
        store.ensure_exists(Path::new("b.json")).unwrap();

        assert_eq!(store.contents("a.json").as_deref(), Some("kept"));
        assert_eq!(store.contents("b.json").as_deref(), Some(EMPTY_SKELETON));
        assert_eq!(store.total_writes(), 0);
    }

    #[test]
    fn fs_store_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new();
        assert!(store.read_text(&dir.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn fs_store_seeds_nested_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("settings.json");
        let store = FsStore::with_default_text("{\"Features\":{\"X\":{}}}");

        store.ensure_exists(&path).unwrap();
        assert_eq!(
            store.read_text(&path).unwrap().as_deref(),
            Some("{\"Features\":{\"X\":{}}}")
        );

        store.write_text(&path, "changed").unwrap();
        store.ensure_exists(&path).unwrap();
        assert_eq!(store.read_text(&path).unwrap().as_deref(), Some("changed"));
    }

    #[test]
    fn memory_store_failing_reads_run_out() {
        let store = MemoryStore::new().with_file("a.json", "kept");
        store.fail_next_reads(1);

        assert!(store.read_text(Path::new("a.json")).is_err());
        assert_eq!(
            store.read_text(Path::new("a.json")).unwrap().as_deref(),
            Some("kept")
        );
    }

    #[test]
    fn fs_store_replaces_whole_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = FsStore::new();

        store.write_text(&path, "{\"Features\":{\"Long\":{\"Text\":\"aaaaaaaaaaaa\"}}}").unwrap();
        store.write_text(&path, "{}").unwrap();

        assert_eq!(store.read_text(&path).unwrap().as_deref(), Some("{}"));
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("settings.json")]);
    }
}
