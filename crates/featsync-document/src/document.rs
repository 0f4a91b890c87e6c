//! Scoped settings document
//!
//! Wraps one backing file with a fixed shape: a root object whose `Features`
//! map holds one subtree per feature. Every save is a full read-modify-write
//! of the root that replaces exactly one `Features` key.

use crate::error::{DocumentError, DocumentResult};
use crate::storage::FileStore;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Root key holding the feature map
pub const FEATURES_KEY: &str = "Features";

/// Result of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The whole document was written
    Written,
    /// The write failed; the subtree is pending until the next good write
    Deferred,
}

impl SaveOutcome {
    /// Whether the write reached the backing store
    #[inline]
    #[must_use]
    pub fn is_written(self) -> bool {
        matches!(self, Self::Written)
    }
}

/// One on-disk, multi-feature settings document
pub struct ScopedDocument {
    path: PathBuf,
    store: Arc<dyn FileStore>,
    pretty: bool,
    /// Subtrees whose last write failed, keyed by feature name
    pending: Mutex<BTreeMap<String, Value>>,
}

impl ScopedDocument {
    /// Open the document at `path`, asking the store to create it if missing
    ///
    /// A failure to create the file is logged; reads then degrade to the
    /// empty skeleton and the first successful save creates it.
    pub fn open(store: Arc<dyn FileStore>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Err(e) = store.ensure_exists(&path) {
            tracing::warn!(path = %path.display(), error = %e, "could not create settings document");
        }
        Self {
            path,
            store,
            pretty: true,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Write compact JSON instead of pretty-printed
    #[inline]
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Backing path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empty `{"Features": {}}` root
    #[must_use]
    pub fn skeleton() -> Value {
        let mut root = Map::new();
        root.insert(FEATURES_KEY.to_string(), Value::Object(Map::new()));
        Value::Object(root)
    }

    /// Read and parse the root, surfacing every failure
    ///
    /// An absent or blank file is not an error and yields the skeleton.
    ///
    /// # Errors
    /// - `DocumentError::Io` if the store cannot be read
    /// - `DocumentError::Parse` if the text is not JSON
    pub fn try_read_root(&self) -> DocumentResult<Value> {
        let text = self
            .store
            .read_text(&self.path)
            .map_err(|e| DocumentError::io_error(&self.path, e))?;

        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Ok(Self::skeleton());
        };

        let mut root: Value = serde_json::from_str(&text)
            .map_err(|e| DocumentError::parse_error(&self.path, e))?;
        if !root.is_object() {
            tracing::warn!(path = %self.path.display(), "settings document root is not an object");
            root = Self::skeleton();
        }
        features_mut(&mut root);
        Ok(root)
    }

    /// Read the root, degrading any failure to the empty skeleton
    #[must_use]
    pub fn read_or_default(&self) -> Value {
        match self.try_read_root() {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable settings document, using defaults");
                Self::skeleton()
            }
        }
    }

    /// Subtree for one feature, if the document has it
    ///
    /// A pending subtree wins over the stored one. A read failure is logged
    /// and reads as absent.
    #[must_use]
    pub fn get(&self, feature: &str) -> Option<Value> {
        match self.try_get(feature) {
            Ok(subtree) => subtree,
            Err(e) => {
                tracing::warn!(feature, error = %e, "settings document unreadable");
                None
            }
        }
    }

    /// Subtree for one feature, surfacing read failures
    ///
    /// A pending subtree wins over the stored one; unparsable text reads as
    /// the empty skeleton.
    ///
    /// # Errors
    /// Returns `DocumentError::Io` if the store cannot be read
    pub fn try_get(&self, feature: &str) -> DocumentResult<Option<Value>> {
        if let Some(subtree) = self.pending.lock().get(feature) {
            return Ok(Some(subtree.clone()));
        }
        let mut root = self.load_root()?;
        Ok(features_mut(&mut root).get(feature).cloned())
    }

    /// Names of the features currently in the document, pending ones included
    #[must_use]
    pub fn features(&self) -> Vec<String> {
        let mut root = self.read_or_default();
        let mut names: Vec<String> = features_mut(&mut root).keys().cloned().collect();
        for name in self.pending.lock().keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Replace one feature's subtree and write the whole document back
    ///
    /// Sibling features are kept as read. If the document cannot be read, or
    /// the write fails, nothing is written: the failure is logged and the
    /// subtree is parked as pending. The next successful save on this
    /// document carries it forward.
    pub fn save(&self, feature: &str, value: Value) -> SaveOutcome {
        let mut pending = self.pending.lock();
        let mut root = match self.load_root() {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!(feature, error = %e, "settings read failed, keeping change pending");
                pending.insert(feature.to_string(), value);
                return SaveOutcome::Deferred;
            }
        };
        let features = features_mut(&mut root);

        for (name, subtree) in pending.iter() {
            if name != feature {
                features.insert(name.clone(), subtree.clone());
            }
        }
        features.insert(feature.to_string(), value.clone());

        match self.write_root(&root) {
            Ok(()) => {
                if !pending.is_empty() {
                    tracing::debug!(
                        path = %self.path.display(),
                        carried = pending.len(),
                        "pending settings written"
                    );
                    pending.clear();
                }
                SaveOutcome::Written
            }
            Err(e) => {
                tracing::warn!(feature, error = %e, "settings write failed, keeping change pending");
                pending.insert(feature.to_string(), value);
                SaveOutcome::Deferred
            }
        }
    }

    /// Retry pending subtrees without a new change
    ///
    /// Returns `Written` when nothing is pending.
    pub fn flush(&self) -> SaveOutcome {
        let next = self.pending.lock().iter().next().map(|(k, v)| (k.clone(), v.clone()));
        match next {
            Some((feature, value)) => self.save(&feature, value),
            None => SaveOutcome::Written,
        }
    }

    /// Whether a failed write is waiting to be carried forward
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Raw document text, exactly as stored
    ///
    /// # Errors
    /// Returns `DocumentError::Io` if the store cannot be read
    pub fn read_text(&self) -> DocumentResult<Option<String>> {
        self.store
            .read_text(&self.path)
            .map_err(|e| DocumentError::io_error(&self.path, e))
    }

    /// Replace the whole document with `text`, verbatim
    ///
    /// Drops pending subtrees: the new text supersedes them.
    ///
    /// # Errors
    /// Returns `DocumentError::Io` if the write fails
    pub fn write_text(&self, text: &str) -> DocumentResult<()> {
        let mut pending = self.pending.lock();
        self.store
            .write_text(&self.path, text)
            .map_err(|e| DocumentError::io_error(&self.path, e))?;
        pending.clear();
        Ok(())
    }

    /// Root for a read-modify-write: unparsable text becomes the skeleton,
    /// an unreadable store stays an error
    fn load_root(&self) -> DocumentResult<Value> {
        match self.try_read_root() {
            Err(e @ DocumentError::Parse { .. }) => {
                tracing::warn!(error = %e, "unparsable settings document, starting from empty");
                Ok(Self::skeleton())
            }
            other => other,
        }
    }

    fn write_root(&self, root: &Value) -> DocumentResult<()> {
        let text = if self.pretty {
            serde_json::to_string_pretty(root)?
        } else {
            serde_json::to_string(root)?
        };
        self.store
            .write_text(&self.path, &text)
            .map_err(|e| DocumentError::io_error(&self.path, e))
    }
}

impl fmt::Debug for ScopedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedDocument")
            .field("path", &self.path)
            .field("pretty", &self.pretty)
            .field("pending", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}

/// `Features` map of a root object, replacing it when it is not an object
fn features_mut(root: &mut Value) -> &mut Map<String, Value> {
    if !root.is_object() {
        *root = ScopedDocument::skeleton();
    }
    let Value::Object(root) = root else {
        unreachable!("root was just made an object");
    };
    let features = root
        .entry(FEATURES_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if !features.is_object() {
        *features = Value::Object(Map::new());
    }
    match features {
        Value::Object(map) => map,
        _ => unreachable!("features was just made an object"),
    }
}
