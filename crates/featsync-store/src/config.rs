//! Engine configuration

use featsync_document::DirectoryLayout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory for every settings document
    pub root: PathBuf,
    /// Consumer owning the durable and session documents
    pub consumer: String,
    /// Document file name inside each scope directory
    pub file_name: String,
    /// Pretty-print written documents
    pub pretty: bool,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With root directory
    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// With consumer id
    #[inline]
    #[must_use]
    pub fn with_consumer(mut self, consumer: impl Into<String>) -> Self {
        self.consumer = consumer.into();
        self
    }

    /// With document file name
    #[inline]
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// With pretty printing on or off
    #[inline]
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Path resolver for this configuration
    #[inline]
    #[must_use]
    pub fn layout(&self) -> DirectoryLayout {
        DirectoryLayout::new(&self.root, &self.consumer)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("settings"),
            consumer: "default".to_string(),
            file_name: "settings.json".to_string(),
            pretty: true,
        }
    }
}
