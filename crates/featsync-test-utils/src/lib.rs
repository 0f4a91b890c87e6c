//! Testing utilities for the featsync workspace
//!
//! Shared feature fixtures, engine setup and document assertions.

#![allow(missing_docs)]

use featsync_binder::feature_settings;
use featsync_document::{MemoryStore, PathResolver, Role, Scope};
use featsync_store::{EngineConfig, SettingsEngine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Once};

feature_settings! {
    /// Display options
    pub struct DisplaySettings {
        brightness: f64 = 1.0,
    }
}

feature_settings! {
    /// Audio options
    pub struct AudioSettings {
        volume: i64 = 80,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

feature_settings! {
    /// Options covering every kind of field value
    pub struct GraphicsSettings {
        quality: Quality = Quality::Medium,
        viewport: Viewport = Viewport { width: 1280, height: 720 },
        shader_packs: Vec<String> = Vec::new(),
        label: Option<String> = None,
        scale: f32 = 1.0,
    }
}

/// Install a test log subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn test_config() -> EngineConfig {
    EngineConfig::new()
        .with_root("settings")
        .with_consumer("test")
        .with_pretty(false)
}

/// Engine over a fresh in-memory store
pub fn memory_engine() -> (Arc<MemoryStore>, SettingsEngine) {
    memory_engine_over(Arc::new(MemoryStore::new()))
}

/// Engine over an existing in-memory store, as after a process restart
pub fn memory_engine_over(files: Arc<MemoryStore>) -> (Arc<MemoryStore>, SettingsEngine) {
    init_tracing();
    let engine = SettingsEngine::new(test_config(), files.clone());
    (files, engine)
}

/// Path of the document for (scope, role) under [`test_config`]
pub fn document_path(engine: &SettingsEngine, scope: Scope, role: Role) -> PathBuf {
    let mut layout = engine.config().layout();
    if let Some(session) = engine.session() {
        layout = layout.with_session(session);
    }
    layout.resolve(scope, role, &engine.config().file_name)
}

/// Parsed document for (scope, role)
pub fn stored_document(files: &MemoryStore, engine: &SettingsEngine, scope: Scope, role: Role) -> Value {
    let text = files
        .contents(document_path(engine, scope, role))
        .expect("document exists");
    serde_json::from_str(&text).expect("document is JSON")
}

/// Stored subtree of one feature, rendered compactly
pub fn stored_feature(
    files: &MemoryStore,
    engine: &SettingsEngine,
    scope: Scope,
    role: Role,
    feature: &str,
) -> Option<String> {
    let document = stored_document(files, engine, scope, role);
    document
        .get("Features")
        .and_then(|features| features.get(feature))
        .map(Value::to_string)
}
