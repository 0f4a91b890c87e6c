//! Featsync Document Layer
//!
//! The boundary between observable feature settings and the files that hold
//! them. One [`ScopedDocument`] wraps one on-disk document per (scope, role)
//! pair; every document has the same shape:
//!
//! ```text
//! { "Features": { "Display": { "Brightness": 0.5 }, "Audio": { "Volume": 80 } } }
//! ```
//!
//! # Architecture
//!
//! ```text
//! (Scope, Role) → PathResolver → path → ScopedDocument ⇄ FileStore ⇄ disk
//! ```
//!
//! Writing one feature replaces only that feature's key; sibling features are
//! carried over verbatim. Unreadable documents degrade to the empty skeleton,
//! failed writes are logged and kept as pending until the next good write.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod layout;
pub mod scope;
pub mod storage;

pub use document::{SaveOutcome, ScopedDocument, FEATURES_KEY};
pub use error::{DocumentError, DocumentResult};
pub use layout::{DirectoryLayout, PathResolver};
pub use scope::{Role, Scope, SessionId};
pub use storage::{FileStore, FsStore, MemoryStore, EMPTY_SKELETON};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
