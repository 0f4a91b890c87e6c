//! The contract between settings types and the store
//!
//! Implemented by [`feature_settings!`](crate::feature_settings); writing it
//! by hand is possible but every setter must call
//! [`WriteHook::notify`](crate::WriteHook::notify) after storing the value.

use crate::error::HydrateError;
use crate::hook::WriteHook;
use serde_json::Value;

/// A plain, default-constructible settings shape whose writes can be observed
pub trait FeatureSettings: Sized + Send + Sync + 'static {
    /// Rust type name
    const TYPE_NAME: &'static str;

    /// Names of every mutable field, as passed to write handlers
    const FIELDS: &'static [&'static str];

    /// Instance holding default values
    fn defaults() -> Self;

    /// Build an instance from a stored subtree
    ///
    /// Missing or malformed fields take their defaults.
    ///
    /// # Errors
    /// Returns `HydrateError::NotAnObject` if `value` is not an object
    fn from_value(value: &Value) -> Result<Self, HydrateError>;

    /// Replace every field from a stored subtree without notifying the hook
    ///
    /// # Errors
    /// Returns `HydrateError::NotAnObject` if `value` is not an object; the
    /// instance is left unchanged
    fn hydrate(&self, value: &Value) -> Result<(), HydrateError>;

    /// Serialized form stored under the feature's key
    fn to_value(&self) -> Value;

    /// Current value of one field, `None` for unknown names
    fn field_value(&self, field: &str) -> Option<Value>;

    /// Hook notified by every setter
    fn write_hook(&self) -> &WriteHook;

    /// Feature name used when none is given: the type name without a
    /// trailing `Settings`
    #[must_use]
    fn default_feature_name() -> &'static str {
        match Self::TYPE_NAME.strip_suffix("Settings") {
            Some(stem) if !stem.is_empty() => stem,
            _ => Self::TYPE_NAME,
        }
    }
}
