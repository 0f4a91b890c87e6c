//! Error types for hydration

/// A stored subtree that cannot become a settings instance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HydrateError {
    /// Subtree is not a JSON object
    #[error("stored value for {type_name} is not an object")]
    NotAnObject { type_name: &'static str },
}
