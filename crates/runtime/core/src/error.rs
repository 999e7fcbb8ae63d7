//! Error types for loading and resolving code units.

use crate::name::CodeName;

/// A resolver in the chain does not know the name.
///
/// This is a control value, not a failure: the caller moves on to the next
/// resolver. Only exhausting the whole chain makes it meaningful.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("code unit not found: {0}")]
pub struct NotFound(pub CodeName);

/// Errors raised by a single step of loading a code unit.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The translator rejected the raw unit (malformed or unsupported).
    #[error("translation failed: {0}")]
    Translation(String),

    /// Raw unit exceeds the configured maximum size.
    #[error("code unit too large: {size} bytes (max {max})")]
    UnitTooLarge {
        /// Actual raw unit size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// The host could not build an execution context from the image.
    #[error("instantiation failed: {0}")]
    Instantiation(String),

    /// The context was built but produced no artifact for the name.
    #[error("empty load result")]
    EmptyResult,

    /// Neither the context's image nor its parents define the name.
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// The calling thread is already (re)defining another unit.
    #[error("definition of {in_flight} already in flight on this thread")]
    DefinitionInFlight {
        /// Name currently being defined by this thread.
        in_flight: CodeName,
    },

    /// The name is not a valid dotted identifier.
    #[error("invalid code unit name: {0:?}")]
    InvalidName(String),
}

/// Failure of `define`, carrying the name and the step that failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to define {name}: {cause}")]
pub struct DefinitionError {
    pub name: CodeName,
    #[source]
    pub cause: LoadError,
}

impl DefinitionError {
    pub fn new(name: CodeName, cause: LoadError) -> Self {
        Self { name, cause }
    }

    /// Whether the raw unit itself was rejected (as opposed to the host).
    pub fn is_translation(&self) -> bool {
        matches!(
            self.cause,
            LoadError::Translation(_) | LoadError::UnitTooLarge { .. }
        )
    }
}
