//! Collaborator seams.
//!
//! `hotswap-core` defines these interfaces; `hotswap-dynload` (or an
//! embedder) provides the implementations. This keeps the cache/guard/
//! resolver machinery free of any particular byte format or host runtime.

use std::sync::Arc;

use bytes::Bytes;

use crate::artifact::LoadedArtifact;
use crate::error::LoadError;
use crate::name::CodeName;
use crate::resolver::Resolve;

/// Translates a raw compiled unit into an image the host can instantiate.
///
/// Implementations must be pure: the same input yields the same image or
/// the same failure, and nothing is retained between calls.
pub trait Translator: Send + Sync {
    fn translate(&self, name: &CodeName, raw: Bytes) -> Result<Bytes, LoadError>;
}

/// Host primitive that builds an isolated execution context from an image.
pub trait Host: Send + Sync {
    /// Build a fresh context seeded with `image`, delegating to `parent`.
    ///
    /// The image is consumed; the host must not keep it past the lifetime of
    /// the returned context.
    fn instantiate(
        &self,
        image: Bytes,
        parent: Arc<dyn Resolve>,
    ) -> Result<Box<dyn ExecutionContext>, LoadError>;
}

/// An isolated execution context created by a [`Host`].
pub trait ExecutionContext: std::fmt::Debug {
    /// Resolve `name`, parent first, then from the context's own image.
    ///
    /// `Ok(None)` means the context nominally loaded the unit but produced
    /// nothing usable. `Err(LoadError::NotFound)` means neither the parent
    /// nor the image defines it.
    fn load(&self, name: &CodeName) -> Result<Option<Arc<LoadedArtifact>>, LoadError>;
}
