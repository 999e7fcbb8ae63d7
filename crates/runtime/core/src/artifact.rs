//! Loaded artifacts.
//!
//! A `LoadedArtifact` is what a host produces after instantiating an image.
//! It is always handed out as `Arc<LoadedArtifact>`: the execution context
//! that built it and any caller keep it alive; the code cache only holds a
//! `Weak` to it.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::name::CodeName;

static NEXT_ARTIFACT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a loaded artifact.
///
/// Ids increase monotonically, so a redefinition always carries a larger id
/// than the artifact it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(u64);

impl ArtifactId {
    fn next() -> Self {
        Self(NEXT_ARTIFACT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live, host-specific representation of a defined code unit.
pub struct LoadedArtifact {
    id: ArtifactId,
    name: CodeName,
    /// Size of the image the artifact was instantiated from (for metrics).
    pub image_size: usize,
    /// Host-specific payload. The host that created the artifact knows its
    /// concrete type; everyone else treats it as opaque.
    payload: Box<dyn Any + Send + Sync>,
}

impl LoadedArtifact {
    /// Create an artifact with a fresh [`ArtifactId`].
    pub fn new<P>(name: CodeName, image_size: usize, payload: P) -> Self
    where
        P: Any + Send + Sync,
    {
        Self {
            id: ArtifactId::next(),
            name,
            image_size,
            payload: Box::new(payload),
        }
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn name(&self) -> &CodeName {
        &self.name
    }

    /// Downcast the host payload.
    pub fn payload<P: Any>(&self) -> Option<&P> {
        self.payload.downcast_ref::<P>()
    }
}

impl fmt::Debug for LoadedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedArtifact")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("image_size", &self.image_size)
            .finish_non_exhaustive()
    }
}
