//! Reference host: instantiates `HSI1` images in memory.
//!
//! Each image gets its own [`InMemoryContext`]. A context resolves names
//! parent-first and only falls back to its own image when the parent
//! reports `NotFound`, which is why the loader needs the redefinition guard:
//! without it the parent would answer with the previous definition.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use hotswap_core::{CodeName, ExecutionContext, Host, LoadError, LoadedArtifact, Resolve};

use crate::image::Image;

/// Default API level of the in-memory host.
pub const DEFAULT_HOST_API: u16 = 26;

/// Payload of artifacts built by [`InMemoryHost`]: the unit body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitBody(pub Bytes);

#[derive(Debug, Clone, Copy)]
pub struct InMemoryHost {
    api_level: u16,
}

impl InMemoryHost {
    pub fn new(api_level: u16) -> Self {
        Self { api_level }
    }

    pub fn api_level(&self) -> u16 {
        self.api_level
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new(DEFAULT_HOST_API)
    }
}

impl Host for InMemoryHost {
    fn instantiate(
        &self,
        image: Bytes,
        parent: Arc<dyn Resolve>,
    ) -> Result<Box<dyn ExecutionContext>, LoadError> {
        let image_size = image.len();
        let decoded =
            Image::decode(&image).map_err(|e| LoadError::Instantiation(e.to_string()))?;
        drop(image);

        if decoded.min_host_api > self.api_level {
            return Err(LoadError::Instantiation(format!(
                "image requires host API {} but host provides {}",
                decoded.min_host_api, self.api_level
            )));
        }
        let unit_name = CodeName::new(&decoded.name)
            .map_err(|e| LoadError::Instantiation(e.to_string()))?;

        Ok(Box::new(InMemoryContext {
            parent,
            unit_name,
            body: decoded.body,
            image_size,
            loaded: OnceLock::new(),
        }))
    }
}

/// Isolated context holding the single unit of one image.
pub struct InMemoryContext {
    parent: Arc<dyn Resolve>,
    unit_name: CodeName,
    body: Bytes,
    image_size: usize,
    /// The context defines its unit at most once.
    loaded: OnceLock<Arc<LoadedArtifact>>,
}

impl ExecutionContext for InMemoryContext {
    fn load(&self, name: &CodeName) -> Result<Option<Arc<LoadedArtifact>>, LoadError> {
        let not_found = match self.parent.resolve(name) {
            Ok(artifact) => return Ok(Some(artifact)),
            Err(not_found) => not_found,
        };

        if *name != self.unit_name {
            return Err(not_found.into());
        }

        let artifact = self.loaded.get_or_init(|| {
            Arc::new(LoadedArtifact::new(
                name.clone(),
                self.image_size,
                UnitBody(self.body.clone()),
            ))
        });
        Ok(Some(Arc::clone(artifact)))
    }
}

impl std::fmt::Debug for InMemoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContext")
            .field("unit_name", &self.unit_name)
            .field("image_size", &self.image_size)
            .field("loaded", &self.loaded.get().map(|a| a.id()))
            .finish()
    }
}
