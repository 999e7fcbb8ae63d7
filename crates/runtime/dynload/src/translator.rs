//! Reference translator: raw unit → host image.

use bytes::Bytes;
use hotswap_core::{CodeName, LoadError, LoaderConfig, Translator};

use crate::image::{Image, RawUnit};

/// Translates `HSU1` raw units into `HSI1` images.
#[derive(Debug, Clone, Default)]
pub struct UnitTranslator {
    config: LoaderConfig,
}

impl UnitTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }
}

impl Translator for UnitTranslator {
    fn translate(&self, name: &CodeName, raw: Bytes) -> Result<Bytes, LoadError> {
        if self.config.is_unit_oversized(raw.len()) {
            return Err(LoadError::UnitTooLarge {
                size: raw.len(),
                max: self.config.max_unit_size,
            });
        }

        let unit = RawUnit::decode(&raw).map_err(|e| LoadError::Translation(e.to_string()))?;
        // The raw buffer is not needed past this point.
        drop(raw);

        if self.config.strict_name_check && unit.declared_path != name.to_path() {
            return Err(LoadError::Translation(format!(
                "unit declares {} but was defined as {}",
                unit.declared_path,
                name.to_path()
            )));
        }

        Image {
            min_host_api: self.config.min_host_api,
            name: name.as_str().to_string(),
            body: unit.body,
        }
        .encode()
        .map_err(|e| LoadError::Translation(e.to_string()))
    }
}
