//! Code unit names.

use std::fmt;
use std::sync::Arc;

use crate::error::LoadError;

/// File extension of a raw code unit when addressed by path.
pub const UNIT_FILE_EXTENSION: &str = ".unit";

/// Logical name of a code unit, in dotted form (`pkg.sub.Foo`).
///
/// Names compare by exact string equality; `pkg.Foo` and `pkg/Foo` are
/// different names unless the latter went through [`CodeName::from_path`].
/// Cloning is cheap (shared string).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeName(Arc<str>);

impl CodeName {
    /// Build a name from its dotted form.
    ///
    /// Rejects empty names and names with empty segments (`pkg..Foo`, `.Foo`).
    pub fn new(name: impl AsRef<str>) -> Result<Self, LoadError> {
        let name = name.as_ref();
        if name.is_empty() || name.split('.').any(str::is_empty) {
            return Err(LoadError::InvalidName(name.to_string()));
        }
        Ok(Self(Arc::from(name)))
    }

    /// Build a name from a unit path such as `pkg/sub/Foo.unit`.
    pub fn from_path(path: &str) -> Result<Self, LoadError> {
        let stem = path.strip_suffix(UNIT_FILE_EXTENSION).unwrap_or(path);
        Self::new(stem.replace('/', "."))
    }

    /// Path form of the name: `pkg.sub.Foo` → `pkg/sub/Foo.unit`.
    pub fn to_path(&self) -> String {
        let mut path = self.0.replace('.', "/");
        path.push_str(UNIT_FILE_EXTENSION);
        path
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeName({:?})", &*self.0)
    }
}

impl AsRef<str> for CodeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
