//! Access to other files' published exports.

use crate::error::{ReduceError, ReduceResult};
use crate::members::ModuleMembers;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// What a reduction needs from the outside world to follow `@import`s.
pub trait ModuleRegistry: Send + Sync {
    /// File that `specifier`, written in `from`, refers to.
    fn resolve(&self, from: &Path, specifier: &str) -> ReduceResult<PathBuf>;

    /// Export table of an already reduced file.
    fn exports(&self, file: &Path) -> Option<Arc<ModuleMembers>>;
}

/// `./x` and `../x` resolve against the importing file's directory; other
/// specifiers are taken from the root.
pub fn resolve_relative(from: &Path, specifier: &str) -> PathBuf {
    let joined = if specifier.starts_with("./") || specifier.starts_with("../") {
        from.parent().unwrap_or(Path::new("/")).join(specifier)
    } else {
        Path::new("/").join(specifier)
    };
    normalize(&joined)
}

/// Lexically fold `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// A registry over a fixed set of export tables.
#[derive(Debug, Default, Clone)]
pub struct StaticRegistry {
    modules: HashMap<PathBuf, Arc<ModuleMembers>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, members: Arc<ModuleMembers>) -> &mut Self {
        self.modules.insert(members.file().to_path_buf(), members);
        self
    }
}

impl ModuleRegistry for StaticRegistry {
    fn resolve(&self, from: &Path, specifier: &str) -> ReduceResult<PathBuf> {
        let path = resolve_relative(from, specifier);
        if self.modules.contains_key(&path) {
            Ok(path)
        } else {
            Err(ReduceError::unknown_module(specifier))
        }
    }

    fn exports(&self, file: &Path) -> Option<Arc<ModuleMembers>> {
        self.modules.get(file).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_resolution() {
        let from = Path::new("/styles/components/button.kiln");
        assert_eq!(resolve_relative(from, "./theme.kiln"), PathBuf::from("/styles/components/theme.kiln"));
        assert_eq!(resolve_relative(from, "../theme.kiln"), PathBuf::from("/styles/theme.kiln"));
        assert_eq!(resolve_relative(from, "shared/reset.kiln"), PathBuf::from("/shared/reset.kiln"));
    }

    #[test]
    fn test_static_registry() {
        let mut registry = StaticRegistry::new();
        registry.insert(Arc::new(ModuleMembers::empty("/theme.kiln")));
        let resolved = registry.resolve(Path::new("/app.kiln"), "./theme.kiln").unwrap();
        assert!(registry.exports(&resolved).is_some());
        assert_eq!(
            registry.resolve(Path::new("/app.kiln"), "./missing.kiln").unwrap_err().to_string(),
            "Unknown module ./missing.kiln"
        );
    }
}
