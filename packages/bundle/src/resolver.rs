//! Import resolution across the files of a bundle.
//!
//! Finds the module specifiers a tree depends on and serves the export
//! tables of files that have already been reduced.

use crate::error::{BundleError, BundleResult};
use kiln_ast::{ExportClause, Expr, NodeKind, Tree};
use kiln_evaluator::builtins::is_builtin;
use kiln_evaluator::registry::resolve_relative;
use kiln_evaluator::values::as_list;
use kiln_evaluator::{ModuleMembers, ModuleRegistry, ReduceError, ReduceResult};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Specifiers named by `@import`, `@export ... from` and
/// `composes: ... from "..."`, in document order. Built-in modules are left
/// out.
pub fn module_specifiers(tree: &Tree) -> Vec<String> {
    let mut specifiers: Vec<String> = Vec::new();
    for id in tree.descendants(tree.root()) {
        let specifier = match tree.kind(id) {
            Ok(NodeKind::Import { specifier, .. }) => Some(specifier.clone()),
            Ok(NodeKind::Export {
                clause: ExportClause::Forward { from, .. },
            }) => Some(from.clone()),
            Ok(NodeKind::Declaration { property, value, .. })
                if property.as_literal().as_deref() == Some("composes") =>
            {
                composed_from(value)
            }
            _ => None,
        };
        if let Some(specifier) = specifier {
            if !is_builtin(&specifier) && !specifiers.contains(&specifier) {
                specifiers.push(specifier);
            }
        }
    }
    specifiers
}

fn composed_from(value: &Expr) -> Option<String> {
    let (items, _) = as_list(value);
    let mut items = items.into_iter();
    items.by_ref().find(|item| matches!(item, Expr::Ident(word) if word == "from"))?;
    match items.next() {
        Some(Expr::Str(file)) => Some(file.value),
        _ => None,
    }
}

/// Resolves each specifier of `tree` to a file path, in document order.
pub fn resolve_imports(from: &Path, tree: &Tree) -> Vec<(String, PathBuf)> {
    module_specifiers(tree)
        .into_iter()
        .map(|specifier| {
            let path = resolve_relative(from, &specifier);
            (specifier, path)
        })
        .collect()
}

/// Module registry over the files of a bundle.
///
/// A specifier resolves when it names a known file; its exports become
/// visible once that file's reduction is published.
#[derive(Debug, Default)]
pub struct FileRegistry {
    files: RwLock<HashSet<PathBuf>>,
    exports: RwLock<HashMap<PathBuf, Arc<ModuleMembers>>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>) {
        self.files.write().insert(path.into());
    }

    pub fn remove_file(&self, path: &Path) {
        self.files.write().remove(path);
        self.exports.write().remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.read().contains(path)
    }

    /// Resolve `specifier` as written in `from`, requiring a known file.
    pub fn locate(&self, from: &Path, specifier: &str) -> BundleResult<PathBuf> {
        let path = resolve_relative(from, specifier);
        if self.contains(&path) {
            Ok(path)
        } else {
            Err(BundleError::unresolvable(specifier, from))
        }
    }

    pub fn publish(&self, members: Arc<ModuleMembers>) {
        trace!(file = %members.file().display(), exports = members.len(), "Publishing exports");
        self.exports
            .write()
            .insert(members.file().to_path_buf(), members);
    }

    /// Drop published exports of `path`; the file stays known.
    pub fn invalidate(&self, path: &Path) {
        self.exports.write().remove(path);
    }

    pub fn is_published(&self, path: &Path) -> bool {
        self.exports.read().contains_key(path)
    }
}

impl ModuleRegistry for FileRegistry {
    fn resolve(&self, from: &Path, specifier: &str) -> ReduceResult<PathBuf> {
        let path = resolve_relative(from, specifier);
        if self.contains(&path) {
            Ok(path)
        } else {
            Err(ReduceError::unknown_module(specifier))
        }
    }

    fn exports(&self, file: &Path) -> Option<Arc<ModuleMembers>> {
        self.exports.read().get(file).cloned()
    }
}
