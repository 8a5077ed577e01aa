//! A set of source files reduced together.
//!
//! Files are reduced dependencies-first so that every `@import` finds the
//! exports it names already published.

use crate::error::{BundleError, BundleResult};
use crate::graph::ImportGraph;
use crate::resolver::{resolve_imports, FileRegistry};
use kiln_ast::Tree;
use kiln_evaluator::{ReduceOptions, ReducedFile, Reducer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

#[derive(Debug, Default)]
pub struct Bundle {
    sources: BTreeMap<PathBuf, Tree>,
    graph: ImportGraph,
    options: ReduceOptions,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ReduceOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Add or replace a file.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, tree: Tree) {
        let path = path.into();
        let imports = resolve_imports(&path, &tree)
            .into_iter()
            .map(|(_, target)| target)
            .collect();
        self.graph.set_imports(path.clone(), imports);
        self.sources.insert(path, tree);
    }

    pub fn remove_file(&mut self, path: &Path) -> Option<Tree> {
        self.graph.remove(path);
        self.sources.remove(path)
    }

    pub fn file_count(&self) -> usize {
        self.sources.len()
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.sources.keys().map(PathBuf::as_path)
    }

    pub fn graph(&self) -> &ImportGraph {
        &self.graph
    }

    /// Files `path` imports directly.
    pub fn dependencies_of(&self, path: &Path) -> &[PathBuf] {
        self.graph.imports_of(path)
    }

    /// Files that import `path` directly.
    pub fn dependents_of(&self, path: &Path) -> &[PathBuf] {
        self.graph.importers_of(path)
    }

    /// Every import names a file of the bundle and no file imports itself,
    /// directly or otherwise.
    pub fn validate(&self) -> BundleResult<()> {
        for (path, tree) in &self.sources {
            for (specifier, target) in resolve_imports(path, tree) {
                if !self.sources.contains_key(&target) {
                    return Err(BundleError::unresolvable(&specifier, path));
                }
            }
        }
        self.graph.check_acyclic()
    }

    /// Reduce every file.
    #[instrument(skip(self), fields(files = self.sources.len()))]
    pub fn reduce_all(&self) -> BundleResult<BTreeMap<PathBuf, ReducedFile>> {
        self.validate()?;
        let order = self.graph.reduction_order()?;
        let reduced = self.reduce_in_order(order)?;
        info!(files = reduced.len(), "Bundle reduced");
        Ok(reduced)
    }

    /// Reduce `path` after the files it depends on.
    #[instrument(skip(self), fields(file = %path.display()))]
    pub fn reduce_file(&self, path: &Path) -> BundleResult<ReducedFile> {
        if !self.sources.contains_key(path) {
            return Err(BundleError::unknown_file(path));
        }
        self.validate()?;

        let mut needed: BTreeSet<PathBuf> = self.graph.transitive_imports(path);
        needed.insert(path.to_path_buf());
        let order = self
            .graph
            .reduction_order()?
            .into_iter()
            .filter(|file| needed.contains(file))
            .collect();

        let mut reduced = self.reduce_in_order(order)?;
        reduced
            .remove(path)
            .ok_or_else(|| BundleError::unknown_file(path))
    }

    fn reduce_in_order(&self, order: Vec<PathBuf>) -> BundleResult<BTreeMap<PathBuf, ReducedFile>> {
        let registry = FileRegistry::new();
        for path in self.sources.keys() {
            registry.add_file(path.clone());
        }

        let mut reduced = BTreeMap::new();
        for path in order {
            let Some(tree) = self.sources.get(&path) else {
                continue;
            };
            debug!(file = %path.display(), "Reducing");
            let file = Reducer::new(path.clone(), tree.clone(), &registry)
                .with_options(self.options.clone())
                .reduce()?;
            registry.publish(file.members.clone());
            reduced.insert(path, file);
        }
        Ok(reduced)
    }
}
