//! Import graph of a bundle.
//!
//! Tracks which files import which, in both directions, so that a bundle
//! can reduce files dependencies-first and invalidate the importers of a
//! changed file.

use crate::error::{BundleError, BundleResult};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

/// file -> files it imports, plus the reverse.
///
/// Ordered maps keep every traversal deterministic.
#[derive(Clone, Debug, Default)]
pub struct ImportGraph {
    imports: BTreeMap<PathBuf, Vec<PathBuf>>,
    importers: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the imports of `file`. Duplicates are folded.
    pub fn set_imports(&mut self, file: PathBuf, targets: Vec<PathBuf>) {
        self.detach(&file);

        let mut unique = Vec::with_capacity(targets.len());
        for target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }
        for target in &unique {
            self.importers
                .entry(target.clone())
                .or_default()
                .push(file.clone());
        }
        self.imports.insert(file, unique);
    }

    pub fn imports_of(&self, file: &Path) -> &[PathBuf] {
        self.imports.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn importers_of(&self, file: &Path) -> &[PathBuf] {
        self.importers.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, file: &Path) -> bool {
        self.imports.contains_key(file)
    }

    /// Every file that was added or is imported by one.
    pub fn files(&self) -> BTreeSet<PathBuf> {
        self.imports
            .keys()
            .chain(self.importers.keys())
            .cloned()
            .collect()
    }

    /// Forget `file` and the edges it owns. Its importers keep pointing at it.
    pub fn remove(&mut self, file: &Path) {
        self.detach(file);
        self.imports.remove(file);
    }

    fn detach(&mut self, file: &Path) {
        if let Some(old) = self.imports.get(file) {
            for target in old {
                if let Some(importers) = self.importers.get_mut(target) {
                    importers.retain(|p| p != file);
                }
            }
        }
        self.importers.retain(|_, importers| !importers.is_empty());
    }

    /// First cycle reachable from `start`, as the chain of files that closes
    /// it (the repeated file appears at both ends).
    pub fn find_cycle_from(&self, start: &Path) -> Option<Vec<PathBuf>> {
        let mut done = BTreeSet::new();
        let mut stack = Vec::new();
        self.walk_for_cycle(start, &mut done, &mut stack)
    }

    fn walk_for_cycle(
        &self,
        node: &Path,
        done: &mut BTreeSet<PathBuf>,
        stack: &mut Vec<PathBuf>,
    ) -> Option<Vec<PathBuf>> {
        if let Some(at) = stack.iter().position(|p| p == node) {
            let mut cycle = stack[at..].to_vec();
            cycle.push(node.to_path_buf());
            return Some(cycle);
        }
        if done.contains(node) {
            return None;
        }

        stack.push(node.to_path_buf());
        for target in self.imports_of(node) {
            if let Some(cycle) = self.walk_for_cycle(target, done, stack) {
                return Some(cycle);
            }
        }
        stack.pop();
        done.insert(node.to_path_buf());
        None
    }

    pub fn check_acyclic(&self) -> BundleResult<()> {
        for file in self.imports.keys() {
            if let Some(cycle) = self.find_cycle_from(file) {
                return Err(BundleError::circular(&cycle));
            }
        }
        Ok(())
    }

    /// Files ordered so each comes after everything it imports. Ties are
    /// broken by path.
    pub fn reduction_order(&self) -> BundleResult<Vec<PathBuf>> {
        self.check_acyclic()?;

        let mut pending: BTreeMap<PathBuf, usize> = self
            .files()
            .into_iter()
            .map(|file| {
                let count = self.imports_of(&file).len();
                (file, count)
            })
            .collect();
        let mut ready: BTreeSet<PathBuf> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(file, _)| file.clone())
            .collect();

        let mut order = Vec::with_capacity(pending.len());
        while let Some(file) = ready.pop_first() {
            for importer in self.importers_of(&file) {
                if let Some(count) = pending.get_mut(importer) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(importer.clone());
                    }
                }
            }
            order.push(file);
        }
        Ok(order)
    }

    /// Files that import `file`, directly or through others.
    pub fn transitive_importers(&self, file: &Path) -> BTreeSet<PathBuf> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<PathBuf> = self.importers_of(file).iter().cloned().collect();
        while let Some(next) = queue.pop_front() {
            if next.as_path() == file || !seen.insert(next.clone()) {
                continue;
            }
            queue.extend(self.importers_of(&next).iter().cloned());
        }
        seen
    }

    /// Files that `file` imports, directly or through others.
    pub fn transitive_imports(&self, file: &Path) -> BTreeSet<PathBuf> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<PathBuf> = self.imports_of(file).iter().cloned().collect();
        while let Some(next) = queue.pop_front() {
            if next.as_path() == file || !seen.insert(next.clone()) {
                continue;
            }
            queue.extend(self.imports_of(&next).iter().cloned());
        }
        seen
    }
}
