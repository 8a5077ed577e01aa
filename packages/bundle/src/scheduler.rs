//! Concurrent reduction of bundle files.
//!
//! Each file is reduced at most once per source revision. Requests for a
//! file already in flight join the running reduction; successful results
//! stay cached until the file or something it imports changes, failures
//! are dropped so the next request retries.
//!
//! Every slot carries the generation it was scheduled in. A reduction that
//! finishes after its slot was evicted neither publishes its exports nor
//! touches the slot that replaced it.

use crate::error::{BundleError, BundleResult};
use crate::graph::ImportGraph;
use crate::resolver::{resolve_imports, FileRegistry};
use futures::future::{try_join_all, BoxFuture, FutureExt, Shared};
use kiln_ast::Tree;
use kiln_evaluator::{ReduceOptions, ReducedFile, Reducer};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

type SharedReduction = Shared<BoxFuture<'static, BundleResult<Arc<ReducedFile>>>>;

struct Slot {
    generation: u64,
    reduction: SharedReduction,
}

#[derive(Clone)]
pub struct ReductionScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    options: ReduceOptions,
    sources: RwLock<HashMap<PathBuf, Arc<Tree>>>,
    graph: RwLock<ImportGraph>,
    registry: Arc<FileRegistry>,
    /// In-flight and completed reductions.
    slots: Mutex<HashMap<PathBuf, Slot>>,
    next_generation: AtomicU64,
}

impl Default for ReductionScheduler {
    fn default() -> Self {
        Self::new(ReduceOptions::default())
    }
}

impl ReductionScheduler {
    pub fn new(options: ReduceOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                sources: RwLock::new(HashMap::new()),
                graph: RwLock::new(ImportGraph::new()),
                registry: Arc::new(FileRegistry::new()),
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Add or replace a source. The cached reductions of the file and of
    /// everything importing it are discarded.
    pub fn set_source(&self, path: impl Into<PathBuf>, tree: Tree) {
        let path = path.into();
        let imports = resolve_imports(&path, &tree)
            .into_iter()
            .map(|(_, target)| target)
            .collect();

        let stale = {
            let mut graph = self.inner.graph.write();
            graph.set_imports(path.clone(), imports);
            let mut stale = graph.transitive_importers(&path);
            stale.insert(path.clone());
            stale
        };
        self.inner.sources.write().insert(path.clone(), Arc::new(tree));
        self.inner.registry.add_file(path);
        self.inner.evict(&stale);
    }

    pub fn remove_source(&self, path: &Path) {
        let stale = {
            let mut graph = self.inner.graph.write();
            let mut stale = graph.transitive_importers(path);
            graph.remove(path);
            stale.insert(path.to_path_buf());
            stale
        };
        self.inner.sources.write().remove(path);
        self.inner.registry.remove_file(path);
        self.inner.evict(&stale);
    }

    /// The finished reduction of `path`, if one is cached.
    pub fn cached(&self, path: &Path) -> Option<Arc<ReducedFile>> {
        let slots = self.inner.slots.lock();
        slots
            .get(path)
            .and_then(|slot| slot.reduction.peek().cloned())
            .and_then(Result::ok)
    }

    #[instrument(skip(self), fields(file = %path.display()))]
    pub async fn reduce(&self, path: &Path) -> BundleResult<Arc<ReducedFile>> {
        self.inner.check(path)?;
        Inner::schedule(&self.inner, path.to_path_buf()).await
    }

    /// Reduce every known source, returned in path order.
    #[instrument(skip(self))]
    pub async fn reduce_all(&self) -> BundleResult<Vec<Arc<ReducedFile>>> {
        let mut paths: Vec<PathBuf> = self.inner.sources.read().keys().cloned().collect();
        paths.sort();
        for path in &paths {
            self.inner.check(path)?;
        }

        let reductions = paths
            .into_iter()
            .map(|path| Inner::schedule(&self.inner, path));
        let reduced = try_join_all(reductions).await?;
        info!(files = reduced.len(), "All files reduced");
        Ok(reduced)
    }
}

impl Inner {
    /// `path` is known and no import chain from it loops back.
    fn check(&self, path: &Path) -> BundleResult<()> {
        if !self.sources.read().contains_key(path) {
            return Err(BundleError::unknown_file(path));
        }
        let cycle = self.graph.read().find_cycle_from(path);
        match cycle {
            Some(cycle) => Err(BundleError::circular(&cycle)),
            None => Ok(()),
        }
    }

    fn schedule(inner: &Arc<Inner>, path: PathBuf) -> SharedReduction {
        let mut slots = inner.slots.lock();
        if let Some(slot) = slots.get(&path) {
            debug!(file = %path.display(), "Joining existing reduction");
            return slot.reduction.clone();
        }
        let generation = inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let reduction = Inner::run(inner.clone(), path.clone(), generation)
            .boxed()
            .shared();
        slots.insert(
            path,
            Slot {
                generation,
                reduction: reduction.clone(),
            },
        );
        reduction
    }

    async fn run(inner: Arc<Inner>, path: PathBuf, generation: u64) -> BundleResult<Arc<ReducedFile>> {
        let result = inner.reduce_file(&path, generation).await;
        if let Err(error) = &result {
            let mut slots = inner.slots.lock();
            if is_current(&slots, &path, generation) {
                debug!(file = %path.display(), error = %error, "Reduction failed, dropping slot");
                slots.remove(&path);
            }
        }
        result
    }

    async fn reduce_file(self: &Arc<Self>, path: &Path, generation: u64) -> BundleResult<Arc<ReducedFile>> {
        let tree = self
            .sources
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| BundleError::unknown_file(path))?;

        let mut imports = Vec::new();
        for (specifier, target) in resolve_imports(path, &tree) {
            if !self.registry.contains(&target) {
                return Err(BundleError::unresolvable(&specifier, path));
            }
            imports.push(Inner::schedule(self, target));
        }
        try_join_all(imports).await?;

        let registry = self.registry.clone();
        let options = self.options.clone();
        let file = path.to_path_buf();
        let tree = Tree::clone(&tree);
        let reduced = tokio::task::spawn_blocking(move || {
            Reducer::new(file, tree, registry.as_ref())
                .with_options(options)
                .reduce()
        })
        .await
        .map_err(|e| BundleError::Task {
            message: e.to_string(),
        })??;

        let reduced = Arc::new(reduced);
        // Held across publish so an eviction cannot slip in between.
        let slots = self.slots.lock();
        if is_current(&slots, path, generation) {
            debug!(file = %path.display(), "Reduced");
            self.registry.publish(reduced.members.clone());
        } else {
            debug!(file = %path.display(), "Reduced a stale revision, not publishing");
        }
        Ok(reduced)
    }

    fn evict(&self, paths: &BTreeSet<PathBuf>) {
        let mut slots = self.slots.lock();
        for path in paths {
            if slots.remove(path).is_some() {
                debug!(file = %path.display(), "Evicted cached reduction");
            }
            self.registry.invalidate(path);
        }
    }
}

fn is_current(slots: &HashMap<PathBuf, Slot>, path: &Path, generation: u64) -> bool {
    slots
        .get(path)
        .is_some_and(|slot| slot.generation == generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::TreeBuilder;
    use pretty_assertions::assert_eq;

    fn theme(primary: &str) -> Tree {
        let mut b = TreeBuilder::new();
        b.export_var("primary", primary).unwrap();
        b.finish()
    }

    fn app() -> Tree {
        let mut b = TreeBuilder::new();
        b.import_named("./theme.kiln", &["$primary"]).unwrap();
        b.rule(".app", |b| {
            b.decl("color", "$primary")?;
            Ok(())
        })
        .unwrap();
        b.finish()
    }

    fn scheduler() -> ReductionScheduler {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let scheduler = ReductionScheduler::default();
        scheduler.set_source("/theme.kiln", theme("red"));
        scheduler.set_source("/app.kiln", app());
        scheduler
    }

    #[tokio::test]
    async fn test_reduces_imports_first() {
        let scheduler = scheduler();
        let app = scheduler.reduce(Path::new("/app.kiln")).await.unwrap();

        assert_eq!(app.css(), ".app {\n  color: red;\n}\n");
        assert!(scheduler.cached(Path::new("/theme.kiln")).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_reduction() {
        let scheduler = scheduler();
        let (first, second) = tokio::join!(
            scheduler.reduce(Path::new("/app.kiln")),
            scheduler.reduce(Path::new("/app.kiln"))
        );
        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));

        let again = scheduler.reduce(Path::new("/app.kiln")).await.unwrap();
        let cached = scheduler.cached(Path::new("/app.kiln")).unwrap();
        assert!(Arc::ptr_eq(&again, &cached));
    }

    #[tokio::test]
    async fn test_updating_a_source_evicts_its_importers() {
        let scheduler = scheduler();
        scheduler.reduce(Path::new("/app.kiln")).await.unwrap();

        scheduler.set_source("/theme.kiln", theme("blue"));
        assert!(scheduler.cached(Path::new("/app.kiln")).is_none());
        assert!(scheduler.cached(Path::new("/theme.kiln")).is_none());

        let app = scheduler.reduce(Path::new("/app.kiln")).await.unwrap();
        assert_eq!(app.css(), ".app {\n  color: blue;\n}\n");
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let scheduler = scheduler();
        scheduler.set_source("/theme.kiln", theme("$missing"));

        let err = scheduler.reduce(Path::new("/app.kiln")).await.unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable $missing");
        assert!(scheduler.cached(Path::new("/app.kiln")).is_none());

        scheduler.set_source("/theme.kiln", theme("green"));
        let app = scheduler.reduce(Path::new("/app.kiln")).await.unwrap();
        assert_eq!(app.css(), ".app {\n  color: green;\n}\n");
    }

    #[tokio::test]
    async fn test_stale_failure_keeps_the_fresh_slot() {
        let scheduler = scheduler();
        scheduler.set_source("/theme.kiln", theme("$missing"));

        let mut stale = Inner::schedule(&scheduler.inner, PathBuf::from("/theme.kiln"));
        let early = futures::poll!(&mut stale);

        scheduler.set_source("/theme.kiln", theme("green"));
        let fresh = scheduler.reduce(Path::new("/theme.kiln")).await.unwrap();

        let outcome = match early {
            std::task::Poll::Ready(outcome) => outcome,
            std::task::Poll::Pending => stale.await,
        };
        assert_eq!(outcome.unwrap_err().to_string(), "Undefined variable $missing");
        let cached = scheduler.cached(Path::new("/theme.kiln")).unwrap();
        assert!(Arc::ptr_eq(&fresh, &cached));
    }

    #[tokio::test]
    async fn test_stale_reduction_does_not_publish() {
        let scheduler = scheduler();

        let mut stale = Inner::schedule(&scheduler.inner, PathBuf::from("/theme.kiln"));
        let early = futures::poll!(&mut stale);

        scheduler.set_source("/theme.kiln", theme("blue"));
        let first = scheduler.reduce(Path::new("/app.kiln")).await.unwrap();
        assert_eq!(first.css(), ".app {\n  color: blue;\n}\n");

        if early.is_pending() {
            stale.await.unwrap();
        }

        // Only the importer is evicted, so it reads the published theme.
        scheduler.set_source("/app.kiln", app());
        let second = scheduler.reduce(Path::new("/app.kiln")).await.unwrap();
        assert_eq!(second.css(), ".app {\n  color: blue;\n}\n");
    }

    #[tokio::test]
    async fn test_circular_import_is_rejected() {
        let scheduler = ReductionScheduler::default();
        let mut a = TreeBuilder::new();
        a.import_glob("./b.kiln").unwrap();
        let mut b = TreeBuilder::new();
        b.import_glob("./a.kiln").unwrap();
        scheduler.set_source("/a.kiln", a.finish());
        scheduler.set_source("/b.kiln", b.finish());

        let err = scheduler.reduce(Path::new("/b.kiln")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Circular import detected: /b.kiln -> /a.kiln -> /b.kiln"
        );
    }

    #[tokio::test]
    async fn test_unresolvable_and_unknown_files() {
        let scheduler = ReductionScheduler::default();
        scheduler.set_source("/app.kiln", app());

        let err = scheduler.reduce(Path::new("/app.kiln")).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot resolve ./theme.kiln imported by /app.kiln");

        let err = scheduler.reduce(Path::new("/nope.kiln")).await.unwrap_err();
        assert_eq!(err, BundleError::unknown_file(Path::new("/nope.kiln")));
    }

    #[tokio::test]
    async fn test_reduce_all_and_remove() {
        let scheduler = scheduler();
        let all = scheduler.reduce_all().await.unwrap();
        let files: Vec<_> = all.iter().map(|f| f.file.clone()).collect();
        assert_eq!(files, vec![PathBuf::from("/app.kiln"), PathBuf::from("/theme.kiln")]);

        scheduler.remove_source(Path::new("/theme.kiln"));
        assert!(scheduler.cached(Path::new("/app.kiln")).is_none());
        assert!(scheduler.reduce(Path::new("/app.kiln")).await.is_err());
    }
}
