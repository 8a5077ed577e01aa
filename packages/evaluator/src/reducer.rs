//! The reducer.
//!
//! One depth-first walk over a file's tree. Every container is rebuilt from
//! the outputs of its children: a node reduces to zero or more nodes that
//! take its place, so `@if` chains splice their taken branch, `@each` splices
//! one copy of its body per item, `@include` splices the expanded mixin, and
//! nested rules hoist next to their parent. When the walk finishes the tree
//! holds only rules, declarations, comments and at-rules.

use crate::args::bind_arguments;
use crate::arithmetic::Calculator;
use crate::builtins::{builtin_module, globals};
use crate::classes::ClassNamer;
use crate::error::{CompileError, ReduceError, ReduceResult};
use crate::expression::ExprEvaluator;
use crate::members::ModuleMembers;
use crate::options::ReduceOptions;
use crate::registry::ModuleRegistry;
use crate::scope::{ContentBlock, ContentSlot, Member, MixinDef, Scope};
use crate::selectors::{resolve_parent, scope_classes};
use crate::values::{as_list, is_truthy};
use kiln_ast::{
    excerpt, serialize, Argument, ExportClause, Expr, ImportClause, ListSeparator, NodeId,
    NodeKind, ParameterList, QualifiedName, SelectorList, SourceLocation, Template, Tree,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, trace};

/// `@include` nesting beyond this is treated as runaway recursion.
pub const MAX_MIXIN_DEPTH: usize = 64;

const EXPORT_TOP_LEVEL: &str = "@export is only allowed at the top level";

/// A reduced file: its plain tree and its published exports.
#[derive(Debug)]
pub struct ReducedFile {
    pub file: PathBuf,
    pub tree: Tree,
    pub members: Arc<ModuleMembers>,
}

impl ReducedFile {
    /// Stylesheet text of the reduced tree.
    pub fn css(&self) -> String {
        serialize(&self.tree)
    }
}

/// Reduces one file's tree. Imports are looked up through `registry`, which
/// must already hold the exports of every imported file.
pub struct Reducer<'r> {
    file: PathBuf,
    tree: Tree,
    options: ReduceOptions,
    registry: &'r dyn ModuleRegistry,
}

impl<'r> Reducer<'r> {
    pub fn new(file: impl Into<PathBuf>, tree: Tree, registry: &'r dyn ModuleRegistry) -> Self {
        Self {
            file: file.into(),
            tree,
            options: ReduceOptions::default(),
            registry,
        }
    }

    pub fn with_options(mut self, options: ReduceOptions) -> Self {
        self.options = options;
        self
    }

    #[instrument(skip(self), fields(file = %self.file.display(), nodes = self.tree.len()))]
    pub fn reduce(self) -> Result<ReducedFile, CompileError> {
        info!("Starting reduction");
        let Reducer {
            file,
            mut tree,
            options,
            registry,
        } = self;

        let root_scope = globals().child();
        let mut walk = Walk::new(&file, &options, registry);
        if let Err(error) = walk.reduce_root(&mut tree, &root_scope) {
            let error = walk.compile_error(error);
            info!(error = %error, "Reduction failed");
            return Err(error);
        }
        // Unrolled and expanded copies leave detached nodes behind.
        let tree = match tree.compacted() {
            Ok(tree) => tree,
            Err(error) => return Err(walk.compile_error(error.into())),
        };
        let members = walk.publish(root_scope);
        info!(
            nodes = tree.len(),
            exports = members.len(),
            classes = members.classes().len(),
            "Reduction complete"
        );
        Ok(ReducedFile {
            file,
            tree,
            members: Arc::new(members),
        })
    }
}

#[derive(Debug, Clone, Default)]
struct Context {
    top_level: bool,
    mixin_depth: usize,
    /// Class of the enclosing single-class rule, target of `composes`.
    class: Option<String>,
}

impl Context {
    fn block(&self) -> Self {
        Self {
            top_level: false,
            ..self.clone()
        }
    }
}

#[derive(Debug, Default)]
struct Failure {
    location: Option<SourceLocation>,
    excerpt: Option<String>,
}

struct Walk<'r> {
    file: PathBuf,
    calc: Calculator,
    classes: ClassNamer,
    registry: &'r dyn ModuleRegistry,
    exports: Vec<(String, Member)>,
    failure: Failure,
}

/// Output that stays inside a rule rather than hoisting next to it.
fn stays_in_rule(tree: &Tree, id: NodeId) -> bool {
    matches!(
        tree.kind(id),
        Ok(NodeKind::Declaration { .. })
            | Ok(NodeKind::Comment { .. })
            | Ok(NodeKind::AtRule { has_block: false, .. })
    )
}

fn emits(tree: &Tree, id: NodeId) -> bool {
    !matches!(tree.kind(id), Ok(NodeKind::Comment { .. }))
}

/// At-rules whose body is not scoped by the enclosing rule.
fn resets_rule(name: &str) -> bool {
    name.ends_with("keyframes") || name.eq_ignore_ascii_case("font-face")
}

/// A declaration value that renders to nothing.
fn is_empty_value(value: &Expr) -> bool {
    match value {
        Expr::Null => true,
        Expr::List(list) => !list.bracketed && list.items.iter().all(Expr::is_null),
        _ => false,
    }
}

/// Index of the last `@else` linked to the `@if` at `start`. Comments
/// between the links belong to the chain.
fn chain_end(tree: &Tree, children: &[NodeId], start: usize) -> ReduceResult<usize> {
    let mut end = start;
    for (offset, id) in children[start + 1..].iter().enumerate() {
        match tree.kind(*id)? {
            NodeKind::Comment { .. } => continue,
            NodeKind::Else { condition } => {
                end = start + 1 + offset;
                if condition.is_none() {
                    break;
                }
            }
            _ => break,
        }
    }
    Ok(end)
}

/// Split an `@each` item into `count` loop values.
fn destructure(item: &Expr, count: usize) -> ReduceResult<Vec<Expr>> {
    if count == 1 {
        return Ok(vec![item.clone()]);
    }
    let (slots, _) = as_list(item);
    if slots.len() < count {
        return Err(ReduceError::arity(format!(
            "`{}` does not have {} values to destructure",
            item, count
        )));
    }
    Ok(slots.into_iter().take(count).collect())
}

fn variable_key(name: &str) -> String {
    format!("${}", name)
}

impl<'r> Walk<'r> {
    fn new(file: &Path, options: &ReduceOptions, registry: &'r dyn ModuleRegistry) -> Self {
        Self {
            file: file.to_path_buf(),
            calc: Calculator::new(options.precision),
            classes: ClassNamer::new(file, options),
            registry,
            exports: Vec::new(),
            failure: Failure::default(),
        }
    }

    fn evaluator<'s>(&self, scope: &'s Scope) -> ExprEvaluator<'s> {
        ExprEvaluator::new(scope, self.calc)
    }

    /// Remember the innermost node a failure passed through.
    fn mark(&mut self, tree: &Tree, id: NodeId) {
        if self.failure.excerpt.is_none() {
            self.failure.excerpt = Some(excerpt(tree, id));
        }
        if self.failure.location.is_none() {
            self.failure.location = tree.location(id);
        }
    }

    fn at<T>(&mut self, tree: &Tree, id: NodeId, result: ReduceResult<T>) -> ReduceResult<T> {
        if result.is_err() {
            self.mark(tree, id);
        }
        result
    }

    fn compile_error(&mut self, error: ReduceError) -> CompileError {
        let failure = std::mem::take(&mut self.failure);
        CompileError {
            error,
            file: Some(self.file.clone()),
            location: failure.location,
            excerpt: failure.excerpt,
        }
    }

    fn reduce_root(&mut self, tree: &mut Tree, scope: &Scope) -> ReduceResult<()> {
        let root = tree.root();
        let ctx = Context {
            top_level: true,
            ..Context::default()
        };
        let output = self.reduce_block(tree, root, scope, &ctx)?;
        tree.set_children(root, output)?;
        self.classes.check_composes()
    }

    fn publish(self, root_scope: Scope) -> ModuleMembers {
        let mut builder = ModuleMembers::builder(&self.file);
        for (key, member) in self.exports {
            builder.insert(key, member);
        }
        builder.classes(self.classes.into_exports()).root(root_scope);
        builder.build()
    }

    fn export_member(&mut self, key: &str, member: Member) {
        debug!(member = key, "Exporting member");
        match self.exports.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = member,
            None => self.exports.push((key.to_string(), member)),
        }
    }

    /// Reduce the children of `container`, returning what replaces them.
    fn reduce_block(
        &mut self,
        tree: &mut Tree,
        container: NodeId,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<Vec<NodeId>> {
        let children = tree.children(container).to_vec();
        let mut output = Vec::new();
        let mut index = 0;
        while index < children.len() {
            let id = children[index];
            let result = if let NodeKind::If { .. } = tree.kind(id)? {
                let end = chain_end(tree, &children, index)?;
                let chain = &children[index..=end];
                index = end + 1;
                self.reduce_chain(tree, chain, scope, ctx)
            } else {
                index += 1;
                self.reduce_node(tree, id, scope, ctx)
            };
            output.extend(self.at(tree, id, result)?);
        }
        Ok(output)
    }

    fn reduce_node(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<Vec<NodeId>> {
        let kind = tree.kind(id)?.clone();
        trace!(node = kind.name(), "Reducing node");
        match kind {
            NodeKind::Root => Err(ReduceError::internal("root node nested inside a block")),
            NodeKind::Rule { selector } => self.reduce_rule(tree, id, &selector, scope, ctx),
            NodeKind::Declaration {
                property,
                value,
                important,
            } => self.reduce_declaration(tree, id, &property, &value, important, scope, ctx),
            NodeKind::VariableDecl {
                name,
                value,
                exported,
                default,
            } => {
                self.bind_variable(&name, &value, exported, default, scope, ctx)?;
                Ok(Vec::new())
            }
            NodeKind::Comment { .. } => Ok(vec![id]),
            NodeKind::If { .. } => self.reduce_chain(tree, &[id], scope, ctx),
            NodeKind::Else { .. } => Err(ReduceError::syntax("@else must follow an @if")),
            NodeKind::Each { names, iterable } => {
                self.reduce_each(tree, id, &names, &iterable, scope, ctx)
            }
            NodeKind::Mixin {
                name,
                params,
                exported,
            } => {
                self.declare_mixin(tree, id, name, params, exported, scope, ctx)?;
                Ok(Vec::new())
            }
            NodeKind::Include {
                name,
                args,
                has_content,
            } => self.include(tree, id, &name, &args, has_content, scope, ctx),
            NodeKind::Content => self.content(tree, scope, ctx),
            NodeKind::Import { specifier, clause } => {
                self.import(&specifier, &clause, scope)?;
                Ok(Vec::new())
            }
            NodeKind::Export { clause } => {
                self.export(&clause, scope, ctx)?;
                Ok(Vec::new())
            }
            NodeKind::AtRule {
                name,
                params,
                has_block,
            } => self.reduce_at_rule(tree, id, &name, &params, has_block, scope, ctx),
        }
    }

    fn reduce_rule(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        selector: &SelectorList,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<Vec<NodeId>> {
        let parent = scope.current_rule();
        let scoped = scope_classes(selector, &mut self.classes)?;
        let resolved = resolve_parent(&scoped, parent.as_deref())?;
        let class = match parent {
            None => selector.single_class().map(str::to_string),
            Some(_) => None,
        };

        let rule_scope = scope.child_with_rule(Some(Arc::new(resolved.clone())));
        let rule_ctx = Context {
            top_level: false,
            mixin_depth: ctx.mixin_depth,
            class,
        };
        let output = self.reduce_block(tree, id, &rule_scope, &rule_ctx)?;

        let (body, hoisted): (Vec<_>, Vec<_>) =
            output.into_iter().partition(|child| stays_in_rule(tree, *child));
        let keep = body.iter().any(|child| emits(tree, *child));
        *tree.kind_mut(id)? = NodeKind::Rule { selector: resolved };
        tree.set_children(id, body)?;

        let mut out = Vec::with_capacity(hoisted.len() + 1);
        if keep {
            out.push(id);
        }
        out.extend(hoisted);
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn reduce_declaration(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        property: &Template,
        value: &Expr,
        important: bool,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<Vec<NodeId>> {
        let evaluator = self.evaluator(scope);
        let property = evaluator.interpolate(property)?;
        if property == "composes" {
            self.compose(value, ctx)?;
            return Ok(Vec::new());
        }
        let value = evaluator.evaluate_declaration(value)?;
        if is_empty_value(&value) {
            return Ok(Vec::new());
        }
        *tree.kind_mut(id)? = NodeKind::Declaration {
            property: Template::literal(property),
            value,
            important,
        };
        Ok(vec![id])
    }

    /// `composes: a b;`, `composes: a from "./x";`, `composes: a from global;`
    fn compose(&mut self, value: &Expr, ctx: &Context) -> ReduceResult<()> {
        let Some(class) = ctx.class.clone() else {
            return Err(ReduceError::syntax(
                "composes is only allowed in a rule with a single class selector",
            ));
        };
        let (items, _) = as_list(value);
        let mut names = Vec::new();
        let mut source = None;
        let mut items = items.into_iter();
        while let Some(item) = items.next() {
            match item {
                Expr::Ident(word) if word == "from" => {
                    source = items.next();
                    break;
                }
                Expr::Ident(name) => names.push(name),
                other => {
                    return Err(ReduceError::type_error(format!(
                        "{} is not a class name",
                        other
                    )))
                }
            }
        }
        debug!(class = %class, composed = ?names, "Composing classes");

        match source {
            None => self.classes.compose_local(&class, &names),
            Some(Expr::Ident(word)) if word == "global" => self.classes.compose_names(&class, names),
            Some(Expr::Str(specifier)) => {
                let members = self.module(&specifier.value)?;
                let mut composed = Vec::new();
                for name in &names {
                    match members.class(name) {
                        Some(selectors) => composed.extend(selectors.iter().cloned()),
                        None => return Err(ReduceError::not_exported(&specifier.value, name)),
                    }
                }
                self.classes.compose_names(&class, composed);
            }
            Some(other) => {
                return Err(ReduceError::syntax(format!(
                    "Expected a file or global after from, found {}",
                    other
                )))
            }
        }
        Ok(())
    }

    fn bind_variable(
        &mut self,
        name: &str,
        value: &Expr,
        exported: bool,
        default: bool,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<()> {
        let key = variable_key(name);
        if exported && !ctx.top_level {
            return Err(ReduceError::syntax(EXPORT_TOP_LEVEL));
        }
        if default && scope.contains(&key) {
            debug!(variable = %key, "Keeping existing value over !default");
            return Ok(());
        }
        let value = self.evaluator(scope).evaluate(value)?;
        debug!(variable = %key, value = %value, "Binding variable");
        let member = Member::Variable {
            value,
            provenance: Some(self.file.clone()),
        };
        scope.set(&key, member.clone())?;
        if exported {
            self.export_member(&key, member);
        }
        Ok(())
    }

    fn reduce_chain(
        &mut self,
        tree: &mut Tree,
        chain: &[NodeId],
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<Vec<NodeId>> {
        for id in chain {
            let condition = match tree.kind(*id)? {
                NodeKind::If { condition } => Some(condition.clone()),
                NodeKind::Else { condition } => condition.clone(),
                _ => continue,
            };
            let taken = match condition {
                None => true,
                Some(condition) => {
                    let value = self.evaluator(scope).evaluate(&condition);
                    is_truthy(&self.at(tree, *id, value)?)
                }
            };
            if taken {
                trace!(branch = %excerpt(tree, *id), "Taking branch");
                let branch_scope = scope.child();
                let output = self.reduce_block(tree, *id, &branch_scope, &ctx.block());
                return self.at(tree, *id, output);
            }
        }
        Ok(Vec::new())
    }

    fn reduce_each(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        names: &[String],
        iterable: &Expr,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<Vec<NodeId>> {
        let value = self.evaluator(scope).evaluate(iterable)?;
        let rows = match &value {
            Expr::List(list) => list
                .items
                .iter()
                .map(|item| destructure(item, names.len()))
                .collect::<ReduceResult<Vec<_>>>()?,
            Expr::Map(map) => map
                .entries
                .iter()
                .map(|(k, v)| {
                    let pair = Expr::list(vec![k.clone(), v.clone()], ListSeparator::Space);
                    destructure(&pair, names.len())
                })
                .collect::<ReduceResult<Vec<_>>>()?,
            other => {
                return Err(ReduceError::type_error(format!("`{}` is not iterable", other)))
            }
        };
        debug!(names = ?names, iterations = rows.len(), "Unrolling @each");

        let mut output = Vec::new();
        for row in rows {
            let iteration = scope.child();
            for (name, value) in names.iter().zip(row) {
                iteration.set(&variable_key(name), Member::variable(value))?;
            }
            let body = tree.clone_subtree(id)?;
            output.extend(self.reduce_block(tree, body, &iteration, &ctx.block())?);
        }
        Ok(output)
    }

    #[allow(clippy::too_many_arguments)]
    fn declare_mixin(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        name: String,
        params: ParameterList,
        exported: bool,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<()> {
        if exported && !ctx.top_level {
            return Err(ReduceError::syntax(EXPORT_TOP_LEVEL));
        }
        let children = tree.children(id).to_vec();
        debug!(mixin = %name, params = %params, "Declaring mixin");
        let def = MixinDef {
            body: Arc::new(tree.fragment(&children)?),
            scope: scope.downgrade(),
            provenance: Some(self.file.clone()),
            name,
            params,
        };
        let key = def.name.clone();
        let member = Member::Mixin(Arc::new(def));
        scope.set(&key, member.clone())?;
        if exported {
            self.export_member(&key, member);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn include(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        name: &QualifiedName,
        args: &[Argument],
        has_content: bool,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<Vec<NodeId>> {
        let key = name.member_key();
        let Some(Member::Mixin(def)) = scope.get(&key) else {
            return Err(ReduceError::undefined_mixin(&key));
        };
        if ctx.mixin_depth >= MAX_MIXIN_DEPTH {
            return Err(ReduceError::syntax(format!(
                "Maximum mixin nesting depth exceeded while including {}",
                key
            )));
        }

        let evaluator = self.evaluator(scope);
        let values = args
            .iter()
            .map(|arg| Ok((arg.name.clone(), evaluator.evaluate(&arg.value)?)))
            .collect::<ReduceResult<Vec<_>>>()?;
        let binding = bind_arguments(&def.params, values)?;

        let content = if has_content {
            let block = tree.children(id).to_vec();
            ContentSlot::Block(ContentBlock {
                body: Arc::new(tree.fragment(&block)?),
                scope: scope.clone(),
            })
        } else {
            ContentSlot::Empty
        };
        let body_scope = def.scope.upgrade()?.mixin_body(scope.current_rule(), content);
        for ((param, value), declared) in binding.slots.into_iter().zip(&def.params.params) {
            // Defaults see the parameters bound before them.
            let value = match (value, &declared.default) {
                (Some(value), _) => value,
                (None, Some(default)) => self.evaluator(&body_scope).evaluate(default)?,
                (None, None) => Expr::Null,
            };
            body_scope.set(&variable_key(&param), Member::variable(value))?;
        }
        if let Some((rest, items)) = binding.rest {
            body_scope.set(
                &variable_key(&rest),
                Member::variable(Expr::list(items, ListSeparator::Comma)),
            )?;
        }

        debug!(mixin = %key, depth = ctx.mixin_depth + 1, content = has_content, "Expanding mixin");
        let body_ctx = Context {
            top_level: false,
            mixin_depth: ctx.mixin_depth + 1,
            class: ctx.class.clone(),
        };
        self.expand(tree, &def.body, &body_scope, &body_ctx)
    }

    fn content(&mut self, tree: &mut Tree, scope: &Scope, ctx: &Context) -> ReduceResult<Vec<NodeId>> {
        match scope.content() {
            ContentSlot::Outside => Err(ReduceError::syntax(
                "@content is only allowed within mixin bodies",
            )),
            ContentSlot::Empty => Ok(Vec::new()),
            ContentSlot::Block(block) => {
                let content_scope = block.scope.child_with_rule(scope.current_rule());
                self.expand(tree, &block.body, &content_scope, &ctx.block())
            }
        }
    }

    /// Copy the statements of `body` into `tree` and reduce them.
    fn expand(
        &mut self,
        tree: &mut Tree,
        body: &Tree,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<Vec<NodeId>> {
        let container = tree.alloc(NodeKind::Root);
        for child in body.children(body.root()) {
            let copy = tree.copy_from(body, *child)?;
            tree.append(container, copy)?;
        }
        self.reduce_block(tree, container, scope, ctx)
    }

    /// Export table of a built-in module or an already reduced file.
    fn module(&self, specifier: &str) -> ReduceResult<Arc<ModuleMembers>> {
        if let Some(builtin) = builtin_module(specifier) {
            return Ok(builtin);
        }
        let path = self.registry.resolve(&self.file, specifier)?;
        self.registry
            .exports(&path)
            .ok_or_else(|| ReduceError::unknown_module(specifier))
    }

    fn import(&mut self, specifier: &str, clause: &ImportClause, scope: &Scope) -> ReduceResult<()> {
        let members = self.module(specifier)?;
        let origin = members.file().to_path_buf();
        debug!(specifier, origin = %origin.display(), clause = %clause, "Importing module");
        match clause {
            ImportClause::Named(names) => {
                for name in names {
                    let member = members
                        .get(&name.name)
                        .ok_or_else(|| ReduceError::not_exported(specifier, &name.name))?;
                    scope.set(name.local(), member.clone().with_provenance(&origin))?;
                }
            }
            ImportClause::Namespace(namespace) => {
                for (key, member) in members.iter() {
                    let key = format!("{}.{}", namespace, key);
                    scope.set(&key, member.clone().with_provenance(&origin))?;
                }
            }
            ImportClause::Glob => {
                for (key, member) in members.iter() {
                    scope.set(key, member.clone().with_provenance(&origin))?;
                }
            }
        }
        Ok(())
    }

    fn export(&mut self, clause: &ExportClause, scope: &Scope, ctx: &Context) -> ReduceResult<()> {
        if !ctx.top_level {
            return Err(ReduceError::syntax(EXPORT_TOP_LEVEL));
        }
        match clause {
            ExportClause::Names(names) => {
                for name in names {
                    let member = scope.get(&name.name).ok_or_else(|| {
                        ReduceError::unresolved(
                            name.name.clone(),
                            format!("Cannot export {} because it is not defined", name.name),
                        )
                    })?;
                    let member = member.with_provenance(&self.file);
                    self.export_member(name.local(), member);
                }
            }
            ExportClause::Forward { from, names } => {
                let members = self.module(from)?;
                let origin = members.file().to_path_buf();
                match names {
                    None => {
                        for (key, member) in members.iter() {
                            self.export_member(key, member.clone().with_provenance(&origin));
                        }
                    }
                    Some(names) => {
                        for name in names {
                            let member = members
                                .get(&name.name)
                                .ok_or_else(|| ReduceError::not_exported(from, &name.name))?;
                            self.export_member(name.local(), member.clone().with_provenance(&origin));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn reduce_at_rule(
        &mut self,
        tree: &mut Tree,
        id: NodeId,
        name: &str,
        params: &Template,
        has_block: bool,
        scope: &Scope,
        ctx: &Context,
    ) -> ReduceResult<Vec<NodeId>> {
        let rendered = self.evaluator(scope).interpolate(params)?;
        *tree.kind_mut(id)? = NodeKind::AtRule {
            name: name.to_string(),
            params: Template::literal(rendered),
            has_block,
        };
        if !has_block {
            return Ok(vec![id]);
        }

        let resets = resets_rule(name);
        let block_scope = if resets {
            scope.child_with_rule(None)
        } else {
            scope.child()
        };
        let output = self.reduce_block(tree, id, &block_scope, &ctx.block())?;
        let location = tree.location(id);
        let output = match scope.current_rule() {
            Some(rule) if !resets => wrap_in_rule(tree, &rule, output, location)?,
            _ => output,
        };
        if output.is_empty() {
            return Ok(Vec::new());
        }
        tree.set_children(id, output)?;
        Ok(vec![id])
    }
}

/// Declarations bubbling out of a rule through an at-rule are wrapped in a
/// copy of that rule: `.a { @media x { c: d } }` → `@media x { .a { c: d } }`.
fn wrap_in_rule(
    tree: &mut Tree,
    rule: &SelectorList,
    output: Vec<NodeId>,
    location: Option<SourceLocation>,
) -> ReduceResult<Vec<NodeId>> {
    if !output.iter().any(|c| stays_in_rule(tree, *c) && emits(tree, *c)) {
        return Ok(output);
    }
    let (loose, rest): (Vec<_>, Vec<_>) = output.into_iter().partition(|c| stays_in_rule(tree, *c));
    let wrapper = tree.alloc_at(
        NodeKind::Rule {
            selector: rule.clone(),
        },
        location,
    );
    tree.set_children(wrapper, loose)?;
    let mut out = vec![wrapper];
    out.extend(rest);
    Ok(out)
}
