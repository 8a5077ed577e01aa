//! Lexical scope chain.
//!
//! A [`Scope`] is a shared handle to one frame: an ordered binding table, a
//! link to the enclosing frame, the current rule (nearest resolved selector
//! list, for `&`), and the content slot of the mixin being expanded.
//! Variables are keyed `$name`, mixins and functions by bare name, and
//! namespaced imports as `ns.$name` / `ns.name`.

use crate::args::BoundArgs;
use crate::arithmetic::Calculator;
use crate::error::{ReduceError, ReduceResult};
use kiln_ast::{Expr, ParameterList, SelectorList, Tree};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// Native callable behind a built-in function.
pub type NativeFn = fn(&Calculator, &BoundArgs) -> ReduceResult<Expr>;

pub struct NativeFunction {
    pub name: &'static str,
    pub params: ParameterList,
    pub call: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({}({}))", self.name, self.params)
    }
}

/// A `@mixin` declaration captured with its declaring scope.
#[derive(Debug)]
pub struct MixinDef {
    pub name: String,
    pub params: ParameterList,
    /// Root children are the body statements.
    pub body: Arc<Tree>,
    pub scope: WeakScope,
    pub provenance: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum Member {
    Variable {
        value: Expr,
        provenance: Option<PathBuf>,
    },
    Function(Arc<NativeFunction>),
    Mixin(Arc<MixinDef>),
}

impl Member {
    pub fn variable(value: Expr) -> Self {
        Member::Variable {
            value,
            provenance: None,
        }
    }

    pub fn provenance(&self) -> Option<&Path> {
        match self {
            Member::Variable { provenance, .. } => provenance.as_deref(),
            Member::Mixin(def) => def.provenance.as_deref(),
            Member::Function(_) => None,
        }
    }

    /// Tag a variable with the file that defined it, unless already tagged.
    pub fn with_provenance(self, file: &Path) -> Self {
        match self {
            Member::Variable { value, provenance } => Member::Variable {
                value,
                provenance: provenance.or_else(|| Some(file.to_path_buf())),
            },
            other => other,
        }
    }

    pub fn as_variable(&self) -> Option<&Expr> {
        match self {
            Member::Variable { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// The block handed to a mixin through `@include ... { }`.
#[derive(Debug, Clone)]
pub struct ContentBlock {
    pub body: Arc<Tree>,
    /// Scope at the include site.
    pub scope: Scope,
}

#[derive(Debug, Clone)]
pub enum ContentSlot {
    /// Not inside a mixin body.
    Outside,
    /// Inside a mixin included without a block.
    Empty,
    Block(ContentBlock),
}

#[derive(Debug, Default)]
struct Bindings {
    order: Vec<String>,
    members: HashMap<String, Member>,
}

#[derive(Debug)]
struct Frame {
    parent: Option<Scope>,
    bindings: RwLock<Bindings>,
    current_rule: Option<Arc<SelectorList>>,
    content: ContentSlot,
}

#[derive(Debug, Clone)]
pub struct Scope(Arc<Frame>);

#[derive(Debug, Clone)]
pub struct WeakScope(Weak<Frame>);

impl WeakScope {
    pub fn upgrade(&self) -> ReduceResult<Scope> {
        self.0
            .upgrade()
            .map(Scope)
            .ok_or_else(|| ReduceError::internal("mixin used after its declaring scope closed"))
    }
}

impl Scope {
    pub fn root() -> Self {
        Self::with_frame(None, None, ContentSlot::Outside)
    }

    fn with_frame(parent: Option<Scope>, current_rule: Option<Arc<SelectorList>>, content: ContentSlot) -> Self {
        Scope(Arc::new(Frame {
            parent,
            bindings: RwLock::new(Bindings::default()),
            current_rule,
            content,
        }))
    }

    /// Nested block scope inheriting the current rule.
    pub fn child(&self) -> Self {
        Self::with_frame(Some(self.clone()), self.0.current_rule.clone(), ContentSlot::Outside)
    }

    /// Nested block scope of a rule whose selector resolved to `rule`.
    pub fn child_with_rule(&self, rule: Option<Arc<SelectorList>>) -> Self {
        Self::with_frame(Some(self.clone()), rule, ContentSlot::Outside)
    }

    /// Scope of a mixin body: lexically under `self` (the declaring scope),
    /// with the include site's rule and content block.
    pub fn mixin_body(&self, rule: Option<Arc<SelectorList>>, content: ContentSlot) -> Self {
        Self::with_frame(Some(self.clone()), rule, content)
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope(Arc::downgrade(&self.0))
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    pub fn current_rule(&self) -> Option<Arc<SelectorList>> {
        self.0.current_rule.clone()
    }

    /// Content slot of the innermost mixin body on the chain.
    pub fn content(&self) -> ContentSlot {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if !matches!(current.0.content, ContentSlot::Outside) {
                return current.0.content.clone();
            }
            scope = current.parent();
        }
        ContentSlot::Outside
    }

    pub fn get_local(&self, key: &str) -> Option<Member> {
        self.0.bindings.read().members.get(key).cloned()
    }

    /// Look up `key` here, then along the parent chain.
    pub fn get(&self, key: &str) -> Option<Member> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(member) = current.get_local(key) {
                return Some(member);
            }
            scope = current.parent();
        }
        None
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Bind `key` in this frame. Rebinding a name already bound in this
    /// same frame is an error; shadowing an outer binding is not.
    pub fn set(&self, key: &str, member: Member) -> ReduceResult<()> {
        let mut bindings = self.0.bindings.write();
        if bindings.members.contains_key(key) {
            return Err(ReduceError::redefinition(key));
        }
        bindings.order.push(key.to_string());
        bindings.members.insert(key.to_string(), member);
        Ok(())
    }

    /// Local bindings in definition order.
    pub fn entries(&self) -> Vec<(String, Member)> {
        let bindings = self.0.bindings.read();
        bindings
            .order
            .iter()
            .filter_map(|k| bindings.members.get(k).map(|m| (k.clone(), m.clone())))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
