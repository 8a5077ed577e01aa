//! Built-in modules.
//!
//! Each module is a synthetic, pre-populated scope of native functions with
//! declared parameter shapes, published as [`ModuleMembers`] and importable
//! by bare specifier (`@import "math" as math`). `list()` is also bound in
//! the global scope every file's root scope hangs off.

mod color;
mod list;
mod map;
mod math;
mod string;

use crate::members::ModuleMembers;
use crate::scope::{Member, NativeFn, NativeFunction, Scope};
use kiln_ast::ParameterList;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

pub const MODULE_NAMES: &[&str] = &["math", "color", "string", "list", "map"];

fn native(name: &'static str, params: ParameterList, call: NativeFn) -> NativeFunction {
    NativeFunction { name, params, call }
}

fn module(name: &str, functions: Vec<NativeFunction>) -> Arc<ModuleMembers> {
    let scope = Scope::root();
    let mut builder = ModuleMembers::builder(name);
    for function in functions {
        let name = function.name;
        let member = Member::Function(Arc::new(function));
        // Names within one module are unique.
        let _ = scope.set(name, member.clone());
        builder.insert(name, member);
    }
    builder.root(scope);
    Arc::new(builder.build())
}

fn registry() -> &'static HashMap<&'static str, Arc<ModuleMembers>> {
    static MODULES: OnceLock<HashMap<&'static str, Arc<ModuleMembers>>> = OnceLock::new();
    MODULES.get_or_init(|| {
        let mut modules = HashMap::new();
        modules.insert("math", module("math", math::functions()));
        modules.insert("color", module("color", color::functions()));
        modules.insert("string", module("string", string::functions()));
        modules.insert("list", module("list", list::functions()));
        modules.insert("map", module("map", map::functions()));
        modules
    })
}

/// The export table of a built-in module, if `specifier` names one.
pub fn builtin_module(specifier: &str) -> Option<Arc<ModuleMembers>> {
    registry().get(specifier).cloned()
}

pub fn is_builtin(specifier: &str) -> bool {
    MODULE_NAMES.contains(&specifier)
}

/// Scope above every file root.
pub fn globals() -> Scope {
    static GLOBALS: OnceLock<Scope> = OnceLock::new();
    GLOBALS
        .get_or_init(|| {
            let scope = Scope::root();
            if let Some(member) = builtin_module("list").and_then(|m| m.get("list").cloned()) {
                let _ = scope.set("list", member);
            }
            scope
        })
        .clone()
}
