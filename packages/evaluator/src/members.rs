//! Published export table of a reduced file.

use crate::host::expr_to_json;
use crate::scope::{Member, Scope};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Immutable once built. Holds the file's root scope so that exported
/// mixins can still reach their declaring scope.
#[derive(Debug, Clone)]
pub struct ModuleMembers {
    file: PathBuf,
    entries: Vec<(String, Member)>,
    index: HashMap<String, usize>,
    classes: Vec<(String, Vec<String>)>,
    _root: Option<Scope>,
}

impl ModuleMembers {
    pub fn builder(file: impl Into<PathBuf>) -> ModuleMembersBuilder {
        ModuleMembersBuilder {
            file: file.into(),
            entries: Vec::new(),
            index: HashMap::new(),
            classes: Vec::new(),
            root: None,
        }
    }

    pub fn empty(file: impl Into<PathBuf>) -> Self {
        Self::builder(file).build()
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn get(&self, key: &str) -> Option<&Member> {
        self.index.get(key).map(|i| &self.entries[*i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.entries.iter().map(|(k, m)| (k.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exported variable values, keyed without `$`.
    pub fn variables(&self) -> Vec<(&str, &kiln_ast::Expr)> {
        self.entries
            .iter()
            .filter_map(|(key, member)| {
                let name = key.strip_prefix('$')?;
                member.as_variable().map(|v| (name, v))
            })
            .collect()
    }

    /// Class name → generated name followed by composed names.
    pub fn classes(&self) -> &[(String, Vec<String>)] {
        &self.classes
    }

    pub fn class(&self, name: &str) -> Option<&[String]> {
        self.classes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// `{ "variables": {...}, "classes": {...} }` for code outside the
    /// stylesheet pipeline.
    pub fn to_json(&self) -> Value {
        let mut variables = Map::new();
        for (name, value) in self.variables() {
            variables.insert(name.to_string(), expr_to_json(value));
        }
        let mut classes = Map::new();
        for (name, selectors) in &self.classes {
            classes.insert(
                name.clone(),
                Value::Array(selectors.iter().cloned().map(Value::String).collect()),
            );
        }
        let mut out = Map::new();
        out.insert("variables".to_string(), Value::Object(variables));
        out.insert("classes".to_string(), Value::Object(classes));
        Value::Object(out)
    }
}

pub struct ModuleMembersBuilder {
    file: PathBuf,
    entries: Vec<(String, Member)>,
    index: HashMap<String, usize>,
    classes: Vec<(String, Vec<String>)>,
    root: Option<Scope>,
}

impl ModuleMembersBuilder {
    /// Add or replace an entry, keeping first-insertion order.
    pub fn insert(&mut self, key: impl Into<String>, member: Member) -> &mut Self {
        let key = key.into();
        match self.index.get(&key) {
            Some(i) => self.entries[*i].1 = member,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, member));
            }
        }
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn classes(&mut self, classes: Vec<(String, Vec<String>)>) -> &mut Self {
        self.classes = classes;
        self
    }

    pub fn root(&mut self, scope: Scope) -> &mut Self {
        self.root = Some(scope);
        self
    }

    pub fn build(self) -> ModuleMembers {
        ModuleMembers {
            file: self.file,
            entries: self.entries,
            index: self.index,
            classes: self.classes,
            _root: self.root,
        }
    }
}
