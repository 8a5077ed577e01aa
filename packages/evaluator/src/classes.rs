//! Class-name scoping.
//!
//! Local classes are optionally renamed with a per-file hash and recorded in
//! the file's class export map, together with anything they `composes`.

use crate::error::{ReduceError, ReduceResult};
use crate::options::{ClassScope, ReduceOptions};
use crc32fast::Hasher;
use std::collections::HashMap;
use std::path::Path;

/// Hash of a class within a file.
pub fn class_hash(file: &Path, name: &str) -> String {
    let mut path = file.to_string_lossy().into_owned();
    if !path.starts_with("file://") {
        path = format!("file://{}", path);
    }
    let mut hasher = Hasher::new();
    hasher.update(path.as_bytes());
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug)]
pub struct ClassNamer {
    file_hash: String,
    default_scope: ClassScope,
    hash: bool,
    pattern: String,
    generated: HashMap<String, String>,
    /// Class → generated name, then composed names. Insertion ordered.
    exports: Vec<(String, Vec<String>)>,
    /// Local names used in `composes`, checked once the file is reduced.
    pending: Vec<String>,
}

impl ClassNamer {
    pub fn new(file: &Path, options: &ReduceOptions) -> Self {
        Self {
            file_hash: class_hash(file, ""),
            default_scope: options.class_scope,
            hash: options.hash_class_names,
            pattern: options.class_name_pattern.clone(),
            generated: HashMap::new(),
            exports: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn default_scope(&self) -> ClassScope {
        self.default_scope
    }

    fn generate(&self, name: &str) -> String {
        if !self.hash {
            return name.to_string();
        }
        let mut hasher = Hasher::new();
        hasher.update(self.file_hash.as_bytes());
        hasher.update(name.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.pattern.replace("[name]", name).replace("[hash]", &hash)
    }

    /// Name to emit for a class written in `scope`.
    pub fn rename(&mut self, name: &str, scope: ClassScope) -> String {
        if scope == ClassScope::Global {
            return name.to_string();
        }
        if let Some(generated) = self.generated.get(name) {
            return generated.clone();
        }
        let generated = self.generate(name);
        self.generated.insert(name.to_string(), generated.clone());
        self.exports.push((name.to_string(), vec![generated.clone()]));
        generated
    }

    /// Original name of a generated one.
    pub fn original(&self, generated: &str) -> Option<&str> {
        self.generated
            .iter()
            .find(|(_, g)| g.as_str() == generated)
            .map(|(n, _)| n.as_str())
    }

    fn entry(&mut self, class: &str) -> &mut Vec<String> {
        let index = match self.exports.iter().position(|(n, _)| n == class) {
            Some(index) => index,
            None => {
                let generated = self.generate(class);
                self.generated.insert(class.to_string(), generated.clone());
                self.exports.push((class.to_string(), vec![generated]));
                self.exports.len() - 1
            }
        };
        &mut self.exports[index].1
    }

    fn append(&mut self, class: &str, names: Vec<String>) {
        let entry = self.entry(class);
        for name in names {
            if !entry.contains(&name) {
                entry.push(name);
            }
        }
    }

    /// `composes: a b;` within this file.
    pub fn compose_local(&mut self, class: &str, names: &[String]) {
        let generated = names
            .iter()
            .map(|n| {
                self.pending.push(n.clone());
                self.generated.get(n).cloned().unwrap_or_else(|| self.generate(n))
            })
            .collect();
        self.append(class, generated);
    }

    /// `composes: a from global;` or names taken from another file's export.
    pub fn compose_names(&mut self, class: &str, names: Vec<String>) {
        self.append(class, names);
    }

    /// Every locally composed class must have been defined by the end.
    pub fn check_composes(&self) -> ReduceResult<()> {
        for name in &self.pending {
            if !self.generated.contains_key(name) {
                return Err(ReduceError::unresolved(
                    name.clone(),
                    format!("Undefined class {} in composes", name),
                ));
            }
        }
        Ok(())
    }

    pub fn into_exports(self) -> Vec<(String, Vec<String>)> {
        self.exports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_per_file() {
        let a = class_hash(Path::new("/a.kiln"), "button");
        assert_eq!(a, class_hash(Path::new("/a.kiln"), "button"));
        assert_ne!(a, class_hash(Path::new("/b.kiln"), "button"));
    }

    #[test]
    fn test_unhashed_names_are_kept() {
        let mut namer = ClassNamer::new(Path::new("/a.kiln"), &ReduceOptions::default());
        assert_eq!(namer.rename("button", ClassScope::Local), "button");
        assert_eq!(namer.rename("reset", ClassScope::Global), "reset");
        assert_eq!(namer.into_exports(), vec![("button".to_string(), vec!["button".to_string()])]);
    }

    #[test]
    fn test_pattern_is_applied() {
        let options = ReduceOptions::default().hashed();
        let mut namer = ClassNamer::new(Path::new("/a.kiln"), &options);
        let generated = namer.rename("button", ClassScope::Local);
        assert!(generated.starts_with("button_"));
        assert_eq!(namer.rename("button", ClassScope::Local), generated);
        assert_eq!(namer.original(&generated), Some("button"));
    }

    #[test]
    fn test_composes_dedupes_in_order() {
        let mut namer = ClassNamer::new(Path::new("/a.kiln"), &ReduceOptions::default());
        namer.rename("base", ClassScope::Local);
        namer.rename("button", ClassScope::Local);
        namer.compose_local("button", &["base".to_string()]);
        namer.compose_names("button", vec!["reset".to_string(), "base".to_string()]);
        assert!(namer.check_composes().is_ok());
        let exports = namer.into_exports();
        assert_eq!(exports[1].1, vec!["button", "base", "reset"]);
    }

    #[test]
    fn test_undefined_composed_class() {
        let mut namer = ClassNamer::new(Path::new("/a.kiln"), &ReduceOptions::default());
        namer.rename("button", ClassScope::Local);
        namer.compose_local("button", &["missing".to_string()]);
        assert_eq!(
            namer.check_composes().unwrap_err().to_string(),
            "Undefined class missing in composes"
        );
    }
}
