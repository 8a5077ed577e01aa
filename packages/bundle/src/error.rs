use kiln_evaluator::CompileError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BundleError {
    #[error("Circular import detected: {cycle}")]
    CircularImport { cycle: String },

    #[error("File not in bundle: {path}")]
    UnknownFile { path: String },

    #[error("Cannot resolve {specifier} imported by {from}")]
    Unresolvable { specifier: String, from: String },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Reduction task failed: {message}")]
    Task { message: String },
}

impl BundleError {
    pub fn circular(cycle: &[PathBuf]) -> Self {
        let cycle = cycle
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        BundleError::CircularImport { cycle }
    }

    pub fn unknown_file(path: &Path) -> Self {
        BundleError::UnknownFile {
            path: path.display().to_string(),
        }
    }

    pub fn unresolvable(specifier: &str, from: &Path) -> Self {
        BundleError::Unresolvable {
            specifier: specifier.to_string(),
            from: from.display().to_string(),
        }
    }
}

pub type BundleResult<T> = Result<T, BundleError>;
