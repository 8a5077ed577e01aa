use serde::{Deserialize, Serialize};

/// How a reduction treats numbers and class names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReduceOptions {
    /// Decimal digits kept after unit conversion
    #[serde(default = "default_precision")]
    pub precision: u32,

    /// Scope of bare class selectors
    #[serde(default)]
    pub class_scope: ClassScope,

    /// Rename local classes with a per-file hash
    #[serde(default)]
    pub hash_class_names: bool,

    /// `[name]` and `[hash]` are substituted
    #[serde(default = "default_class_name_pattern")]
    pub class_name_pattern: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassScope {
    #[default]
    Local,
    Global,
}

fn default_precision() -> u32 {
    5
}

fn default_class_name_pattern() -> String {
    "[name]_[hash]".to_string()
}

impl ReduceOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn hashed(mut self) -> Self {
        self.hash_class_names = true;
        self
    }
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            class_scope: ClassScope::default(),
            hash_class_names: false,
            class_name_pattern: default_class_name_pattern(),
        }
    }
}
