use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Classes of the bundled bottle model, by class index.
pub const DEFAULT_BOTTLE_CLASSES: [&str; 6] = [
    "blackBottle",
    "blackblueBottle",
    "blueBigBottle",
    "blueBottle",
    "greenBottle",
    "yellowBottle",
];

/// Fixed class-index to label table shipped with a model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Read one label per line. Blank lines and `#` comments are ignored.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read labels file {}", path.display()))?;
        let names: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(anyhow!("labels file {} has no entries", path.display()));
        }
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Label for a class index. Unknown indices get a synthetic name.
    pub fn resolve(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{class_id}"))
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::new(DEFAULT_BOTTLE_CLASSES.iter().map(|s| s.to_string()).collect())
    }
}
