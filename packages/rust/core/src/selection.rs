//! Example directory discovery and name filtering.

use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use inputbuilder_shared::{ExampleDirectory, InputBuilderError, Result, SelectionConfig};

/// Compiled include/exclude filters over example directory names.
#[derive(Debug, Clone, Default)]
pub struct DirectorySelection {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl DirectorySelection {
    /// Select every directory.
    pub fn all() -> Self {
        Self::default()
    }

    /// Compile include and exclude patterns.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Whether `name` passes the filters. Exclusion wins over inclusion.
    pub fn matches(&self, name: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(name)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(name))
    }
}

impl TryFrom<&SelectionConfig> for DirectorySelection {
    type Error = InputBuilderError;

    fn try_from(config: &SelectionConfig) -> Result<Self> {
        Self::new(&config.include_patterns, &config.exclude_patterns)
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                InputBuilderError::validation(format!("invalid directory pattern '{p}': {e}"))
            })
        })
        .collect()
}

/// List the example subdirectories of `input_dir`, sorted by name.
///
/// Plain files are skipped. Names rejected by `selection` are dropped.
pub fn discover_examples(
    input_dir: &Path,
    selection: &DirectorySelection,
) -> Result<Vec<ExampleDirectory>> {
    let entries = std::fs::read_dir(input_dir).map_err(|e| InputBuilderError::io(input_dir, e))?;

    let mut examples = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| InputBuilderError::io(input_dir, e))?;
        let path = entry.path();

        if !path.is_dir() {
            warn!(path = %path.display(), "skipping non-directory entry in input dir");
            continue;
        }

        let example = ExampleDirectory::new(path);
        if !selection.matches(&example.name) {
            debug!(directory = %example.name, "excluded by selection");
            continue;
        }
        examples.push(example);
    }

    examples.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(examples)
}
