use crate::error::Result;
use glob::Pattern;
use serde::{Deserialize, Serialize};

/// Options controlling which compilation units are scanned for directives.
///
/// Filters are glob patterns over module paths (`crate::api::*`). They only
/// restrict the initial classification of units: a model referenced from a
/// scanned unit is always resolved, whichever module declares it.
///
/// # Example
///
/// ```
/// use swagger_from_docs::config::ScanOptions;
///
/// let options = ScanOptions::default()
///     .include("crate::api::*")
///     .exclude("crate::api::internal*");
/// let filter = options.module_filter().unwrap();
/// assert!(filter.allows("crate::api::pets"));
/// assert!(!filter.allows("crate::api::internal"));
/// assert!(!filter.allows("crate::models"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Modules to scan; all modules when empty
    #[serde(default)]
    pub include: Vec<String>,
    /// Modules never scanned, even when included
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ScanOptions {
    /// Adds an include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    /// Adds an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    /// Compiles the patterns into a [`ModuleFilter`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::InvalidFilter`] if a pattern is not a valid glob.
    pub fn module_filter(&self) -> Result<ModuleFilter> {
        Ok(ModuleFilter {
            include: compile(&self.include)?,
            exclude: compile(&self.exclude)?,
        })
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| Pattern::new(pattern).map_err(Into::into))
        .collect()
}

/// Compiled include/exclude filters.
#[derive(Debug, Clone, Default)]
pub struct ModuleFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl ModuleFilter {
    /// Whether units of `module` take part in classification.
    pub fn allows(&self, module: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|pattern| pattern.matches(module));
        included && !self.exclude.iter().any(|pattern| pattern.matches(module))
    }
}
