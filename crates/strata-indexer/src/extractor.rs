//! Dependency extractor trait and per-category dispatch

use std::collections::BTreeSet;

use strata_core::{Category, ExtractSettings};

use crate::config::ConfigExtractor;
use crate::languages::generic::GenericExtractor;
use crate::languages::markdown::MarkdownExtractor;
use crate::languages::python::PythonExtractor;
use crate::languages::rust::RustExtractor;
use crate::languages::typescript::WebModuleExtractor;
use crate::resolver::Resolver;

/// What one file references and defines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Repository-relative paths confirmed to exist on disk.
    pub references: BTreeSet<String>,
    pub exported_names: BTreeSet<String>,
}

impl Extraction {
    pub fn add_reference(&mut self, path: impl Into<String>) {
        self.references.insert(path.into());
    }

    pub fn add_export(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() {
            self.exported_names.insert(name);
        }
    }
}

/// Everything an extractor may consult besides the file itself.
pub struct ExtractContext<'a> {
    /// Repository-relative path of the file being extracted.
    pub path: &'a str,
    pub content: &'a str,
    pub resolver: &'a Resolver,
    pub settings: &'a ExtractSettings,
}

pub trait DependencyExtractor: Send + Sync {
    fn extract(&self, cx: &ExtractContext<'_>) -> anyhow::Result<Extraction>;
}

/// One extractor per category.
#[derive(Debug, Default)]
pub struct Extractors {
    compiled: RustExtractor,
    interpreted: PythonExtractor,
    documentation: MarkdownExtractor,
    configuration: ConfigExtractor,
    web: WebModuleExtractor,
    other: GenericExtractor,
}

impl Extractors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_category(&self, category: Category) -> &dyn DependencyExtractor {
        match category {
            Category::CompiledModule => &self.compiled,
            Category::InterpretedModule => &self.interpreted,
            Category::Documentation => &self.documentation,
            Category::Configuration => &self.configuration,
            Category::WebModule => &self.web,
            Category::Other => &self.other,
        }
    }

    /// Extract and drop any reference back to the file itself.
    pub fn extract(&self, category: Category, cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
        let mut extraction = self.for_category(category).extract(cx)?;
        extraction.references.remove(cx.path);
        Ok(extraction)
    }
}
