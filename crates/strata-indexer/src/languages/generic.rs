//! Extractor for files without a reference syntax (shaders, extension-less files)

use crate::extractor::{DependencyExtractor, ExtractContext, Extraction};

#[derive(Debug, Default)]
pub struct GenericExtractor;

impl DependencyExtractor for GenericExtractor {
    fn extract(&self, _cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
        Ok(Extraction::default())
    }
}
