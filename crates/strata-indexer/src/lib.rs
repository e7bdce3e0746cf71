//! Repository scanning, dependency extraction and run orchestration

pub mod config;
pub mod coordinator;
pub mod describe;
pub mod extractor;
pub mod languages;
pub mod resolver;
pub mod scanner;
pub mod syntax;


#[cfg(test)]
pub mod test_utils;

pub use coordinator::{run, Coordinator, RunOptions, RunOutput};
pub use describe::{Describer, Description, HeuristicDescriber};
pub use extractor::{DependencyExtractor, ExtractContext, Extraction, Extractors};
pub use resolver::Resolver;
pub use scanner::{ScanOutcome, Scanner};
pub use syntax::SyntaxKind;
