//! Reference extractors for source and documentation files

pub mod generic;
pub mod markdown;
pub mod python;
pub mod rust;
pub mod typescript;
