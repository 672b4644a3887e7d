//! Query compilation: free text and term trees down to index queries

mod compiler;
mod text;

pub use compiler::{PropertyIndexing, PropertyKind, PropertyMap, QueryCompiler};
pub use text::TextQueryParser;
