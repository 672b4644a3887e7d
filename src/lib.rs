pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod models;
pub mod nlq;
pub mod search;
pub mod store;
pub mod tokenizer;

pub use config::{CommitConfig, RetryConfig, StoreConfig, TokenizerConfig};
pub use error::{FathomError, Result};
pub use index::{DocumentBuilder, DocumentId, IndexDocument};
pub use models::{Comparator, DateFilter, Query, Term, Value};
pub use nlq::NaturalLangParser;
pub use store::{CommitQueue, IndexStore, ResultIterator, StoreRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
