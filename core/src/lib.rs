//! Per-language TF-IDF indexing and nearest-ticket retrieval.
//!
//! A [`LanguageCatalog`] resolves language identifiers and serves stopword
//! lists, an [`Index`] holds one language's frozen vocabulary and
//! L2-normalized document vectors, [`IndexStore`] decides between loading
//! persisted artifacts and rebuilding them, and [`search::search`] finds the
//! single most similar training document for a query.

pub mod corpus;
pub mod error;
pub mod index;
pub mod language;
pub mod persist;
pub mod search;
pub mod store;
pub mod tokenizer;

pub use corpus::{Document, Query};
pub use error::{Error, Result};
pub use index::{AnalyzerConfig, DocumentVectorMatrix, Index, SparseVector, TermWeightModel};
pub use language::{BundledStopwords, Language, LanguageCatalog, StopwordDir, StopwordSet, StopwordSource};
pub use persist::IndexPaths;
pub use search::MatchResult;
pub use store::{IndexStore, Materialized};
