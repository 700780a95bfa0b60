//! Hybrid retrieval for ClinSim.
//!
//! Grounds generated answers in the source case text by fusing two ranked
//! views of the same chunk corpus:
//!
//! - **Lexical**: Okapi BM25 term-frequency ranking
//! - **Vector**: cosine distance between query and chunk embeddings
//!
//! Scores are min-max normalized and combined with a configurable alpha
//! weight; see [`HybridRetriever`].

mod chunk;
mod error;
mod fusion;
mod lexical;
mod vector;

pub use chunk::{Chunk, ChunkerConfig, chunk_text};
pub use error::RetrievalError;
pub use fusion::{HybridRetriever, RetrieverConfig, ScoredChunk, min_max_normalize};
pub use lexical::Bm25Index;
pub use vector::VectorIndex;
