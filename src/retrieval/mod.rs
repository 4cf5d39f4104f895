//! Retrieval boundary: vector search returning raw candidate documents.

pub mod client;
pub mod embedder;
pub mod error;
pub mod fields;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod pool;


pub use client::{QdrantRetriever, Retriever, build_filter};
pub use embedder::{HttpEmbedder, QueryEmbedder};
pub use error::{RetrievalError, RetrievalResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockRetriever;
pub use model::{CandidateDocument, Filters, Metadata};
pub use pool::BackendPool;
