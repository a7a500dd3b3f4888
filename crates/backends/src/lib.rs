//! Narrow async ports to the external services the conversation handlers
//! call: text generation, vector similarity search, key-value storage.
//! Reference HTTP clients live next to each port; `mocks` has canned
//! implementations for tests.

pub mod generation;
pub mod kv;
pub mod mocks;
pub mod vector;

pub use generation::{ChatCompletionClient, CompletionRequest, TextGeneration};
pub use kv::{KeyValueStore, MemoryStore};
pub use vector::{HitMetadata, SearchHit, VectorSearch, WeaviateHttpClient};
