//! Canned port implementations for tests and demos.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::generation::{CompletionRequest, TextGeneration};
use crate::vector::{HitMetadata, SearchHit, VectorSearch};

/// Generation mock that replies with a fixed text and records prompts.
pub struct MockGeneration {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl MockGeneration {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGeneration for MockGeneration {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt);
        Ok(self.reply.clone())
    }
}

/// Generation mock that always fails.
pub struct FailingGeneration;

#[async_trait]
impl TextGeneration for FailingGeneration {
    async fn complete(&self, _request: CompletionRequest) -> Result<String> {
        Err(anyhow!("generation unavailable"))
    }
}

/// Vector search mock serving preloaded hits per collection.
#[derive(Default)]
pub struct MockVectorSearch {
    hits: HashMap<String, Vec<SearchHit>>,
}

impl MockVectorSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, collection: &str, hits: Vec<SearchHit>) -> Self {
        self.hits.insert(collection.to_string(), hits);
        self
    }

    /// Build a hit from `(property, value)` pairs plus a distance.
    pub fn hit(properties: &[(&str, &str)], distance: f64) -> SearchHit {
        let mut map = Map::new();
        for (name, value) in properties {
            map.insert((*name).to_string(), Value::String((*value).to_string()));
        }
        SearchHit {
            properties: map,
            metadata: HitMetadata {
                distance: Some(distance),
            },
        }
    }
}

#[async_trait]
impl VectorSearch for MockVectorSearch {
    async fn search(
        &self,
        collection: &str,
        _query: &str,
        limit: usize,
        _properties: &[&str],
        _with_metadata: bool,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = self.hits.get(collection).cloned().unwrap_or_default();
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Vector search mock that always fails.
pub struct FailingVectorSearch;

#[async_trait]
impl VectorSearch for FailingVectorSearch {
    async fn search(
        &self,
        _collection: &str,
        _query: &str,
        _limit: usize,
        _properties: &[&str],
        _with_metadata: bool,
    ) -> Result<Vec<SearchHit>> {
        Err(anyhow!("vector search unavailable"))
    }
}
