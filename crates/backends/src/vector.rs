use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client as Http;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One result of a similarity search. `metadata.distance` is the score the
/// match threshold is applied to: lower means closer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchHit {
    pub properties: Map<String, Value>,
    pub metadata: HitMetadata,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HitMetadata {
    pub distance: Option<f64>,
}

impl SearchHit {
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }
}

/// Vector similarity search port.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        properties: &[&str],
        with_metadata: bool,
    ) -> Result<Vec<SearchHit>>;
}

/// Client for a Weaviate-style GraphQL search endpoint.
#[derive(Clone, Debug)]
pub struct WeaviateHttpClient {
    http: Http,
    base_url: String,
    api_key: Option<String>,
}

impl WeaviateHttpClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http: Http::builder().pool_max_idle_per_host(8).build()?,
            base_url,
            api_key,
        })
    }

    pub fn from_env() -> Result<Self> {
        let url = std::env::var("WEAVIATE_URL").context("WEAVIATE_URL not set")?;
        Self::new(url, std::env::var("WEAVIATE_API_KEY").ok())
    }

    fn build_query(collection: &str, query: &str, limit: usize, properties: &[&str], with_metadata: bool) -> String {
        // GraphQL string literal: escape backslashes and quotes
        let escaped = query.replace('\\', "\\\\").replace('"', "\\\"");
        let mut fields = properties.join(" ");
        if with_metadata {
            if !fields.is_empty() {
                fields.push(' ');
            }
            fields.push_str("_additional { distance }");
        }
        format!(
            "{{ Get {{ {collection}(nearText: {{concepts: [\"{escaped}\"]}}, limit: {limit}) {{ {fields} }} }} }}"
        )
    }
}

#[async_trait]
impl VectorSearch for WeaviateHttpClient {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        properties: &[&str],
        with_metadata: bool,
    ) -> Result<Vec<SearchHit>> {
        let graphql = Self::build_query(collection, query, limit, properties, with_metadata);
        let url = format!("{}/v1/graphql", self.base_url);

        let mut req = self.http.post(url).json(&json!({ "query": graphql }));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("vector search request failed")?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "search endpoint {}: {}",
                resp.status(),
                resp.text().await.unwrap_or_default()
            ));
        }

        let v: Value = resp.json().await.context("invalid search json")?;
        if let Some(errors) = v.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                return Err(anyhow!("search returned errors: {errors:?}"));
            }
        }

        let items = v
            .pointer(&format!("/data/Get/{collection}"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let hits = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(mut fields) => {
                    let distance = fields
                        .remove("_additional")
                        .as_ref()
                        .and_then(|a| a.pointer("/distance"))
                        .and_then(Value::as_f64);
                    Some(SearchHit {
                        properties: fields,
                        metadata: HitMetadata { distance },
                    })
                }
                _ => None,
            })
            .collect();

        Ok(hits)
    }
}
