use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client as Http;
use serde_json::{json, Value};

/// One text-generation request. Options left `None` fall back to the
/// client's defaults.
#[derive(Clone, Debug, Default)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Text-generation port. Handlers and agents call through this; the engine
/// never sees it.
#[async_trait]
pub trait TextGeneration: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug)]
pub struct ChatCompletionClient {
    http: Http,
    api_key: String,
    model: String,
    base_url: String,
    default_temperature: f32,
}

impl ChatCompletionClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Ok(Self {
            http: Http::builder().pool_max_idle_per_host(8).build()?,
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            default_temperature: 0.7,
        })
    }

    /// Convenience: pick up OPENAI_API_KEY and GPT_MODEL from env.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
        let model = std::env::var("GPT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Self::new(key, model)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = temperature;
        self
    }
}

#[async_trait]
impl TextGeneration for ChatCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut msgs: Vec<Value> = Vec::new();
        if let Some(system) = &request.system_prompt {
            msgs.push(json!({ "role": "system", "content": system }));
        }
        msgs.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = json!({
            "model": self.model,
            "messages": msgs,
            "temperature": request.temperature.unwrap_or(self.default_temperature),
        });
        if let Some(max_tokens) = request.max_tokens {
            body.as_object_mut()
                .expect("body is an object")
                .insert("max_tokens".into(), json!(max_tokens));
        }

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("completion request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!(
                "completion endpoint {}: {}",
                resp.status(),
                resp.text().await.unwrap_or_default()
            ));
        }

        let v: Value = resp.json().await.context("invalid completion json")?;
        let content = v
            .pointer("/choices/0/message/content")
            .and_then(|x| x.as_str())
            .ok_or_else(|| anyhow!("missing choices[0].message.content"))?;
        Ok(content.trim().to_string())
    }
}
