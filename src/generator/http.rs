//! Network-backed generator over blocking reqwest.
//!
//! One request per call, no retries. Any transport, status or decode failure
//! is logged and replaced by the fallback generation.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Generator, fallback_generation};
use crate::config::ModelConfig;
use crate::error::{EvalError, Result};
use crate::types::{Generation, Usage};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpProvider {
    OpenAi,
    Anthropic,
}

impl HttpProvider {
    fn key_var(&self) -> &'static str {
        match self {
            HttpProvider::OpenAi => "OPENAI_API_KEY",
            HttpProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            HttpProvider::OpenAi => "https://api.openai.com/v1",
            HttpProvider::Anthropic => "https://api.anthropic.com",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            HttpProvider::OpenAi => "gpt-4o-mini",
            HttpProvider::Anthropic => "claude-3-5-haiku-latest",
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            HttpProvider::OpenAi => "openai",
            HttpProvider::Anthropic => "anthropic",
        }
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

/// Chat-completion style HTTP generator.
#[derive(Debug)]
pub struct HttpGenerator {
    provider: HttpProvider,
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HttpGenerator {
    /// Build from config, reading the API key from the environment.
    pub fn from_env(provider: HttpProvider, config: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var(provider.key_var())
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                EvalError::Config(format!(
                    "{} is not set (required by provider '{}')",
                    provider.key_var(),
                    provider.as_str()
                ))
            })?;
        Self::new(provider, api_key, config)
    }

    pub fn new(provider: HttpProvider, api_key: String, config: &ModelConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EvalError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider,
            client,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| provider.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config
                .model_id
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string()),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
        })
    }

    fn call(&self, prompt: &str, stop: Option<&[String]>) -> std::result::Result<(String, Usage), String> {
        let messages = vec![WireMessage {
            role: "user",
            content: prompt,
        }];
        let stop = stop.filter(|s| !s.is_empty());

        match self.provider {
            HttpProvider::OpenAi => {
                let body = ChatRequest {
                    model: &self.model,
                    messages,
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                    stop,
                };
                let resp: ChatResponse = self.post(
                    &format!("{}/chat/completions", self.base_url),
                    &body,
                    |req| req.bearer_auth(&self.api_key),
                )?;
                let text = resp
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| "response had no message content".to_string())?;
                let usage = resp
                    .usage
                    .map(|u| Usage {
                        input_tokens: u.prompt_tokens,
                        output_tokens: u.completion_tokens,
                        total_tokens: u.total_tokens,
                    })
                    .unwrap_or_default();
                Ok((text, usage))
            }
            HttpProvider::Anthropic => {
                let body = MessagesRequest {
                    model: &self.model,
                    messages,
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                    stop_sequences: stop,
                };
                let resp: MessagesResponse = self.post(
                    &format!("{}/v1/messages", self.base_url),
                    &body,
                    |req| {
                        req.header("x-api-key", &self.api_key)
                            .header("anthropic-version", ANTHROPIC_VERSION)
                    },
                )?;
                let text: String = resp.content.into_iter().filter_map(|b| b.text).collect();
                let usage = resp
                    .usage
                    .map(|u| Usage::new(u.input_tokens, u.output_tokens))
                    .unwrap_or_default();
                Ok((text, usage))
            }
        }
    }

    fn post<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &Req,
        auth: impl FnOnce(reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder,
    ) -> std::result::Result<Resp, String> {
        let resp = auth(self.client.post(url).json(body))
            .send()
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().unwrap_or_default();
            return Err(format!("HTTP {status}: {body_text}"));
        }

        resp.json::<Resp>()
            .map_err(|e| format!("deserialization failed: {e}"))
    }
}

impl Generator for HttpGenerator {
    fn generate(&mut self, prompt: &str, stop: Option<&[String]>) -> Generation {
        let start = Instant::now();
        match self.call(prompt, stop) {
            Ok((text, usage)) => {
                let latency = start.elapsed().as_secs_f64();
                debug!(provider = self.provider.as_str(), latency, "generation complete");
                Generation::new(text, usage, latency)
            }
            Err(e) => {
                warn!(
                    provider = self.provider.as_str(),
                    model = %self.model,
                    error = %e,
                    "API call failed, substituting fallback"
                );
                fallback_generation(start.elapsed().as_secs_f64())
            }
        }
    }

    fn name(&self) -> String {
        format!("{}:{}", self.provider.as_str(), self.model)
    }
}
