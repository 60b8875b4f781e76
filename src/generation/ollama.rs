//! Ollama-backed generator
use super::{GenerationError, Generator, TextStream};
use crate::config::LlmConfig;
use crate::prompt::Prompt;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

const DEFAULT_PORT: u16 = 11434;

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub num_predict: i32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            repeat_penalty: 1.15,
            num_predict: 256,
        }
    }
}

impl From<&LlmConfig> for SamplingOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            repeat_penalty: config.repeat_penalty,
            num_predict: config.num_predict,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Ollama,
    options: SamplingOptions,
    auto_pull: bool,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, options: SamplingOptions, auto_pull: bool) -> Self {
        let (host, port) = parse_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            options,
            auto_pull,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(&config.base_url, SamplingOptions::from(config), config.auto_pull)
    }

    pub fn options(&self) -> SamplingOptions {
        self.options
    }

    /// Names of the models present in the local runtime
    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| GenerationError::Unreachable(format!("is Ollama running? {e}")))?;
        Ok(models.into_iter().map(|m| m.name).collect())
    }

    fn model_options(&self) -> ModelOptions {
        ModelOptions::default()
            .temperature(self.options.temperature)
            .top_p(self.options.top_p)
            .repeat_penalty(self.options.repeat_penalty)
            .num_predict(self.options.num_predict)
    }
}

impl Generator for OllamaGenerator {
    async fn ensure_model(&self, model: &str) -> Result<(), GenerationError> {
        let local = self.list_models().await?;
        if local.iter().any(|name| model_matches(name, model)) {
            debug!("Model available: {}", model);
            return Ok(());
        }

        if !self.auto_pull {
            return Err(GenerationError::ModelMissing {
                model: model.to_string(),
            });
        }

        info!("Pulling model {}", model);
        self.client
            .pull_model(model.to_string(), false)
            .await
            .map_err(|e| {
                warn!("Pull of {} failed: {}", model, e);
                GenerationError::ModelMissing {
                    model: model.to_string(),
                }
            })?;
        info!("Model {} pulled", model);
        Ok(())
    }

    async fn generate(&self, prompt: &Prompt, model: &str) -> Result<TextStream, GenerationError> {
        let request = ChatMessageRequest::new(
            model.to_string(),
            vec![ChatMessage::user(prompt.as_str().to_string())],
        )
        .options(self.model_options());

        debug!(
            "Generating with {} ({} prompt chars)",
            model,
            prompt.char_len()
        );

        let stream = self
            .client
            .send_chat_messages_stream(request)
            .await
            .map_err(|e| classify_request_error(model, &e.to_string()))?;

        let mapped = stream.map(|item| match item {
            Ok(response) => Ok(response.message.content),
            Err(()) => Err(GenerationError::Stream("Ollama stream chunk failed".into())),
        });

        Ok(Box::pin(mapped))
    }
}

/// Ollama reports a missing model as a "not found" error
fn classify_request_error(model: &str, message: &str) -> GenerationError {
    if message.to_lowercase().contains("not found") {
        GenerationError::ModelMissing {
            model: model.to_string(),
        }
    } else {
        GenerationError::Unreachable(message.to_string())
    }
}

/// `mistral` matches a local `mistral:latest`; tagged names must match exactly
fn model_matches(local: &str, wanted: &str) -> bool {
    if local == wanted {
        return true;
    }
    !wanted.contains(':') && local.split(':').next() == Some(wanted) && local.ends_with(":latest")
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        if let Ok(port) = url[colon_pos + 1..].parse::<u16>() {
            return (url[..colon_pos].to_string(), port);
        }
    }
    (url.to_string(), DEFAULT_PORT)
}
