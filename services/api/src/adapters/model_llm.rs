//! services/api/src/adapters/model_llm.rs
//!
//! This module contains the adapter for the generative language model.
//! It implements the `LanguageModelService` port from the `core` crate.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use snapstudy_core::ports::{
    LanguageModelService, ModelPurpose, ModelRequest, PortError, PortResult,
};

use crate::config::Config;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `LanguageModelService` using an OpenAI-compatible chat API.
#[derive(Clone)]
pub struct OpenAiModelAdapter {
    client: Client<OpenAIConfig>,
    study_model: String,
    tutor_model: String,
}

impl OpenAiModelAdapter {
    /// Creates a new `OpenAiModelAdapter`.
    pub fn new(client: Client<OpenAIConfig>, study_model: String, tutor_model: String) -> Self {
        Self {
            client,
            study_model,
            tutor_model,
        }
    }

    /// Builds the adapter from configuration, giving the underlying HTTP client
    /// the extended model timeout.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.openai_api_key);
        if let Some(base) = &config.openai_api_base {
            openai_config = openai_config.with_api_base(base);
        }
        let http_client = reqwest::Client::builder()
            .timeout(config.model_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        // A model call is made once; failures go straight back to the caller.
        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(no_retry);

        Ok(Self::new(
            client,
            config.study_model.clone(),
            config.tutor_model.clone(),
        ))
    }
}

//=========================================================================================
// `LanguageModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl LanguageModelService for OpenAiModelAdapter {
    /// Sends the instructions as the system message and the input as the user message.
    async fn complete(&self, request: &ModelRequest) -> PortResult<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.instructions.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.input.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let mut args = CreateChatCompletionRequestArgs::default();
        args.messages(messages).n(1);
        match request.purpose {
            ModelPurpose::Generation => {
                args.model(&self.study_model);
            }
            ModelPurpose::Tutor => {
                args.model(&self.tutor_model)
                    .temperature(0.7)
                    .top_p(0.95)
                    .max_tokens(2048u32);
            }
        }
        let chat_request = args
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // No choices and no text both mean the model said nothing.
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(PortError::EmptyModelResponse)
    }
}
