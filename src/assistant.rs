//! Prompt assembly, model invocation, and the end-to-end query pipeline.
//!
//! ```text
//! query ──▶ sensor log (latest N) ──▶ render_sensor_status ─┐
//!       └─▶ ContextRetriever::retrieve_context ─────────────┼─▶ PromptTemplate ─▶ ChatModel
//!                                                           │
//!                                                  user_query
//! ```
//!
//! Neither step can abort a query: a missing sensor log renders as "no data",
//! a [`RetrievalError`](crate::error::RetrievalError) becomes the fallback
//! context, and a model failure becomes [`MODEL_FALLBACK`]. Either fallback
//! marks the [`Answer`] as degraded.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::config::Config;
use crate::embedding;
use crate::error::AssistantError;
use crate::index::DocumentIndexer;
use crate::llm::{self, ChatModel};
use crate::models::SensorSnapshot;
use crate::progress::{IndexProgressReporter, NoProgress};
use crate::prompt::{PromptInputs, PromptTemplate};
use crate::retrieve::ContextRetriever;
use crate::sensors;
use crate::status::render_sensor_status;

/// Returned in place of an answer when the model call fails.
pub const MODEL_FALLBACK: &str = "Error: Could not process query. Please try again.";

/// Prompt template plus model handle, built once at startup.
pub struct FarmAssistant {
    template: PromptTemplate,
    model: Box<dyn ChatModel>,
}

impl FarmAssistant {
    pub fn new(template: PromptTemplate, model: Box<dyn ChatModel>) -> Self {
        Self { template, model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn render_prompt(&self, query: &str, snapshots: &[SensorSnapshot], context: &str) -> String {
        let sensor_status = render_sensor_status(snapshots);
        self.template.render(&PromptInputs {
            sensor_status: &sensor_status,
            rag_context: context,
            user_query: query,
        })
    }

    pub async fn answer(
        &self,
        query: &str,
        snapshots: &[SensorSnapshot],
        context: &str,
    ) -> Result<String, AssistantError> {
        let prompt = self.render_prompt(query, snapshots, context);
        tracing::info!(model = self.model.model_name(), "querying language model");
        let response = self.model.complete(&prompt).await?;
        tracing::info!("received response from language model");
        Ok(response)
    }
}

/// The outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub response: String,
    /// The retrieved context (or the retrieval fallback message).
    #[serde(skip)]
    pub context: String,
    /// True when retrieval or the model fell back to a fixed message.
    pub degraded: bool,
}

pub struct Pipeline {
    config: Config,
    retriever: ContextRetriever,
    assistant: FarmAssistant,
}

impl Pipeline {
    pub fn new(config: Config, retriever: ContextRetriever, assistant: FarmAssistant) -> Self {
        Self {
            config,
            retriever,
            assistant,
        }
    }

    /// Wire up the configured embedding provider, chat model, and prompt.
    /// A missing or invalid prompt template is an error here.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        Self::from_config_with_progress(config, Box::new(NoProgress))
    }

    pub fn from_config_with_progress(
        config: Config,
        progress: Box<dyn IndexProgressReporter>,
    ) -> anyhow::Result<Self> {
        let template = PromptTemplate::load(&config.llm.prompt_path)
            .context("failed to load prompt template")?;
        let provider: Arc<dyn embedding::EmbeddingProvider> =
            Arc::from(embedding::create_provider(&config.embedding)?);
        let model = llm::create_chat_model(&config.llm)?;

        let indexer = DocumentIndexer::new(&config, provider).with_progress(progress);
        let retriever = ContextRetriever::new(&config, indexer);
        let assistant = FarmAssistant::new(template, model);
        Ok(Self::new(config, retriever, assistant))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn retriever(&self) -> &ContextRetriever {
        &self.retriever
    }

    pub fn assistant(&self) -> &FarmAssistant {
        &self.assistant
    }

    pub fn latest_sensor_data(&self) -> Vec<SensorSnapshot> {
        sensors::get_latest_sensor_data(
            &self.config.sensors.log_path,
            self.config.sensors.num_entries,
        )
    }

    /// Read sensors, retrieve context, and ask the model.
    pub async fn ask(&mut self, query: &str) -> Answer {
        tracing::info!("processing query");
        let snapshots = self.latest_sensor_data();
        let k = self.config.retrieval.top_k;
        let (context, retrieval_degraded) = match self.retriever.try_retrieve(query, k).await {
            Ok(context) => (context, false),
            Err(e) => {
                tracing::error!("retrieval failed: {}", e);
                (self.retriever.fallback_message(), true)
            }
        };

        let (response, model_degraded) =
            match self.assistant.answer(query, &snapshots, &context).await {
                Ok(response) => (response, false),
                Err(e) => {
                    tracing::error!("language model query failed: {}", e);
                    (MODEL_FALLBACK.to_string(), true)
                }
            };

        Answer {
            response,
            context,
            degraded: retrieval_degraded || model_degraded,
        }
    }
}
