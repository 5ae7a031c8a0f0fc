//! Mode dispatch for the instruction builder's model calls.
//!
//! Every mode funnels through one gateway call shape. Config-producing
//! modes get a single repair round when the model's JSON fails validation;
//! chat modes degrade to a plain-text turn when the envelope does not parse.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::domain::{
    ChatComponent, ChatReply, ComponentResponse, ExtractChoice, GenerationMode,
    GenerationRequest, GenerationResponse, SuggestedField,
};
use super::gateway::{ChatModelGateway, ChatRequest, ChatTurn, GatewayError, TurnRole};
use super::prompt;
use super::schema::InstructionConfig;

const GENERATION_TOKENS: u32 = 4000;
const CHAT_TOKENS: u32 = 1200;
const SUMMARY_TOKENS: u32 = 600;
const TEMPERATURE: f32 = 0.7;
const MIN_PROMPT_CHARS: usize = 10;

/// Conversations longer than this are elided down to the first
/// [`WINDOW_HEAD`] and last [`WINDOW_TAIL`] turns.
const MESSAGE_WINDOW: usize = 20;
const WINDOW_HEAD: usize = 2;
const WINDOW_TAIL: usize = 15;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Please provide a more detailed description (at least 10 characters)")]
    PromptTooShort,
    #[error("this mode needs the running conversation")]
    MissingMessages,
    #[error("this mode needs the existing configuration")]
    MissingConfig,
    #[error("the model could not produce a valid configuration: {0}")]
    InvalidModelOutput(String),
    #[error("configuration could not be serialized")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl GenerationError {
    /// Faults in the request itself, as opposed to model or transport
    /// failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GenerationError::PromptTooShort
                | GenerationError::MissingMessages
                | GenerationError::MissingConfig
        )
    }
}

/// Backend check that a builder session token is still good.
pub trait AccessTokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> bool;
}

/// Turns builder requests into model calls and checked replies.
pub struct InstructionService<G, V> {
    gateway: Arc<G>,
    tokens: Arc<V>,
    generation_tokens: u32,
}

impl<G, V> InstructionService<G, V>
where
    G: ChatModelGateway,
    V: AccessTokenVerifier,
{
    pub fn new(gateway: Arc<G>, tokens: Arc<V>) -> Self {
        Self {
            gateway,
            tokens,
            generation_tokens: GENERATION_TOKENS,
        }
    }

    /// Overrides the completion budget for config-producing modes.
    pub fn with_generation_tokens(mut self, generation_tokens: u32) -> Self {
        self.generation_tokens = generation_tokens;
        self
    }

    /// Checked by the route before any model call happens.
    pub fn verify_token(&self, token: &str) -> bool {
        self.tokens.verify(token)
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let request_id = Uuid::new_v4();
        tracing::info!(%request_id, mode = ?request.mode, "instruction generation requested");
        match request.mode {
            GenerationMode::Generate => self.generate_config(request).await,
            GenerationMode::Analyze => self.analyze(request).await,
            GenerationMode::Chat => self.chat(request).await,
            GenerationMode::RefineExisting => self.refine(request).await,
            GenerationMode::GenerateFromChat | GenerationMode::RefineFromChat => {
                self.config_from_chat(request).await
            }
            GenerationMode::SummarizeForRefinement => self.summarize(request).await,
        }
    }

    async fn generate_config(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let description = trimmed_prompt(&request)?;
        let user = prompt::generation_user_prompt(request.credential_name.as_deref(), description);
        let config = self.config_with_repair(vec![ChatTurn::user(user)]).await?;
        Ok(GenerationResponse::Config { config })
    }

    async fn analyze(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let description = trimmed_prompt(&request)?;
        let summary = self
            .complete(
                prompt::ANALYZE_SYSTEM_PROMPT,
                vec![ChatTurn::user(description)],
                SUMMARY_TOKENS,
                false,
            )
            .await?;
        Ok(GenerationResponse::Summary { summary })
    }

    async fn chat(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        if request.messages.is_empty() {
            return Err(GenerationError::MissingMessages);
        }
        if let Some(reply) = component_shortcut(&request) {
            return Ok(GenerationResponse::Chat(reply));
        }
        let mut messages = windowed(request.messages);
        if let Some(response) = &request.component_response {
            messages.push(ChatTurn::user(component_context(response)));
        }
        let raw = self
            .complete(prompt::CHAT_SYSTEM_PROMPT, messages, CHAT_TOKENS, true)
            .await?;
        Ok(GenerationResponse::Chat(parse_envelope(&raw)))
    }

    async fn refine(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        if request.messages.is_empty() {
            return Err(GenerationError::MissingMessages);
        }
        let Some(config) = &request.existing_config else {
            return Err(GenerationError::MissingConfig);
        };
        if let Some(reply) = component_shortcut(&request) {
            return Ok(GenerationResponse::Chat(reply));
        }
        let system = format!(
            "{}{}",
            prompt::REFINE_SYSTEM_PROMPT_PREFIX,
            serde_json::to_string(config)?
        );
        let mut messages = windowed(request.messages);
        if let Some(response) = &request.component_response {
            messages.push(ChatTurn::user(component_context(response)));
        }
        let raw = self.complete(&system, messages, CHAT_TOKENS, true).await?;
        Ok(GenerationResponse::Chat(parse_envelope(&raw)))
    }

    async fn config_from_chat(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        if request.messages.is_empty() {
            return Err(GenerationError::MissingMessages);
        }
        let mut messages = windowed(request.messages.clone());
        if request.mode == GenerationMode::RefineFromChat {
            let Some(config) = &request.existing_config else {
                return Err(GenerationError::MissingConfig);
            };
            messages.insert(
                0,
                ChatTurn::user(format!(
                    "Current configuration to revise:\n{}",
                    serde_json::to_string(config)?
                )),
            );
        }
        messages.push(ChatTurn::user(prompt::finalize_prompt(&document_lines(
            &request,
        ))));
        let config = self.config_with_repair(messages).await?;
        Ok(GenerationResponse::Config { config })
    }

    async fn summarize(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let Some(config) = &request.existing_config else {
            return Err(GenerationError::MissingConfig);
        };
        let summary = self
            .complete(
                prompt::SUMMARY_SYSTEM_PROMPT,
                vec![ChatTurn::user(serde_json::to_string(config)?)],
                SUMMARY_TOKENS,
                false,
            )
            .await?;
        Ok(GenerationResponse::Summary { summary })
    }

    /// One completion, then at most one repair round carrying the validation
    /// problems back to the model.
    async fn config_with_repair(
        &self,
        mut messages: Vec<ChatTurn>,
    ) -> Result<InstructionConfig, GenerationError> {
        let raw = self
            .complete(
                prompt::GENERATION_SYSTEM_PROMPT,
                messages.clone(),
                self.generation_tokens,
                true,
            )
            .await?;
        match parse_config(&raw) {
            Ok(config) => Ok(config),
            Err(problems) => {
                tracing::warn!(
                    problems = problems.len(),
                    "model output failed validation, asking for a repair"
                );
                messages.push(ChatTurn::assistant(raw));
                messages.push(ChatTurn::user(prompt::repair_prompt(&problems)));
                let retry = self
                    .complete(
                        prompt::GENERATION_SYSTEM_PROMPT,
                        messages,
                        self.generation_tokens,
                        true,
                    )
                    .await?;
                parse_config(&retry)
                    .map_err(|problems| GenerationError::InvalidModelOutput(problems.join("; ")))
            }
        }
    }

    async fn complete(
        &self,
        system: &str,
        messages: Vec<ChatTurn>,
        max_tokens: u32,
        json_response: bool,
    ) -> Result<String, GenerationError> {
        Ok(self
            .gateway
            .complete(ChatRequest {
                system: system.to_string(),
                messages,
                max_tokens,
                temperature: TEMPERATURE,
                json_response,
            })
            .await?)
    }
}

fn trimmed_prompt(request: &GenerationRequest) -> Result<&str, GenerationError> {
    let description = request.prompt.as_deref().map(str::trim).unwrap_or_default();
    if description.chars().count() < MIN_PROMPT_CHARS {
        return Err(GenerationError::PromptTooShort);
    }
    Ok(description)
}

/// Protocol steps the service can answer without a model call: extraction
/// confirmations become field pickers, and mentions of well-known document
/// types skip the extract-or-upload question entirely.
fn component_shortcut(request: &GenerationRequest) -> Option<ChatReply> {
    match &request.component_response {
        Some(ComponentResponse::ExtractOrUpload {
            document_name,
            choice: ExtractChoice::Extract,
        }) => {
            let fields = prompt::known_document_fields(document_name)
                .unwrap_or(prompt::GENERIC_EXTRACTION_FIELDS);
            Some(field_selection_reply(
                document_name.clone(),
                fields,
                format!(
                    "Which fields should be pulled from the {document_name}? Untick anything you don't need."
                ),
            ))
        }
        Some(_) => None,
        None => {
            let last_user = request
                .messages
                .iter()
                .rev()
                .find(|turn| turn.role == TurnRole::User)?;
            let label = prompt::known_document_mention(&last_user.content)?;
            let tracked = request
                .pending_documents
                .iter()
                .any(|doc| doc.name.to_lowercase().contains(label));
            if tracked {
                return None;
            }
            let fields = prompt::known_document_fields(label)?;
            Some(field_selection_reply(
                label.to_string(),
                fields,
                format!(
                    "A {label} is a document we extract data from routinely. These are the usual fields; untick anything you don't need."
                ),
            ))
        }
    }
}

fn field_selection_reply(
    document_name: String,
    fields: &[(&str, &str)],
    response: String,
) -> ChatReply {
    let suggested_fields = fields
        .iter()
        .map(|(key, label)| SuggestedField {
            key: (*key).to_string(),
            label: (*label).to_string(),
            default_checked: true,
        })
        .collect();
    ChatReply {
        response,
        component: Some(ChatComponent::FieldSelection {
            document_name,
            suggested_fields,
        }),
        config_updates: None,
        has_pending_changes: false,
        ready_to_generate: false,
    }
}

/// Renders a component answer as conversation context the model can read.
fn component_context(response: &ComponentResponse) -> String {
    match response {
        ComponentResponse::ExtractOrUpload {
            document_name,
            choice,
        } => match choice {
            ExtractChoice::Extract => {
                format!("[Component answer: extract data from the {document_name}.]")
            }
            ExtractChoice::Upload => {
                format!("[Component answer: the {document_name} is upload-only, no extraction.]")
            }
        },
        ComponentResponse::FieldSelection {
            document_name,
            selected_fields,
            other_fields,
        } => {
            let mut text = format!(
                "[Component answer: extract these fields from the {document_name}: {}.",
                selected_fields.join(", ")
            );
            if !other_fields.trim().is_empty() {
                text.push_str(" Also requested: ");
                text.push_str(other_fields.trim());
                text.push('.');
            }
            text.push(']');
            text
        }
    }
}

fn document_lines(request: &GenerationRequest) -> Vec<String> {
    request
        .pending_documents
        .iter()
        .map(|doc| match (&doc.choice, doc.fields.is_empty()) {
            (Some(ExtractChoice::Upload), _) => format!("{}: upload only", doc.name),
            (_, false) => format!("{}: extract {}", doc.name, doc.fields.join(", ")),
            _ => doc.name.clone(),
        })
        .collect()
}

fn windowed(messages: Vec<ChatTurn>) -> Vec<ChatTurn> {
    if messages.len() <= MESSAGE_WINDOW {
        return messages;
    }
    let dropped = messages.len() - WINDOW_HEAD - WINDOW_TAIL;
    let mut kept = Vec::with_capacity(WINDOW_HEAD + 1 + WINDOW_TAIL);
    kept.extend_from_slice(&messages[..WINDOW_HEAD]);
    kept.push(ChatTurn::assistant(prompt::elision_marker(dropped)));
    kept.extend_from_slice(&messages[messages.len() - WINDOW_TAIL..]);
    kept
}

/// Models wrap JSON in prose or fences often enough that the parser works
/// on the outermost brace pair instead of the raw completion.
fn extract_json(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn parse_config(raw: &str) -> Result<InstructionConfig, Vec<String>> {
    let config: InstructionConfig = serde_json::from_str(extract_json(raw))
        .map_err(|error| vec![format!("not schema-shaped JSON: {error}")])?;
    config.validate()?;
    Ok(config)
}

/// What the model is told to send back in chat modes. Older model habits
/// (`content`, `partialConfig`) are accepted as aliases.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEnvelope {
    #[serde(default, alias = "content")]
    response: Option<String>,
    #[serde(default)]
    component: Option<ChatComponent>,
    #[serde(default, alias = "partialConfig")]
    config_updates: Option<Value>,
    #[serde(default)]
    has_pending_changes: Option<bool>,
    #[serde(default)]
    ready_to_generate: Option<bool>,
}

fn parse_envelope(raw: &str) -> ChatReply {
    match serde_json::from_str::<ModelEnvelope>(extract_json(raw)) {
        Ok(envelope) => {
            let has_updates = envelope.config_updates.is_some();
            ChatReply {
                response: envelope.response.unwrap_or_default(),
                component: envelope.component,
                config_updates: envelope.config_updates,
                has_pending_changes: envelope.has_pending_changes.unwrap_or(has_updates),
                ready_to_generate: envelope.ready_to_generate.unwrap_or(false),
            }
        }
        Err(_) => ChatReply {
            response: raw.trim().to_string(),
            component: None,
            config_updates: None,
            has_pending_changes: false,
            ready_to_generate: false,
        },
    }
}
