//! Request and reply shapes for the builder's generation endpoint.
//!
//! Field names are camelCase on the wire because the admin builder speaks
//! the same dialect as the stored instruction configs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::gateway::ChatTurn;
use super::schema::InstructionConfig;

/// What the caller wants the model to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One-shot: description in, full config out.
    Generate,
    /// Plain-text read on a described requirement.
    Analyze,
    /// Conversational requirement gathering.
    Chat,
    /// Conversational changes to an existing config.
    RefineExisting,
    /// Turn a finished chat into a full config.
    GenerateFromChat,
    /// Turn a refinement chat plus the existing config into a revised one.
    RefineFromChat,
    /// Short rundown of an existing config to open a refinement chat.
    SummarizeForRefinement,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub mode: GenerationMode,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub credential_name: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
    #[serde(default)]
    pub existing_config: Option<InstructionConfig>,
    #[serde(default)]
    pub component_response: Option<ComponentResponse>,
    #[serde(default)]
    pub pending_documents: Vec<PendingDocument>,
}

/// Interactive card the builder renders inside the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatComponent {
    #[serde(rename_all = "camelCase")]
    ExtractOrUpload { document_name: String },
    #[serde(rename_all = "camelCase")]
    FieldSelection {
        document_name: String,
        suggested_fields: Vec<SuggestedField>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedField {
    pub key: String,
    pub label: String,
    pub default_checked: bool,
}

/// The admin's answer to a component, echoed back on the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentResponse {
    #[serde(rename_all = "camelCase")]
    ExtractOrUpload {
        document_name: String,
        choice: ExtractChoice,
    },
    #[serde(rename_all = "camelCase")]
    FieldSelection {
        document_name: String,
        selected_fields: Vec<String>,
        #[serde(default)]
        other_fields: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractChoice {
    Extract,
    Upload,
}

/// Document the conversation has raised, as tracked by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDocument {
    pub name: String,
    pub status: PendingDocumentStatus,
    #[serde(default)]
    pub choice: Option<ExtractChoice>,
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingDocumentStatus {
    AwaitingChoice,
    AwaitingFields,
    Configured,
}

/// Reply to a generation request; the shape follows the mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GenerationResponse {
    Config { config: InstructionConfig },
    Summary { summary: String },
    Chat(ChatReply),
}

/// One conversational turn back to the builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<ChatComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_updates: Option<Value>,
    pub has_pending_changes: bool,
    pub ready_to_generate: bool,
}
