//! Model-assisted instruction building: one-shot generation from a
//! description, a conversational builder with interactive document
//! components, and refinement of stored configs.
//!
//! The schema in [`schema`] doubles as the output contract the model is
//! held to; anything it returns is deserialized and validated before a
//! config leaves this module.

pub mod domain;
pub mod gateway;
mod prompt;
pub mod router;
pub mod schema;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ChatComponent, ChatReply, ComponentResponse, ExtractChoice, GenerationMode,
    GenerationRequest, GenerationResponse, PendingDocument, PendingDocumentStatus,
    SuggestedField,
};
pub use gateway::{
    ChatModelGateway, ChatRequest, ChatTurn, GatewayError, OpenAiChatGateway, TurnRole,
};
pub use router::instruction_router;
pub use schema::{
    AlertContent, AlertVariant, BlockBody, ChecklistContent, ChecklistItem, CompletionBehavior,
    CompletionKind, ConditionOperator, ContentBlock, DateEntryContent, DividerContent,
    DividerStyle, DocumentContent, ExternalLinkContent, ExtractionField, ExtractionFieldKind,
    FieldSource, FileUploadContent, FormFieldContent, FormFieldKind, HeadingContent,
    ImageContent, InstructionConfig, InstructionSettings, LoomVideoContent, ParagraphContent,
    QuizOption, QuizQuestionContent, QuizQuestionKind, SelectOption, SignaturePadContent, Step,
    StepCompletion, StepCondition, StepKind, VideoContent, VideoSource, SCHEMA_VERSION,
};
pub use service::{AccessTokenVerifier, GenerationError, InstructionService};
