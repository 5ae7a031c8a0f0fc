//! Versioned instruction-config schema.
//!
//! Credential types carry one of these documents to drive the multi-step
//! submission form. The JSON layout is a fixed contract shared with stored
//! configs and with the model prompts: camelCase keys, and blocks as a
//! tagged union on `type` with the body under a sibling `content` object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_VERSION: u32 = 2;

/// Top-level instruction document attached to a credential type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionConfig {
    pub version: u32,
    pub settings: InstructionSettings,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionSettings {
    pub show_progress_bar: bool,
    pub allow_step_skip: bool,
    pub completion_behavior: CompletionBehavior,
    pub external_submission_allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionBehavior {
    AllSteps,
    RequiredOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub order: u32,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub required: bool,
    pub blocks: Vec<ContentBlock>,
    #[serde(default)]
    pub conditions: Vec<StepCondition>,
    pub completion: StepCompletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Information,
    ExternalAction,
    FormInput,
    DocumentUpload,
    Signature,
    KnowledgeCheck,
    AdminVerify,
}

/// Visibility rule evaluated against earlier form answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCondition {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    In,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepCompletion {
    #[serde(rename = "type")]
    pub kind: CompletionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_complete_on_view: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_score: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    Auto,
    Manual,
    FormSubmit,
    ExternalConfirm,
    QuizPass,
}

/// One renderable unit inside a step. `body` flattens to the sibling
/// `type`/`content` pair on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: String,
    pub order: u32,
    #[serde(flatten)]
    pub body: BlockBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum BlockBody {
    Heading(HeadingContent),
    Paragraph(ParagraphContent),
    Alert(AlertContent),
    FormField(FormFieldContent),
    FileUpload(FileUploadContent),
    Document(DocumentContent),
    SignaturePad(SignaturePadContent),
    Checklist(ChecklistContent),
    ExternalLink(ExternalLinkContent),
    Video(VideoContent),
    LoomVideo(LoomVideoContent),
    Image(ImageContent),
    Divider(DividerContent),
    DateEntry(DateEntryContent),
    QuizQuestion(QuizQuestionContent),
}

impl BlockBody {
    pub const fn kind(&self) -> &'static str {
        match self {
            BlockBody::Heading(_) => "heading",
            BlockBody::Paragraph(_) => "paragraph",
            BlockBody::Alert(_) => "alert",
            BlockBody::FormField(_) => "form_field",
            BlockBody::FileUpload(_) => "file_upload",
            BlockBody::Document(_) => "document",
            BlockBody::SignaturePad(_) => "signature_pad",
            BlockBody::Checklist(_) => "checklist",
            BlockBody::ExternalLink(_) => "external_link",
            BlockBody::Video(_) => "video",
            BlockBody::LoomVideo(_) => "loom_video",
            BlockBody::Image(_) => "image",
            BlockBody::Divider(_) => "divider",
            BlockBody::DateEntry(_) => "date_entry",
            BlockBody::QuizQuestion(_) => "quiz_question",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingContent {
    pub text: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertContent {
    pub variant: AlertVariant,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertVariant {
    Info,
    Warning,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldContent {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FormFieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldKind {
    Text,
    Number,
    Date,
    Select,
    Textarea,
    Checkbox,
    Email,
    Phone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadContent {
    pub label: String,
    pub accept: String,
    #[serde(rename = "maxSizeMB")]
    pub max_size_mb: u32,
    pub multiple: bool,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

/// Upload plus structured extraction of named fields from the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContent {
    pub upload_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_description: Option<String>,
    pub accepted_types: Vec<String>,
    #[serde(rename = "maxSizeMB")]
    pub max_size_mb: u32,
    pub required: bool,
    pub extraction_fields: Vec<ExtractionField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionField {
    pub id: String,
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ExtractionFieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_hints: Option<Vec<String>>,
    pub source: FieldSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionFieldKind {
    Text,
    Date,
    Number,
    Email,
    Phone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    AiGenerated,
    UserSpecified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePadContent {
    pub label: String,
    pub required: bool,
    pub allow_typed: bool,
    pub allow_drawn: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: Vec<ChecklistItem>,
    pub require_all_checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLinkContent {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub button_text: String,
    pub track_visit: bool,
    pub require_visit: bool,
    pub opens_in_new_tab: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContent {
    pub source: VideoSource,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub require_watch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_percent_required: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    Youtube,
    Vimeo,
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoomVideoContent {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    pub url: String,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividerContent {
    pub style: DividerStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividerStyle {
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateEntryContent {
    pub key: String,
    pub label: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionContent {
    pub question: String,
    pub question_type: QuizQuestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<QuizOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub allow_retry: bool,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizQuestionKind {
    MultipleChoice,
    TrueFalse,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

impl InstructionConfig {
    /// Structural checks beyond what deserialization enforces. All problems
    /// are collected so a repair prompt can list every one at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.version != SCHEMA_VERSION {
            errors.push(format!(
                "version must be {SCHEMA_VERSION}, got {}",
                self.version
            ));
        }
        if self.steps.is_empty() {
            errors.push("at least one step is required".to_string());
        }

        let mut step_ids = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if step.id.is_empty() {
                errors.push("every step needs a non-empty id".to_string());
            } else if step_ids.contains(&step.id.as_str()) {
                errors.push(format!("duplicate step id {:?}", step.id));
            } else {
                step_ids.push(step.id.as_str());
            }

            if step.blocks.is_empty() {
                errors.push(format!("step {:?} has no blocks", step.id));
            }

            let mut block_ids = Vec::with_capacity(step.blocks.len());
            for block in &step.blocks {
                if block.id.is_empty() {
                    errors.push(format!("step {:?} has a block without an id", step.id));
                } else if block_ids.contains(&block.id.as_str()) {
                    errors.push(format!(
                        "duplicate block id {:?} in step {:?}",
                        block.id, step.id
                    ));
                } else {
                    block_ids.push(block.id.as_str());
                }
                self.validate_block(step, block, &mut errors);
            }

            match step.completion.kind {
                CompletionKind::QuizPass => {
                    let has_quiz = step
                        .blocks
                        .iter()
                        .any(|block| matches!(block.body, BlockBody::QuizQuestion(_)));
                    if !has_quiz {
                        errors.push(format!(
                            "step {:?} completes on quiz_pass but has no quiz_question block",
                            step.id
                        ));
                    }
                }
                CompletionKind::FormSubmit => {
                    let has_input = step.blocks.iter().any(|block| {
                        matches!(
                            block.body,
                            BlockBody::FormField(_)
                                | BlockBody::DateEntry(_)
                                | BlockBody::FileUpload(_)
                                | BlockBody::Document(_)
                                | BlockBody::SignaturePad(_)
                        )
                    });
                    if !has_input {
                        errors.push(format!(
                            "step {:?} completes on form_submit but collects no input",
                            step.id
                        ));
                    }
                }
                CompletionKind::Auto
                | CompletionKind::Manual
                | CompletionKind::ExternalConfirm => {}
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_block(&self, step: &Step, block: &ContentBlock, errors: &mut Vec<String>) {
        match &block.body {
            BlockBody::Heading(content) => {
                if !(1..=3).contains(&content.level) {
                    errors.push(format!(
                        "heading {:?} in step {:?} has level {}, expected 1-3",
                        block.id, step.id, content.level
                    ));
                }
            }
            BlockBody::FormField(content) => {
                if content.kind == FormFieldKind::Select
                    && content.options.as_ref().map_or(true, Vec::is_empty)
                {
                    errors.push(format!(
                        "select field {:?} in step {:?} has no options",
                        block.id, step.id
                    ));
                }
            }
            BlockBody::Document(content) => {
                if content.accepted_types.is_empty() {
                    errors.push(format!(
                        "document block {:?} in step {:?} accepts no file types",
                        block.id, step.id
                    ));
                }
            }
            BlockBody::Checklist(content) => {
                if content.items.is_empty() {
                    errors.push(format!(
                        "checklist {:?} in step {:?} has no items",
                        block.id, step.id
                    ));
                }
            }
            BlockBody::QuizQuestion(content) => {
                if content.question_type == QuizQuestionKind::MultipleChoice {
                    let correct = content
                        .options
                        .as_deref()
                        .unwrap_or_default()
                        .iter()
                        .filter(|option| option.is_correct)
                        .count();
                    if correct == 0 {
                        errors.push(format!(
                            "quiz question {:?} in step {:?} has no correct option",
                            block.id, step.id
                        ));
                    }
                }
            }
            BlockBody::Paragraph(_)
            | BlockBody::Alert(_)
            | BlockBody::FileUpload(_)
            | BlockBody::SignaturePad(_)
            | BlockBody::ExternalLink(_)
            | BlockBody::Video(_)
            | BlockBody::LoomVideo(_)
            | BlockBody::Image(_)
            | BlockBody::Divider(_)
            | BlockBody::DateEntry(_) => {}
        }
    }
}
