//! Prompt text and document heuristics for the generation service.
//!
//! The schema description embedded in [`GENERATION_SYSTEM_PROMPT`] must stay
//! in lockstep with [`super::schema`]: the model is asked to emit exactly the
//! JSON those types deserialize.

/// System prompt for full-config generation. Also reused when a chat
/// conversation is turned into a config.
pub(crate) const GENERATION_SYSTEM_PROMPT: &str = r#"You are an instruction-flow designer for a driver credentialing platform. Admins describe a credential requirement and you produce the step-by-step submission flow drivers will walk through.

Output a single JSON object with this exact shape:

{
  "version": 2,
  "settings": {
    "showProgressBar": boolean,
    "allowStepSkip": boolean,
    "completionBehavior": "all_steps" | "required_only",
    "externalSubmissionAllowed": boolean
  },
  "steps": [
    {
      "id": "step-1",
      "order": 1,
      "title": "...",
      "type": "information" | "external_action" | "form_input" | "document_upload" | "signature" | "knowledge_check" | "admin_verify",
      "required": boolean,
      "blocks": [ { "id": "block-1-1", "order": 1, "type": "...", "content": { ... } } ],
      "completion": { "type": "auto" | "manual" | "form_submit" | "external_confirm" | "quiz_pass" }
    }
  ]
}

Block types and their content objects:
- heading: { "text": string, "level": 1 | 2 | 3 }
- paragraph: { "text": string }
- alert: { "variant": "info" | "warning" | "success" | "error", "title": string, "message": string }
- form_field: { "key": string, "label": string, "type": "text" | "number" | "date" | "select" | "textarea" | "checkbox" | "email" | "phone", "required": boolean, "placeholder"?: string, "helpText"?: string, "options"?: [{ "value": string, "label": string }] }
- file_upload: { "label": string, "accept": string, "maxSizeMB": number, "multiple": boolean, "required": boolean, "helpText"?: string }
- document: { "uploadLabel": string, "uploadDescription"?: string, "acceptedTypes": [string], "maxSizeMB": number, "required": boolean, "extractionFields": [{ "id": string, "key": string, "label": string, "type": "text" | "date" | "number" | "email" | "phone", "required": boolean, "extractionHints"?: [string], "source": "ai_generated" | "user_specified" }], "extractionContext"?: string }
- signature_pad: { "label": string, "required": boolean, "allowTyped": boolean, "allowDrawn": boolean, "agreementText"?: string }
- checklist: { "title"?: string, "items": [{ "id": string, "text": string, "required": boolean }], "requireAllChecked": boolean }
- external_link: { "url": string, "title": string, "description"?: string, "buttonText": string, "trackVisit": boolean, "requireVisit": boolean, "opensInNewTab": boolean }
- video: { "source": "youtube" | "vimeo" | "upload", "url": string, "title"?: string, "requireWatch": boolean, "watchPercentRequired"?: number }
- loom_video: { "url": string, "title"?: string }
- image: { "url": string, "alt": string, "caption"?: string }
- divider: { "style": "solid" | "dashed" | "dotted" }
- date_entry: { "key": string, "label": string, "required": boolean, "helpText"?: string }
- quiz_question: { "question": string, "questionType": "multiple_choice" | "true_false" | "text", "options"?: [{ "id": string, "text": string, "isCorrect": boolean }], "correctAnswer"?: string, "explanation"?: string, "allowRetry": boolean, "required": boolean }

Rules:
- Step ids are "step-1", "step-2", ... in order. Block ids are "block-<step>-<n>", so the second block of step 3 is "block-3-2".
- Set showProgressBar to true when there are two or more steps.
- Use a document block (not a bare file_upload) whenever data should be pulled from the uploaded file, and list the fields to extract.
- Steps that collect input complete on form_submit; purely informational steps complete on auto; quiz steps complete on quiz_pass with a passScore.
- Do not open a step with a heading that repeats the step title. Only add headings when a step has distinct sections.
- Keep upload labels short ("Upload certificate", not a full sentence).
- Mark steps and inputs required unless the admin said they are optional.
- ONLY output the JSON object. No markdown fences, no commentary."#;

/// System prompt for the conversational builder. The model must answer with
/// a JSON envelope, never a bare string, so the service can carry interactive
/// components and staged config updates alongside the visible reply.
pub(crate) const CHAT_SYSTEM_PROMPT: &str = r#"You help an admin work out the requirements for a driver credential through short back-and-forth conversation. You do not write the final configuration here; you gather requirements and stage updates.

Always answer with a single JSON object:

{
  "response": "what the admin sees",
  "component": null or an interactive component (see below),
  "configUpdates": null or a partial config object reflecting what was agreed,
  "hasPendingChanges": boolean,
  "readyToGenerate": boolean
}

Components:
- Ask whether an unfamiliar document should have its data extracted: { "type": "extract_or_upload", "documentName": "..." }
- Offer extraction fields to pick from: { "type": "field_selection", "documentName": "...", "suggestedFields": [{ "key": "...", "label": "...", "defaultChecked": boolean }] }

Rules:
- Ask one question at a time and keep responses to a sentence or two.
- When the admin mentions a document requirement you have not asked about yet, attach an extract_or_upload component for it.
- When requirements are settled, say so and set readyToGenerate to true.
- Set hasPendingChanges to true whenever configUpdates is present.
- ONLY output the JSON object."#;

/// System prompt for refining an existing config conversationally.
pub(crate) const REFINE_SYSTEM_PROMPT_PREFIX: &str = r#"You help an admin revise the instruction flow of an existing driver credential. The current configuration is below. Discuss changes in plain language and stage them as partial config updates; do not output the whole revised configuration in chat.

Answer with the same JSON envelope every time:

{
  "response": "what the admin sees",
  "component": null,
  "configUpdates": null or a partial config object with just the changed pieces,
  "hasPendingChanges": boolean,
  "readyToGenerate": boolean
}

Set readyToGenerate to true once the admin has confirmed the changes they want.
ONLY output the JSON object.

Current configuration:
"#;

/// System prompt for summarizing a config before a refinement conversation.
pub(crate) const SUMMARY_SYSTEM_PROMPT: &str = "You summarize driver-credential instruction flows. Given the configuration JSON, reply with a short plain-text rundown: one line per step naming what the driver does there, then one line on overall settings worth knowing. No JSON, no markdown headings.";

/// System prompt for the requirements-analysis mode.
pub(crate) const ANALYZE_SYSTEM_PROMPT: &str = "You review a described credential requirement for a driver credentialing platform. Reply in plain text with: the steps a submission flow should have, any documents involved and the fields worth extracting from them, and questions the admin still needs to answer. Keep it under ten lines. No JSON.";

pub(crate) fn generation_user_prompt(credential_name: Option<&str>, prompt: &str) -> String {
    match credential_name.map(str::trim) {
        Some(name) if !name.is_empty() => format!(
            "Create an instruction flow for a credential called \"{name}\". Here's what it should include:\n\n{prompt}"
        ),
        _ => format!("Create an instruction flow based on this description:\n\n{prompt}"),
    }
}

pub(crate) fn repair_prompt(errors: &[String]) -> String {
    let mut text = String::from(
        "That JSON does not match the required schema. Problems found:\n",
    );
    for error in errors {
        text.push_str("- ");
        text.push_str(error);
        text.push('\n');
    }
    text.push_str("\nOutput the corrected, complete JSON object. ONLY output the JSON object.");
    text
}

pub(crate) fn finalize_prompt(document_lines: &[String]) -> String {
    let mut text = String::from(
        "Generate the complete instruction configuration for everything we agreed on in this conversation.",
    );
    if !document_lines.is_empty() {
        text.push_str("\n\nDocuments to include:\n");
        for line in document_lines {
            text.push_str("- ");
            text.push_str(line);
            text.push('\n');
        }
    }
    text.push_str("\nONLY output the JSON object.");
    text
}

/// Marker inserted in place of dropped history when a conversation outgrows
/// the context window.
pub(crate) fn elision_marker(dropped: usize) -> String {
    format!("[Earlier conversation summarized: {dropped} messages about credential configuration]")
}

/// Extraction fields suggested for document types the platform sees all the
/// time. Matched by substring against what the admin called the document.
const KNOWN_DOCUMENTS: &[(&str, &[(&str, &str)])] = &[
    (
        "insurance",
        &[
            ("policy_number", "Policy number"),
            ("carrier", "Insurance carrier"),
            ("effective_date", "Effective date"),
            ("expiration_date", "Expiration date"),
            ("coverage_amount", "Coverage amount"),
        ],
    ),
    (
        "license",
        &[
            ("license_number", "License number"),
            ("state", "Issuing state"),
            ("class", "License class"),
            ("expiration_date", "Expiration date"),
        ],
    ),
    (
        "registration",
        &[
            ("plate_number", "Plate number"),
            ("vin", "VIN"),
            ("state", "Registration state"),
            ("expiration_date", "Expiration date"),
        ],
    ),
    (
        "dot physical",
        &[
            ("examiner_name", "Examiner name"),
            ("certificate_number", "Certificate number"),
            ("exam_date", "Exam date"),
            ("expiration_date", "Expiration date"),
        ],
    ),
    (
        "drug test",
        &[
            ("test_date", "Test date"),
            ("result", "Result"),
            ("lab_name", "Lab name"),
        ],
    ),
    (
        "training certificate",
        &[
            ("course_name", "Course name"),
            ("completion_date", "Completion date"),
            ("provider", "Provider"),
        ],
    ),
];

/// Fallback suggestions when the admin confirms extraction for a document
/// type the table does not cover.
pub(crate) const GENERIC_EXTRACTION_FIELDS: &[(&str, &str)] = &[
    ("document_number", "Document number"),
    ("issue_date", "Issue date"),
    ("expiration_date", "Expiration date"),
];

pub(crate) fn known_document_fields(name: &str) -> Option<&'static [(&'static str, &'static str)]> {
    let lowered = name.to_lowercase();
    KNOWN_DOCUMENTS
        .iter()
        .find(|(label, _)| lowered.contains(label))
        .map(|(_, fields)| *fields)
}

/// Scans free text for a mention of a known document type, returning the
/// table label when one appears.
pub(crate) fn known_document_mention(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    KNOWN_DOCUMENTS
        .iter()
        .map(|(label, _)| *label)
        .find(|label| lowered.contains(label))
}
