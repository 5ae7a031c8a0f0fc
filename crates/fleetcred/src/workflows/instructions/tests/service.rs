use super::common::{build_service, sample_config, sample_config_json};
use crate::workflows::instructions::domain::{
    ChatComponent, ComponentResponse, ExtractChoice, GenerationMode, GenerationRequest,
    GenerationResponse, PendingDocument, PendingDocumentStatus,
};
use crate::workflows::instructions::gateway::{ChatTurn, TurnRole};
use crate::workflows::instructions::service::GenerationError;

fn request(mode: GenerationMode) -> GenerationRequest {
    GenerationRequest {
        mode,
        prompt: None,
        credential_name: None,
        messages: Vec::new(),
        existing_config: None,
        component_response: None,
        pending_documents: Vec::new(),
    }
}

fn chat_envelope(response: &str) -> String {
    serde_json::json!({
        "response": response,
        "component": null,
        "configUpdates": null,
        "hasPendingChanges": false,
        "readyToGenerate": false,
    })
    .to_string()
}

#[tokio::test]
async fn short_prompts_are_rejected_before_any_model_call() {
    let (service, gateway) = build_service(&[]);
    let mut generate = request(GenerationMode::Generate);
    generate.prompt = Some("  too short  ".to_string());

    let error = service.generate(generate).await.expect_err("rejected");

    assert_eq!(
        error.to_string(),
        "Please provide a more detailed description (at least 10 characters)"
    );
    assert!(error.is_client_error());
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn generation_parses_a_clean_completion() {
    let reply = sample_config_json();
    let (service, gateway) = build_service(&[reply.as_str()]);
    let mut generate = request(GenerationMode::Generate);
    generate.prompt = Some("Upload the course certificate and sign an attestation".to_string());
    generate.credential_name = Some("Defensive Driving Certificate".to_string());

    let response = service.generate(generate).await.expect("generates");

    let GenerationResponse::Config { config } = response else {
        panic!("expected a config response");
    };
    assert_eq!(config.steps.len(), 2);
    assert_eq!(gateway.call_count(), 1);

    let call = gateway.request(0);
    assert!(call.json_response);
    assert_eq!(call.max_tokens, 4000);
    assert_eq!(call.messages.len(), 1);
    assert!(call.messages[0]
        .content
        .contains("a credential called \"Defensive Driving Certificate\""));
}

#[tokio::test]
async fn fenced_completions_still_parse() {
    let reply = format!("Here you go:\n```json\n{}\n```", sample_config_json());
    let (service, gateway) = build_service(&[reply.as_str()]);
    let mut generate = request(GenerationMode::Generate);
    generate.prompt = Some("Collect a signed lease agreement from the driver".to_string());

    let response = service.generate(generate).await.expect("generates");

    assert!(matches!(response, GenerationResponse::Config { .. }));
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn invalid_output_gets_exactly_one_repair_round() {
    let empty_steps = r#"{"version": 2, "settings": {"showProgressBar": false, "allowStepSkip": false, "completionBehavior": "all_steps", "externalSubmissionAllowed": false}, "steps": []}"#;
    let good = sample_config_json();
    let (service, gateway) = build_service(&[empty_steps, good.as_str()]);
    let mut generate = request(GenerationMode::Generate);
    generate.prompt = Some("Upload the course certificate and sign it".to_string());

    let response = service.generate(generate).await.expect("repaired");

    assert!(matches!(response, GenerationResponse::Config { .. }));
    assert_eq!(gateway.call_count(), 2);

    let repair = gateway.request(1);
    assert_eq!(repair.messages.len(), 3);
    assert_eq!(repair.messages[1].role, TurnRole::Assistant);
    assert!(repair.messages[2].content.contains("Problems found"));
    assert!(repair.messages[2]
        .content
        .contains("at least one step is required"));
}

#[tokio::test]
async fn a_failed_repair_surfaces_the_problems() {
    let empty_steps = r#"{"version": 2, "settings": {"showProgressBar": false, "allowStepSkip": false, "completionBehavior": "all_steps", "externalSubmissionAllowed": false}, "steps": []}"#;
    let (service, gateway) = build_service(&[empty_steps, empty_steps]);
    let mut generate = request(GenerationMode::Generate);
    generate.prompt = Some("Upload the course certificate and sign it".to_string());

    let error = service.generate(generate).await.expect_err("gives up");

    assert!(matches!(error, GenerationError::InvalidModelOutput(_)));
    assert!(error
        .to_string()
        .contains("at least one step is required"));
    assert_eq!(gateway.call_count(), 2);
}

#[tokio::test]
async fn chat_needs_a_running_conversation() {
    let (service, gateway) = build_service(&[]);

    let error = service
        .generate(request(GenerationMode::Chat))
        .await
        .expect_err("rejected");

    assert!(matches!(error, GenerationError::MissingMessages));
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn known_documents_skip_the_extract_question() {
    let (service, gateway) = build_service(&[]);
    let mut chat = request(GenerationMode::Chat);
    chat.messages = vec![ChatTurn::user(
        "Drivers need to upload their insurance card every year",
    )];

    let response = service.generate(chat).await.expect("replies");

    let GenerationResponse::Chat(reply) = response else {
        panic!("expected a chat reply");
    };
    let Some(ChatComponent::FieldSelection {
        document_name,
        suggested_fields,
    }) = reply.component
    else {
        panic!("expected a field selection component");
    };
    assert_eq!(document_name, "insurance");
    assert!(suggested_fields
        .iter()
        .any(|field| field.key == "policy_number" && field.default_checked));
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn documents_already_tracked_go_to_the_model() {
    let envelope = chat_envelope("Noted, the insurance card is covered.");
    let (service, gateway) = build_service(&[envelope.as_str()]);
    let mut chat = request(GenerationMode::Chat);
    chat.messages = vec![ChatTurn::user("Anything else needed for the insurance?")];
    chat.pending_documents = vec![PendingDocument {
        name: "Insurance card".to_string(),
        status: PendingDocumentStatus::Configured,
        choice: Some(ExtractChoice::Extract),
        fields: vec!["policy_number".to_string()],
    }];

    let response = service.generate(chat).await.expect("replies");

    let GenerationResponse::Chat(reply) = response else {
        panic!("expected a chat reply");
    };
    assert_eq!(reply.response, "Noted, the insurance card is covered.");
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn choosing_extraction_opens_a_field_picker() {
    let (service, gateway) = build_service(&[]);
    let mut chat = request(GenerationMode::Chat);
    chat.messages = vec![ChatTurn::user("Yes, let's extract it")];
    chat.component_response = Some(ComponentResponse::ExtractOrUpload {
        document_name: "meal delivery permit".to_string(),
        choice: ExtractChoice::Extract,
    });

    let response = service.generate(chat).await.expect("replies");

    let GenerationResponse::Chat(reply) = response else {
        panic!("expected a chat reply");
    };
    let Some(ChatComponent::FieldSelection {
        suggested_fields, ..
    }) = reply.component
    else {
        panic!("expected a field selection component");
    };
    assert!(suggested_fields
        .iter()
        .any(|field| field.key == "document_number"));
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn upload_only_answers_reach_the_model_as_context() {
    let envelope = chat_envelope("Got it, upload only.");
    let (service, gateway) = build_service(&[envelope.as_str()]);
    let mut chat = request(GenerationMode::Chat);
    chat.messages = vec![ChatTurn::user("No extraction needed")];
    chat.component_response = Some(ComponentResponse::ExtractOrUpload {
        document_name: "meal delivery permit".to_string(),
        choice: ExtractChoice::Upload,
    });

    let response = service.generate(chat).await.expect("replies");

    assert!(matches!(response, GenerationResponse::Chat(_)));
    let call = gateway.request(0);
    let context = &call.messages.last().expect("context turn").content;
    assert!(context.contains("upload-only"));
    assert!(context.contains("meal delivery permit"));
}

#[tokio::test]
async fn chat_envelopes_carry_staged_updates() {
    let envelope = serde_json::json!({
        "response": "Added the skip rule.",
        "configUpdates": {"settings": {"allowStepSkip": true}},
        "readyToGenerate": true,
    })
    .to_string();
    let (service, gateway) = build_service(&[envelope.as_str()]);
    let mut chat = request(GenerationMode::Chat);
    chat.messages = vec![ChatTurn::user("Let drivers skip the optional steps")];

    let response = service.generate(chat).await.expect("replies");

    let GenerationResponse::Chat(reply) = response else {
        panic!("expected a chat reply");
    };
    assert_eq!(reply.response, "Added the skip rule.");
    assert!(reply.has_pending_changes);
    assert!(reply.ready_to_generate);
    assert_eq!(
        reply.config_updates.expect("updates staged")["settings"]["allowStepSkip"],
        true
    );
    assert_eq!(gateway.request(0).max_tokens, 1200);
}

#[tokio::test]
async fn plain_text_replies_degrade_gracefully() {
    let (service, _) = build_service(&["Sure, tell me more about the certificate."]);
    let mut chat = request(GenerationMode::Chat);
    chat.messages = vec![ChatTurn::user("We need a new driver orientation credential")];

    let response = service.generate(chat).await.expect("replies");

    let GenerationResponse::Chat(reply) = response else {
        panic!("expected a chat reply");
    };
    assert_eq!(reply.response, "Sure, tell me more about the certificate.");
    assert!(reply.component.is_none());
    assert!(!reply.has_pending_changes);
    assert!(!reply.ready_to_generate);
}

#[tokio::test]
async fn long_conversations_are_windowed() {
    let envelope = chat_envelope("Still with you.");
    let (service, gateway) = build_service(&[envelope.as_str()]);
    let mut chat = request(GenerationMode::Chat);
    chat.messages = (1..=25)
        .map(|n| {
            let content = format!("turn-{n}");
            if n % 2 == 1 {
                ChatTurn::user(content)
            } else {
                ChatTurn::assistant(content)
            }
        })
        .collect();

    service.generate(chat).await.expect("replies");

    let sent = gateway.request(0).messages;
    assert_eq!(sent.len(), 18);
    assert_eq!(sent[0].content, "turn-1");
    assert_eq!(sent[1].content, "turn-2");
    assert_eq!(sent[2].role, TurnRole::Assistant);
    assert_eq!(
        sent[2].content,
        "[Earlier conversation summarized: 8 messages about credential configuration]"
    );
    assert_eq!(sent[3].content, "turn-11");
    assert_eq!(sent[17].content, "turn-25");
}

#[tokio::test]
async fn refinement_needs_the_existing_config() {
    let (service, gateway) = build_service(&[]);
    let mut refine = request(GenerationMode::RefineExisting);
    refine.messages = vec![ChatTurn::user("Drop the signature step")];

    let error = service.generate(refine).await.expect_err("rejected");

    assert!(matches!(error, GenerationError::MissingConfig));
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn refinement_embeds_the_current_config() {
    let envelope = chat_envelope("I can drop step 2.");
    let (service, gateway) = build_service(&[envelope.as_str()]);
    let mut refine = request(GenerationMode::RefineExisting);
    refine.messages = vec![ChatTurn::user("Drop the signature step")];
    refine.existing_config = Some(sample_config());

    let response = service.generate(refine).await.expect("replies");

    assert!(matches!(response, GenerationResponse::Chat(_)));
    let system = gateway.request(0).system;
    assert!(system.contains("Current configuration:"));
    assert!(system.contains("\"id\":\"step-2\""));
}

#[tokio::test]
async fn finished_chats_finalize_into_configs() {
    let reply = sample_config_json();
    let (service, gateway) = build_service(&[reply.as_str()]);
    let mut finalize = request(GenerationMode::GenerateFromChat);
    finalize.messages = vec![
        ChatTurn::user("Drivers upload a course certificate"),
        ChatTurn::assistant("Understood. Anything else?"),
        ChatTurn::user("They also sign an attestation"),
    ];
    finalize.pending_documents = vec![
        PendingDocument {
            name: "course certificate".to_string(),
            status: PendingDocumentStatus::Configured,
            choice: Some(ExtractChoice::Extract),
            fields: vec!["completion_date".to_string(), "provider".to_string()],
        },
        PendingDocument {
            name: "meal delivery permit".to_string(),
            status: PendingDocumentStatus::Configured,
            choice: Some(ExtractChoice::Upload),
            fields: Vec::new(),
        },
    ];

    let response = service.generate(finalize).await.expect("generates");

    assert!(matches!(response, GenerationResponse::Config { .. }));
    let call = gateway.request(0);
    let closing = &call.messages.last().expect("closing turn").content;
    assert!(closing.contains("Documents to include:"));
    assert!(closing.contains("course certificate: extract completion_date, provider"));
    assert!(closing.contains("meal delivery permit: upload only"));
}

#[tokio::test]
async fn refine_from_chat_prepends_the_config_to_revise() {
    let reply = sample_config_json();
    let (service, gateway) = build_service(&[reply.as_str()]);
    let mut finalize = request(GenerationMode::RefineFromChat);
    finalize.messages = vec![ChatTurn::user("Make the signature step optional")];
    finalize.existing_config = Some(sample_config());

    let response = service.generate(finalize).await.expect("generates");

    assert!(matches!(response, GenerationResponse::Config { .. }));
    let first = &gateway.request(0).messages[0].content;
    assert!(first.starts_with("Current configuration to revise:"));
}

#[tokio::test]
async fn summaries_come_back_as_plain_text() {
    let (service, gateway) = build_service(&["Two steps: upload the certificate, then sign."]);
    let mut summarize = request(GenerationMode::SummarizeForRefinement);
    summarize.existing_config = Some(sample_config());

    let response = service.generate(summarize).await.expect("summarizes");

    let GenerationResponse::Summary { summary } = response else {
        panic!("expected a summary");
    };
    assert_eq!(summary, "Two steps: upload the certificate, then sign.");
    let call = gateway.request(0);
    assert!(!call.json_response);
    assert_eq!(call.max_tokens, 600);
}

#[tokio::test]
async fn analysis_gates_the_prompt_like_generation() {
    let (service, gateway) = build_service(&[]);
    let mut analyze = request(GenerationMode::Analyze);
    analyze.prompt = Some("permit".to_string());

    let error = service.generate(analyze).await.expect_err("rejected");

    assert!(matches!(error, GenerationError::PromptTooShort));
    assert_eq!(gateway.call_count(), 0);
}
