use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::workflows::instructions::gateway::{ChatModelGateway, ChatRequest, GatewayError};
use crate::workflows::instructions::schema::InstructionConfig;
use crate::workflows::instructions::service::{AccessTokenVerifier, InstructionService};

pub(super) use crate::workflows::credentials::tests::common::read_json_body;

pub(super) const TOKEN: &str = "builder-token-1";

pub(super) type Service = InstructionService<ScriptedGateway, StaticTokens>;

/// Gateway double that replays canned completions and records every request
/// it saw. An exhausted script fails the call, so a test that expects no
/// model traffic can just leave the script empty and count calls.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedGateway {
    pub(super) fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|reply| (*reply).to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.lock().expect("gateway calls mutex poisoned").len()
    }

    pub(super) fn request(&self, index: usize) -> ChatRequest {
        self.calls.lock().expect("gateway calls mutex poisoned")[index].clone()
    }
}

#[async_trait]
impl ChatModelGateway for ScriptedGateway {
    async fn complete(&self, request: ChatRequest) -> Result<String, GatewayError> {
        self.calls
            .lock()
            .expect("gateway calls mutex poisoned")
            .push(request);
        self.replies
            .lock()
            .expect("gateway replies mutex poisoned")
            .pop_front()
            .ok_or(GatewayError::EmptyCompletion)
    }
}

pub(super) struct StaticTokens(pub(super) &'static str);

impl AccessTokenVerifier for StaticTokens {
    fn verify(&self, token: &str) -> bool {
        token == self.0
    }
}

pub(super) fn build_service(replies: &[&str]) -> (Arc<Service>, Arc<ScriptedGateway>) {
    let gateway = Arc::new(ScriptedGateway::replying(replies));
    let service = Arc::new(InstructionService::new(
        Arc::clone(&gateway),
        Arc::new(StaticTokens(TOKEN)),
    ));
    (service, gateway)
}

/// A config the validator accepts, in the exact wire dialect.
pub(super) fn sample_config_json() -> String {
    r#"{
  "version": 2,
  "settings": {
    "showProgressBar": true,
    "allowStepSkip": false,
    "completionBehavior": "all_steps",
    "externalSubmissionAllowed": false
  },
  "steps": [
    {
      "id": "step-1",
      "order": 1,
      "title": "Upload your certificate",
      "type": "document_upload",
      "required": true,
      "blocks": [
        {
          "id": "block-1-1",
          "order": 1,
          "type": "paragraph",
          "content": {
            "text": "Upload the certificate you received after finishing the course."
          }
        },
        {
          "id": "block-1-2",
          "order": 2,
          "type": "document",
          "content": {
            "uploadLabel": "Upload certificate",
            "acceptedTypes": ["application/pdf", "image/jpeg"],
            "maxSizeMB": 10,
            "required": true,
            "extractionFields": [
              {
                "id": "field-1",
                "key": "completion_date",
                "label": "Completion date",
                "type": "date",
                "required": true,
                "source": "ai_generated"
              }
            ]
          }
        }
      ],
      "completion": { "type": "form_submit" }
    },
    {
      "id": "step-2",
      "order": 2,
      "title": "Sign the attestation",
      "type": "signature",
      "required": true,
      "blocks": [
        {
          "id": "block-2-1",
          "order": 1,
          "type": "signature_pad",
          "content": {
            "label": "Sign here",
            "required": true,
            "allowTyped": true,
            "allowDrawn": true,
            "agreementText": "I completed this course myself."
          }
        }
      ],
      "completion": { "type": "form_submit" }
    }
  ]
}"#
    .to_string()
}

pub(super) fn sample_config() -> InstructionConfig {
    serde_json::from_str(&sample_config_json()).expect("sample config parses")
}
