use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::brokers::BrokerId;
use crate::workflows::fleet::{DriverId, EmploymentType, VehicleId, VehicleType};
use crate::workflows::instructions::InstructionConfig;

/// Identifier wrapper for catalog entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialTypeId(pub String);

/// Identifier wrapper for credential instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialCategory {
    Driver,
    Vehicle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialScope {
    Global,
    Broker,
}

/// Which employment arrangements a catalog entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentApplicability {
    #[serde(rename = "both")]
    Both,
    #[serde(rename = "w2_only")]
    W2Only,
    #[serde(rename = "1099_only")]
    Contractor1099Only,
}

impl EmploymentApplicability {
    pub const fn covers(self, employment: EmploymentType) -> bool {
        match self {
            EmploymentApplicability::Both => true,
            EmploymentApplicability::W2Only => matches!(employment, EmploymentType::W2),
            EmploymentApplicability::Contractor1099Only => {
                matches!(employment, EmploymentType::Contractor1099)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementLevel {
    Required,
    Optional,
    Recommended,
}

/// How a subject satisfies a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionType {
    DocumentUpload,
    Photo,
    Signature,
    Form,
    DateEntry,
    AdminVerified,
}

impl SubmissionType {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionType::DocumentUpload => "document_upload",
            SubmissionType::Photo => "photo",
            SubmissionType::Signature => "signature",
            SubmissionType::Form => "form",
            SubmissionType::DateEntry => "date_entry",
            SubmissionType::AdminVerified => "admin_verified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationType {
    Never,
    FixedInterval,
    DriverSpecified,
}

/// Catalog lifecycle. Only `active` and date-reached `scheduled` entries are
/// shown to drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialTypeStatus {
    Draft,
    Scheduled,
    Active,
    Inactive,
}

impl CredentialTypeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CredentialTypeStatus::Draft => "draft",
            CredentialTypeStatus::Scheduled => "scheduled",
            CredentialTypeStatus::Active => "active",
            CredentialTypeStatus::Inactive => "inactive",
        }
    }
}

/// Catalog entry describing one requirement: who it applies to, how it is
/// satisfied, and how it expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialType {
    pub id: CredentialTypeId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: CredentialCategory,
    pub scope: CredentialScope,
    /// Set exactly when `scope` is `broker`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_id: Option<BrokerId>,
    pub employment_type: EmploymentApplicability,
    pub requirement: RequirementLevel,
    /// Vehicle types this entry applies to; empty means all.
    #[serde(default)]
    pub vehicle_types: Vec<VehicleType>,
    pub submission_type: SubmissionType,
    /// Overrides the `admin_verified` heuristic when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_driver_action: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_document_path: Option<String>,
    pub expiration_type: ExpirationType,
    pub expiration_interval_days: Option<u32>,
    pub expiration_warning_days: Option<u32>,
    pub grace_period_days: Option<u32>,
    pub status: CredentialTypeStatus,
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_config: Option<InstructionConfig>,
    pub display_order: u32,
    pub created_at: DateTime<Utc>,
}

impl CredentialType {
    /// Requirements satisfied by staff rather than the subject.
    pub fn is_admin_only(&self) -> bool {
        match self.requires_driver_action {
            Some(requires) => !requires,
            None => self.submission_type == SubmissionType::AdminVerified,
        }
    }

    /// Whether drivers should see and act on this entry at `now`.
    pub fn is_live_for_drivers(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            CredentialTypeStatus::Active => self.effective_date.map_or(true, |date| date <= now),
            CredentialTypeStatus::Scheduled => {
                self.effective_date.map_or(false, |date| date <= now)
            }
            CredentialTypeStatus::Draft | CredentialTypeStatus::Inactive => false,
        }
    }

    pub fn applies_to_vehicle(&self, vehicle_type: VehicleType) -> bool {
        self.vehicle_types.is_empty() || self.vehicle_types.contains(&vehicle_type)
    }

    pub fn warning_window_days(&self) -> i64 {
        i64::from(self.expiration_warning_days.unwrap_or(30))
    }
}

/// Parameters for a new catalog entry. Rows always start in `draft`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCredentialType {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: CredentialCategory,
    pub scope: CredentialScope,
    #[serde(default)]
    pub broker_id: Option<BrokerId>,
    pub employment_type: EmploymentApplicability,
    pub requirement: RequirementLevel,
    #[serde(default)]
    pub vehicle_types: Vec<VehicleType>,
    pub submission_type: SubmissionType,
    #[serde(default)]
    pub requires_driver_action: Option<bool>,
    #[serde(default)]
    pub form_schema: Option<Value>,
    #[serde(default)]
    pub signature_document_path: Option<String>,
    pub expiration_type: ExpirationType,
    #[serde(default)]
    pub expiration_interval_days: Option<u32>,
    #[serde(default)]
    pub expiration_warning_days: Option<u32>,
    #[serde(default)]
    pub grace_period_days: Option<u32>,
    #[serde(default)]
    pub instruction_config: Option<InstructionConfig>,
    #[serde(default)]
    pub display_order: u32,
}

/// Raw stored status of a credential instance. User-facing status is derived,
/// see [`super::resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    NotSubmitted,
    PendingReview,
    Approved,
    Rejected,
    Expired,
}

impl CredentialStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CredentialStatus::NotSubmitted => "not_submitted",
            CredentialStatus::PendingReview => "pending_review",
            CredentialStatus::Approved => "approved",
            CredentialStatus::Rejected => "rejected",
            CredentialStatus::Expired => "expired",
        }
    }
}

/// The entity a credential instance belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CredentialSubject {
    Driver(DriverId),
    Vehicle(VehicleId),
}

impl CredentialSubject {
    pub const fn category(&self) -> CredentialCategory {
        match self {
            CredentialSubject::Driver(_) => CredentialCategory::Driver,
            CredentialSubject::Vehicle(_) => CredentialCategory::Vehicle,
        }
    }

    /// The raw id, used as the owner segment of document paths and as the
    /// actor on self-submitted history rows.
    pub fn raw_id(&self) -> &str {
        match self {
            CredentialSubject::Driver(id) => &id.0,
            CredentialSubject::Vehicle(id) => &id.0,
        }
    }
}

/// One subject's standing against one catalog entry. Created lazily on first
/// need; re-submissions bump `submission_version` instead of inserting rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: CredentialId,
    pub credential_type_id: CredentialTypeId,
    pub subject: CredentialSubject,
    pub status: CredentialStatus,
    pub submission_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entered_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Blank row inserted by the ensure operation.
    pub fn not_submitted(
        id: CredentialId,
        credential_type_id: CredentialTypeId,
        subject: CredentialSubject,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            credential_type_id,
            subject,
            status: CredentialStatus::NotSubmitted,
            submission_version: 0,
            document_path: None,
            signature_data: None,
            form_data: None,
            entered_date: None,
            notes: None,
            expires_at: None,
            submitted_at: None,
            reviewed_at: None,
            reviewed_by: None,
            review_notes: None,
            rejection_reason: None,
            created_at,
        }
    }
}

/// Mechanism-specific payload of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionPayload {
    Document { path: String },
    Photo { path: String },
    Signature { signature_data: String },
    Form { form_data: Value },
    DateEntry { entered_date: NaiveDate },
}

impl SubmissionPayload {
    /// The catalog mechanism this payload satisfies.
    pub const fn expected_type(&self) -> SubmissionType {
        match self {
            SubmissionPayload::Document { .. } => SubmissionType::DocumentUpload,
            SubmissionPayload::Photo { .. } => SubmissionType::Photo,
            SubmissionPayload::Signature { .. } => SubmissionType::Signature,
            SubmissionPayload::Form { .. } => SubmissionType::Form,
            SubmissionPayload::DateEntry { .. } => SubmissionType::DateEntry,
        }
    }
}

/// Full submission body: the payload plus an optional note and, for
/// driver-specified expiration policies, the expiration date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSubmission {
    #[serde(flatten)]
    pub payload: SubmissionPayload,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Reviewer decision applied to a credential instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReviewAction {
    Approve {
        #[serde(default)]
        expires_at: Option<DateTime<Utc>>,
        #[serde(default)]
        notes: Option<String>,
    },
    Reject {
        reason: String,
        #[serde(default)]
        notes: Option<String>,
    },
    Verify {
        #[serde(default)]
        expires_at: Option<DateTime<Utc>>,
        #[serde(default)]
        notes: Option<String>,
    },
    Unverify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialAction {
    Submitted,
    Approved,
    Rejected,
    Verified,
    Unverified,
}

/// Append-only audit row recorded for every submission and review action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub credential_id: CredentialId,
    pub action: CredentialAction,
    pub from_status: CredentialStatus,
    pub to_status: CredentialStatus,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
