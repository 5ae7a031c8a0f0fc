//! Credential catalog, submission intake, and review workflow.
//!
//! The catalog (`CredentialType`) describes what a driver or vehicle must
//! provide; instances (`CredentialRecord`) track one subject's standing
//! against one catalog entry. Raw stored statuses are never shown directly:
//! every caller resolves them through [`resolution`], which owns the
//! expiration, admin-only, and grace-period mapping.

pub mod domain;
pub mod repository;
pub mod resolution;
pub mod router;
pub mod service;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    CredentialAction, CredentialCategory, CredentialId, CredentialRecord, CredentialScope,
    CredentialStatus, CredentialSubject, CredentialSubmission, CredentialType, CredentialTypeId,
    CredentialTypeStatus, EmploymentApplicability, ExpirationType, HistoryEntry,
    NewCredentialType, RequirementLevel, ReviewAction, SubmissionPayload, SubmissionType,
};
pub use repository::{CredentialRepository, RepositoryError};
pub use resolution::{progress, resolve, resolve_for_review, DisplayStatus, ProgressSummary,
    ResolvedCredential};
pub use router::credential_router;
pub use service::{
    CatalogEntryView, CatalogInstanceStats, CredentialService, CredentialServiceError,
    ReviewQueueEntry, ReviewStats, SubjectCredentialsView,
};
