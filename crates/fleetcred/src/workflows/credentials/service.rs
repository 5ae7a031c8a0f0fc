use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::QueryCache;
use crate::storage::{
    credential_document_path, DocumentStore, DocumentStoreError, SignedUrl, StoredDocument,
};
use crate::workflows::fleet::{Driver, DriverId, FleetRepository, Vehicle, VehicleId};
use crate::workflows::instructions::{BlockBody, ConditionOperator, InstructionConfig, Step};

use super::domain::{
    CredentialAction, CredentialCategory, CredentialId, CredentialRecord, CredentialScope,
    CredentialStatus, CredentialSubject, CredentialSubmission, CredentialType, CredentialTypeId,
    CredentialTypeStatus, ExpirationType, HistoryEntry, NewCredentialType, ReviewAction,
    SubmissionPayload, SubmissionType,
};
use super::repository::{CredentialRepository, RepositoryError};
use super::resolution::{self, DisplayStatus, ProgressSummary, ResolvedCredential};

type JoinedRows = Vec<(CredentialType, Option<CredentialRecord>)>;

/// Service composing the catalog, credential instances, fleet lookups, and
/// the document store. Subject-scoped reads go through a read-through cache
/// invalidated by every mutation that could change them.
pub struct CredentialService<R, F, S> {
    repository: Arc<R>,
    fleet: Arc<F>,
    store: Arc<S>,
    subject_cache: QueryCache<CredentialSubject, JoinedRows>,
}

static CREDENTIAL_TYPE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CREDENTIAL_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static HISTORY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_type_id() -> CredentialTypeId {
    let id = CREDENTIAL_TYPE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CredentialTypeId(format!("ctype-{id:06}"))
}

fn next_credential_id() -> CredentialId {
    let id = CREDENTIAL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CredentialId(format!("cred-{id:06}"))
}

fn next_history_id() -> String {
    let id = HISTORY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("hist-{id:06}")
}

// A step gates its inputs on earlier answers; a step whose conditions do not
// hold is skipped and makes no demands.
fn step_applies(step: &Step, answers: &Map<String, Value>) -> bool {
    step.conditions.iter().all(|condition| {
        let answer = answers.get(&condition.field).unwrap_or(&Value::Null);
        match condition.operator {
            ConditionOperator::Equals => *answer == condition.value,
            ConditionOperator::NotEquals => *answer != condition.value,
            ConditionOperator::Contains => match (answer, &condition.value) {
                (Value::String(haystack), Value::String(needle)) => {
                    haystack.contains(needle.as_str())
                }
                (Value::Array(items), needle) => items.contains(needle),
                _ => false,
            },
            ConditionOperator::In => condition
                .value
                .as_array()
                .map_or(false, |options| options.contains(answer)),
        }
    })
}

fn blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Required inputs declared by the type's instruction flow must arrive with
/// non-blank values. Only required steps whose conditions hold count.
fn validate_form_payload(
    config: &InstructionConfig,
    form_data: &Value,
) -> Result<(), CredentialServiceError> {
    let Some(answers) = form_data.as_object() else {
        return Err(CredentialServiceError::InvalidSubmission(
            "form data must be a JSON object".to_string(),
        ));
    };
    let missing: Vec<&str> = config
        .steps
        .iter()
        .filter(|step| step.required && step_applies(step, answers))
        .flat_map(|step| step.blocks.iter())
        .filter_map(|block| match &block.body {
            BlockBody::FormField(field) if field.required => Some(field.key.as_str()),
            BlockBody::DateEntry(entry) if entry.required => Some(entry.key.as_str()),
            _ => None,
        })
        .filter(|key| answers.get(*key).map_or(true, blank))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(CredentialServiceError::InvalidSubmission(format!(
        "missing required form fields: {}",
        missing.join(", ")
    )))
}

// Reviewer-provided dates win; fixed intervals count from the review moment.
fn approved_expiration(
    credential_type: &CredentialType,
    explicit: Option<DateTime<Utc>>,
    submitted: Option<DateTime<Utc>>,
    reviewed_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if explicit.is_some() {
        return explicit;
    }
    match credential_type.expiration_type {
        ExpirationType::Never => None,
        ExpirationType::FixedInterval => credential_type
            .expiration_interval_days
            .map(|days| reviewed_at + Duration::days(i64::from(days))),
        ExpirationType::DriverSpecified => submitted,
    }
}

impl<R, F, S> CredentialService<R, F, S>
where
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    pub fn new(repository: Arc<R>, fleet: Arc<F>, store: Arc<S>) -> Self {
        Self {
            repository,
            fleet,
            store,
            subject_cache: QueryCache::new(),
        }
    }

    /// Add a catalog entry. New entries always start in `draft` and become
    /// visible to drivers only once activated or scheduled.
    pub fn create_type(
        &self,
        draft: NewCredentialType,
    ) -> Result<CredentialType, CredentialServiceError> {
        let row = CredentialType {
            id: next_type_id(),
            name: draft.name,
            description: draft.description,
            category: draft.category,
            scope: draft.scope,
            broker_id: draft.broker_id,
            employment_type: draft.employment_type,
            requirement: draft.requirement,
            vehicle_types: draft.vehicle_types,
            submission_type: draft.submission_type,
            requires_driver_action: draft.requires_driver_action,
            form_schema: draft.form_schema,
            signature_document_path: draft.signature_document_path,
            expiration_type: draft.expiration_type,
            expiration_interval_days: draft.expiration_interval_days,
            expiration_warning_days: draft.expiration_warning_days,
            grace_period_days: draft.grace_period_days,
            status: CredentialTypeStatus::Draft,
            effective_date: None,
            instruction_config: draft.instruction_config,
            display_order: draft.display_order,
            created_at: Utc::now(),
        };
        validate_type_shape(&row)?;
        let stored = self.repository.insert_type(row)?;
        self.subject_cache.clear();
        Ok(stored)
    }

    /// Replace a catalog entry wholesale. Lifecycle fields move through the
    /// dedicated transitions, not this method.
    pub fn update_type(
        &self,
        mut row: CredentialType,
    ) -> Result<CredentialType, CredentialServiceError> {
        let current = self
            .repository
            .fetch_type(&row.id)?
            .ok_or(CredentialServiceError::UnknownType)?;
        row.status = current.status;
        row.effective_date = current.effective_date;
        row.created_at = current.created_at;
        validate_type_shape(&row)?;
        self.repository.update_type(row.clone())?;
        self.subject_cache.clear();
        Ok(row)
    }

    pub fn schedule_type(
        &self,
        id: &CredentialTypeId,
        effective_date: DateTime<Utc>,
    ) -> Result<CredentialType, CredentialServiceError> {
        self.transition_type(id, |row| match row.status {
            CredentialTypeStatus::Draft | CredentialTypeStatus::Scheduled => {
                row.status = CredentialTypeStatus::Scheduled;
                row.effective_date = Some(effective_date);
                Ok(())
            }
            other => Err(CredentialServiceError::InvalidCatalogChange(format!(
                "cannot schedule a {} entry",
                other.label()
            ))),
        })
    }

    pub fn activate_type(
        &self,
        id: &CredentialTypeId,
    ) -> Result<CredentialType, CredentialServiceError> {
        self.transition_type(id, |row| match row.status {
            CredentialTypeStatus::Draft | CredentialTypeStatus::Scheduled => {
                row.status = CredentialTypeStatus::Active;
                Ok(())
            }
            other => Err(CredentialServiceError::InvalidCatalogChange(format!(
                "cannot activate a {} entry",
                other.label()
            ))),
        })
    }

    pub fn deactivate_type(
        &self,
        id: &CredentialTypeId,
    ) -> Result<CredentialType, CredentialServiceError> {
        self.transition_type(id, |row| match row.status {
            CredentialTypeStatus::Active | CredentialTypeStatus::Scheduled => {
                row.status = CredentialTypeStatus::Inactive;
                Ok(())
            }
            other => Err(CredentialServiceError::InvalidCatalogChange(format!(
                "cannot deactivate a {} entry",
                other.label()
            ))),
        })
    }

    fn transition_type(
        &self,
        id: &CredentialTypeId,
        apply: impl FnOnce(&mut CredentialType) -> Result<(), CredentialServiceError>,
    ) -> Result<CredentialType, CredentialServiceError> {
        let mut row = self
            .repository
            .fetch_type(id)?
            .ok_or(CredentialServiceError::UnknownType)?;
        apply(&mut row)?;
        self.repository.update_type(row.clone())?;
        self.subject_cache.clear();
        Ok(row)
    }

    /// Catalog listing with usage counters, ordered for display.
    pub fn catalog(&self) -> Result<Vec<CatalogEntryView>, CredentialServiceError> {
        let now = Utc::now();
        let records = self.repository.records()?;
        let mut types = self.repository.types()?;
        types.sort_by_key(|row| row.display_order);

        let views = types
            .into_iter()
            .map(|credential_type| {
                let mut instances = CatalogInstanceStats::default();
                for record in records
                    .iter()
                    .filter(|record| record.credential_type_id == credential_type.id)
                {
                    instances.total += 1;
                    match record.status {
                        CredentialStatus::Approved => instances.approved += 1,
                        CredentialStatus::PendingReview => instances.pending_review += 1,
                        _ => {}
                    }
                }
                CatalogEntryView {
                    live_for_drivers: credential_type.is_live_for_drivers(now),
                    credential_type,
                    instances,
                }
            })
            .collect();
        Ok(views)
    }

    /// Create the `not_submitted` row for (subject, type) if none exists.
    /// Idempotent: repeated calls return the original row.
    pub fn ensure(
        &self,
        subject: CredentialSubject,
        credential_type_id: &CredentialTypeId,
    ) -> Result<CredentialRecord, CredentialServiceError> {
        let credential_type = self
            .repository
            .fetch_type(credential_type_id)?
            .ok_or(CredentialServiceError::UnknownType)?;
        self.subject_summary(&subject)?;
        if credential_type.category != subject.category() {
            return Err(CredentialServiceError::CategoryMismatch);
        }

        if let Some(existing) = self
            .repository
            .for_subject(&subject)?
            .into_iter()
            .find(|row| row.credential_type_id == *credential_type_id)
        {
            return Ok(existing);
        }

        let record = CredentialRecord::not_submitted(
            next_credential_id(),
            credential_type_id.clone(),
            subject.clone(),
            Utc::now(),
        );
        let stored = self.repository.insert(record)?;
        self.subject_cache.invalidate(&subject);
        Ok(stored)
    }

    /// Apply a driver submission. Re-submission bumps the version, clears
    /// prior review fields, and puts the row back in front of reviewers.
    pub fn submit(
        &self,
        id: &CredentialId,
        submission: CredentialSubmission,
    ) -> Result<CredentialRecord, CredentialServiceError> {
        let mut record = self
            .repository
            .fetch(id)?
            .ok_or(CredentialServiceError::UnknownCredential)?;
        let credential_type = self
            .repository
            .fetch_type(&record.credential_type_id)?
            .ok_or(CredentialServiceError::UnknownType)?;

        if credential_type.is_admin_only() {
            return Err(CredentialServiceError::AdminOnlySubmission);
        }
        if submission.payload.expected_type() != credential_type.submission_type {
            return Err(CredentialServiceError::MechanismMismatch {
                expected: credential_type.submission_type,
            });
        }

        let from_status = record.status;
        let now = Utc::now();

        record.document_path = None;
        record.signature_data = None;
        record.form_data = None;
        record.entered_date = None;
        match submission.payload {
            SubmissionPayload::Document { path } | SubmissionPayload::Photo { path } => {
                record.document_path = Some(path);
            }
            SubmissionPayload::Signature { signature_data } => {
                record.signature_data = Some(signature_data);
            }
            SubmissionPayload::Form { form_data } => {
                if let Some(config) = &credential_type.instruction_config {
                    validate_form_payload(config, &form_data)?;
                }
                record.form_data = Some(form_data);
            }
            SubmissionPayload::DateEntry { entered_date } => {
                record.entered_date = Some(entered_date);
            }
        }
        record.notes = submission.notes;
        // Only driver-specified policies take an expiration at submit time;
        // the rest are stamped at review.
        record.expires_at = match credential_type.expiration_type {
            ExpirationType::DriverSpecified => submission.expires_at,
            _ => None,
        };
        record.status = CredentialStatus::PendingReview;
        record.submission_version += 1;
        record.submitted_at = Some(now);
        record.reviewed_at = None;
        record.reviewed_by = None;
        record.review_notes = None;
        record.rejection_reason = None;

        self.repository.update(record.clone())?;
        self.append_history(
            &record,
            CredentialAction::Submitted,
            from_status,
            record.subject.raw_id().to_string(),
            None,
            now,
        )?;
        self.subject_cache.invalidate(&record.subject);
        Ok(record)
    }

    /// Apply a reviewer decision and record it on the audit trail.
    pub fn review(
        &self,
        id: &CredentialId,
        reviewer: &str,
        action: ReviewAction,
    ) -> Result<CredentialRecord, CredentialServiceError> {
        let mut record = self
            .repository
            .fetch(id)?
            .ok_or(CredentialServiceError::UnknownCredential)?;
        let credential_type = self
            .repository
            .fetch_type(&record.credential_type_id)?
            .ok_or(CredentialServiceError::UnknownType)?;

        let from_status = record.status;
        let now = Utc::now();

        let (history_action, history_notes) = match action {
            ReviewAction::Approve { expires_at, notes } => {
                if record.status != CredentialStatus::PendingReview {
                    return Err(CredentialServiceError::NotPendingReview);
                }
                record.status = CredentialStatus::Approved;
                record.expires_at =
                    approved_expiration(&credential_type, expires_at, record.expires_at, now);
                record.reviewed_at = Some(now);
                record.reviewed_by = Some(reviewer.to_string());
                record.review_notes = notes.clone();
                record.rejection_reason = None;
                (CredentialAction::Approved, notes)
            }
            ReviewAction::Reject { reason, notes } => {
                if record.status != CredentialStatus::PendingReview {
                    return Err(CredentialServiceError::NotPendingReview);
                }
                record.status = CredentialStatus::Rejected;
                record.expires_at = None;
                record.reviewed_at = Some(now);
                record.reviewed_by = Some(reviewer.to_string());
                record.review_notes = notes.clone();
                record.rejection_reason = Some(reason);
                (CredentialAction::Rejected, notes)
            }
            ReviewAction::Verify { expires_at, notes } => {
                if !credential_type.is_admin_only() {
                    return Err(CredentialServiceError::NotAdminVerified);
                }
                record.status = CredentialStatus::Approved;
                record.expires_at =
                    approved_expiration(&credential_type, expires_at, record.expires_at, now);
                record.reviewed_at = Some(now);
                record.reviewed_by = Some(reviewer.to_string());
                record.review_notes = notes.clone();
                record.rejection_reason = None;
                (CredentialAction::Verified, notes)
            }
            ReviewAction::Unverify => {
                if !credential_type.is_admin_only() {
                    return Err(CredentialServiceError::NotAdminVerified);
                }
                record.status = CredentialStatus::NotSubmitted;
                record.expires_at = None;
                record.reviewed_at = None;
                record.reviewed_by = None;
                record.review_notes = None;
                record.rejection_reason = None;
                (CredentialAction::Unverified, None)
            }
        };

        self.repository.update(record.clone())?;
        self.append_history(
            &record,
            history_action,
            from_status,
            reviewer.to_string(),
            history_notes,
            now,
        )?;
        self.subject_cache.invalidate(&record.subject);
        Ok(record)
    }

    /// Audit trail for one credential, newest first.
    pub fn history(&self, id: &CredentialId) -> Result<Vec<HistoryEntry>, CredentialServiceError> {
        self.repository
            .fetch(id)?
            .ok_or(CredentialServiceError::UnknownCredential)?;
        let mut entries = self.repository.history(id)?;
        entries.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    /// Resolved credentials and progress for a driver's dashboard.
    pub fn credentials_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<SubjectCredentialsView, CredentialServiceError> {
        let driver = self
            .fleet
            .driver(driver_id)?
            .ok_or(CredentialServiceError::UnknownDriver)?;
        let subject = CredentialSubject::Driver(driver_id.clone());
        let now = Utc::now();
        let rows = self
            .subject_cache
            .get_or_load(subject.clone(), || self.driver_rows(&driver, &subject, now))?;
        Ok(view_from_rows(subject, &rows, now))
    }

    /// Resolved credentials and progress for one vehicle.
    pub fn credentials_for_vehicle(
        &self,
        vehicle_id: &VehicleId,
    ) -> Result<SubjectCredentialsView, CredentialServiceError> {
        let vehicle = self
            .fleet
            .vehicle(vehicle_id)?
            .ok_or(CredentialServiceError::UnknownVehicle)?;
        let subject = CredentialSubject::Vehicle(vehicle_id.clone());
        let now = Utc::now();
        let rows = self
            .subject_cache
            .get_or_load(subject.clone(), || self.vehicle_rows(&vehicle, &subject, now))?;
        Ok(view_from_rows(subject, &rows, now))
    }

    /// Rows needing reviewer attention: pending submissions first, then
    /// missing ones (including those still inside a grace window).
    pub fn review_queue(&self) -> Result<Vec<ReviewQueueEntry>, CredentialServiceError> {
        let now = Utc::now();
        let types = self.repository.types()?;
        let mut entries = Vec::new();

        for record in self.repository.records()? {
            if !matches!(
                record.status,
                CredentialStatus::PendingReview | CredentialStatus::NotSubmitted
            ) {
                continue;
            }
            let credential_type = match types
                .iter()
                .find(|row| row.id == record.credential_type_id)
            {
                Some(row) => row,
                None => continue,
            };
            let (subject_name, subject_created_at) = self.subject_summary(&record.subject)?;
            let credential = resolution::resolve_for_review(
                credential_type,
                Some(&record),
                subject_created_at,
                now,
            );
            entries.push(ReviewQueueEntry {
                subject: record.subject.clone(),
                subject_name,
                credential,
            });
        }

        entries.sort_by(|a, b| {
            let rank = |entry: &ReviewQueueEntry| {
                u8::from(entry.credential.display_status != DisplayStatus::PendingReview)
            };
            let submitted = |entry: &ReviewQueueEntry| {
                entry
                    .credential
                    .record
                    .as_ref()
                    .and_then(|record| record.submitted_at)
            };
            rank(a)
                .cmp(&rank(b))
                .then_with(|| submitted(a).cmp(&submitted(b)))
        });
        Ok(entries)
    }

    /// Counters behind the review dashboard header.
    pub fn review_stats(&self) -> Result<ReviewStats, CredentialServiceError> {
        let now = Utc::now();
        let types = self.repository.types()?;
        let mut stats = ReviewStats::default();

        for record in self.repository.records()? {
            stats.total += 1;
            let credential_type = match types
                .iter()
                .find(|row| row.id == record.credential_type_id)
            {
                Some(row) => row,
                None => continue,
            };
            let resolved = resolution::resolve(credential_type, Some(&record), now);
            match resolved.display_status {
                DisplayStatus::PendingReview => stats.pending_review += 1,
                DisplayStatus::Awaiting => stats.awaiting_verification += 1,
                DisplayStatus::Expiring => stats.expiring_soon += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Persist an uploaded document under the credential's canonical path.
    /// The caller then references the returned path in a submission.
    pub fn store_document(
        &self,
        id: &CredentialId,
        filename: &str,
        bytes: Vec<u8>,
        content_type: Mime,
    ) -> Result<StoredDocument, CredentialServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(CredentialServiceError::UnknownCredential)?;
        let path =
            credential_document_path(record.subject.raw_id(), &record.id.0, filename, Utc::now());
        Ok(self.store.put(&path, bytes, content_type)?)
    }

    /// Short-lived display URL for a stored document.
    pub fn signed_url(&self, path: &str) -> Result<SignedUrl, CredentialServiceError> {
        Ok(self.store.signed_url(path, Duration::hours(1))?)
    }

    fn driver_rows(
        &self,
        driver: &Driver,
        subject: &CredentialSubject,
        now: DateTime<Utc>,
    ) -> Result<JoinedRows, CredentialServiceError> {
        let records = self.repository.for_subject(subject)?;
        let mut types = self.repository.types()?;
        types.sort_by_key(|row| row.display_order);

        let mut rows = Vec::new();
        for credential_type in types {
            if credential_type.category != CredentialCategory::Driver
                || !credential_type.is_live_for_drivers(now)
                || !credential_type
                    .employment_type
                    .covers(driver.employment_type)
            {
                continue;
            }
            let record = records
                .iter()
                .find(|row| row.credential_type_id == credential_type.id)
                .cloned();
            // Broker-scoped requirements surface once the assignment workflow
            // has ensured a row; global ones always appear.
            if credential_type.scope == CredentialScope::Broker && record.is_none() {
                continue;
            }
            rows.push((credential_type, record));
        }
        Ok(rows)
    }

    fn vehicle_rows(
        &self,
        vehicle: &Vehicle,
        subject: &CredentialSubject,
        now: DateTime<Utc>,
    ) -> Result<JoinedRows, CredentialServiceError> {
        let records = self.repository.for_subject(subject)?;
        let mut types = self.repository.types()?;
        types.sort_by_key(|row| row.display_order);

        let mut rows = Vec::new();
        for credential_type in types {
            if credential_type.category != CredentialCategory::Vehicle
                || !credential_type.is_live_for_drivers(now)
                || !credential_type.applies_to_vehicle(vehicle.vehicle_type)
            {
                continue;
            }
            let record = records
                .iter()
                .find(|row| row.credential_type_id == credential_type.id)
                .cloned();
            if credential_type.scope == CredentialScope::Broker && record.is_none() {
                continue;
            }
            rows.push((credential_type, record));
        }
        Ok(rows)
    }

    fn subject_summary(
        &self,
        subject: &CredentialSubject,
    ) -> Result<(String, DateTime<Utc>), CredentialServiceError> {
        match subject {
            CredentialSubject::Driver(id) => {
                let driver = self
                    .fleet
                    .driver(id)?
                    .ok_or(CredentialServiceError::UnknownDriver)?;
                Ok((driver.full_name, driver.created_at))
            }
            CredentialSubject::Vehicle(id) => {
                let vehicle = self
                    .fleet
                    .vehicle(id)?
                    .ok_or(CredentialServiceError::UnknownVehicle)?;
                Ok((
                    format!("{} {} {}", vehicle.year, vehicle.make, vehicle.model),
                    vehicle.created_at,
                ))
            }
        }
    }

    fn append_history(
        &self,
        record: &CredentialRecord,
        action: CredentialAction,
        from_status: CredentialStatus,
        actor: String,
        notes: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), CredentialServiceError> {
        self.repository.append_history(HistoryEntry {
            id: next_history_id(),
            credential_id: record.id.clone(),
            action,
            from_status,
            to_status: record.status,
            actor,
            notes,
            recorded_at,
        })?;
        Ok(())
    }
}

fn view_from_rows(
    subject: CredentialSubject,
    rows: &JoinedRows,
    now: DateTime<Utc>,
) -> SubjectCredentialsView {
    let credentials: Vec<ResolvedCredential> = rows
        .iter()
        .map(|(credential_type, record)| resolution::resolve(credential_type, record.as_ref(), now))
        .collect();
    let progress = resolution::progress(&credentials);
    SubjectCredentialsView {
        subject,
        credentials,
        progress,
    }
}

fn validate_type_shape(row: &CredentialType) -> Result<(), CredentialServiceError> {
    match row.scope {
        CredentialScope::Broker if row.broker_id.is_none() => {
            return Err(CredentialServiceError::InvalidCatalogChange(
                "broker-scoped entries must name a broker".to_string(),
            ));
        }
        CredentialScope::Global if row.broker_id.is_some() => {
            return Err(CredentialServiceError::InvalidCatalogChange(
                "global entries cannot name a broker".to_string(),
            ));
        }
        _ => {}
    }
    if row.expiration_type == ExpirationType::FixedInterval
        && row.expiration_interval_days.unwrap_or(0) == 0
    {
        return Err(CredentialServiceError::InvalidCatalogChange(
            "fixed-interval expiration needs a positive interval".to_string(),
        ));
    }
    if let Some(config) = &row.instruction_config {
        config
            .validate()
            .map_err(|problems| CredentialServiceError::InvalidCatalogChange(problems.join("; ")))?;
    }
    Ok(())
}

/// Resolved credentials plus progress for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectCredentialsView {
    pub subject: CredentialSubject,
    pub credentials: Vec<ResolvedCredential>,
    pub progress: ProgressSummary,
}

/// One review-queue row: the resolved credential plus who it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewQueueEntry {
    pub subject: CredentialSubject,
    pub subject_name: String,
    pub credential: ResolvedCredential,
}

/// Aggregate counters for the review dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub pending_review: usize,
    pub awaiting_verification: usize,
    pub expiring_soon: usize,
    pub total: usize,
}

/// Catalog entry plus usage counters for admin listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntryView {
    pub credential_type: CredentialType,
    pub live_for_drivers: bool,
    pub instances: CatalogInstanceStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogInstanceStats {
    pub total: usize,
    pub approved: usize,
    pub pending_review: usize,
}

/// Error raised by the credential service.
#[derive(Debug, thiserror::Error)]
pub enum CredentialServiceError {
    #[error("credential type not found")]
    UnknownType,
    #[error("credential not found")]
    UnknownCredential,
    #[error("driver not found")]
    UnknownDriver,
    #[error("vehicle not found")]
    UnknownVehicle,
    #[error("credential type does not apply to this subject")]
    CategoryMismatch,
    #[error("submission mechanism does not match the credential type")]
    MechanismMismatch { expected: SubmissionType },
    #[error("admin-verified credentials do not accept submissions")]
    AdminOnlySubmission,
    #[error("{0}")]
    InvalidSubmission(String),
    #[error("credential is not pending review")]
    NotPendingReview,
    #[error("credential type is not admin-verified")]
    NotAdminVerified,
    #[error("{0}")]
    InvalidCatalogChange(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] DocumentStoreError),
}
