//! Derived credential status and aggregate progress.
//!
//! Stored statuses are a poor display surface: an approved credential may be
//! days from expiring, an admin-verified requirement is "awaiting" rather
//! than "not submitted", and a freshly introduced requirement may still be
//! inside its grace window. Every caller resolves through this module so the
//! mapping exists exactly once.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CredentialRecord, CredentialStatus, CredentialType, RequirementLevel};

/// User-facing status derived from a stored credential row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    NotSubmitted,
    PendingReview,
    Approved,
    Rejected,
    Expired,
    Expiring,
    Awaiting,
    GracePeriod,
}

impl DisplayStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DisplayStatus::NotSubmitted => "not_submitted",
            DisplayStatus::PendingReview => "pending_review",
            DisplayStatus::Approved => "approved",
            DisplayStatus::Rejected => "rejected",
            DisplayStatus::Expired => "expired",
            DisplayStatus::Expiring => "expiring",
            DisplayStatus::Awaiting => "awaiting",
            DisplayStatus::GracePeriod => "grace_period",
        }
    }
}

/// A credential instance joined to its catalog entry, with derived display
/// fields. `record` is `None` when the subject has never had the row ensured;
/// resolution treats that exactly like a stored `not_submitted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCredential {
    pub credential_type: CredentialType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<CredentialRecord>,
    pub display_status: DisplayStatus,
    pub is_expiring_soon: bool,
    pub days_until_expiration: Option<i64>,
    pub can_submit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_ends: Option<DateTime<Utc>>,
}

const fn passthrough(status: CredentialStatus) -> DisplayStatus {
    match status {
        CredentialStatus::NotSubmitted => DisplayStatus::NotSubmitted,
        CredentialStatus::PendingReview => DisplayStatus::PendingReview,
        CredentialStatus::Approved => DisplayStatus::Approved,
        CredentialStatus::Rejected => DisplayStatus::Rejected,
        CredentialStatus::Expired => DisplayStatus::Expired,
    }
}

// Partial days count as whole days, in both directions.
fn days_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const DAY_MILLIS: i64 = 86_400_000;
    let millis = expires_at.signed_duration_since(now).num_milliseconds();
    millis.div_euclid(DAY_MILLIS) + i64::from(millis.rem_euclid(DAY_MILLIS) > 0)
}

/// Resolve one credential against its catalog entry at `now`.
///
/// Pure and total: the outcome depends only on the arguments. Approved rows
/// with an expiration date shift to `expired` or `expiring` as the date
/// nears; admin-only entries that were never submitted read `awaiting`.
pub fn resolve(
    credential_type: &CredentialType,
    record: Option<&CredentialRecord>,
    now: DateTime<Utc>,
) -> ResolvedCredential {
    let stored = record.map_or(CredentialStatus::NotSubmitted, |row| row.status);
    let mut display_status = passthrough(stored);
    let mut is_expiring_soon = false;
    let mut days_until_expiration = None;

    if stored == CredentialStatus::Approved {
        if let Some(expires_at) = record.and_then(|row| row.expires_at) {
            let days = days_until(expires_at, now);
            days_until_expiration = Some(days);
            if days <= 0 {
                display_status = DisplayStatus::Expired;
            } else if days <= credential_type.warning_window_days() {
                display_status = DisplayStatus::Expiring;
                is_expiring_soon = true;
            }
        }
    }

    if credential_type.is_admin_only() && stored == CredentialStatus::NotSubmitted {
        display_status = DisplayStatus::Awaiting;
    }

    let can_submit =
        !credential_type.is_admin_only() && stored != CredentialStatus::PendingReview;

    ResolvedCredential {
        credential_type: credential_type.clone(),
        record: record.cloned(),
        display_status,
        is_expiring_soon,
        days_until_expiration,
        can_submit,
        grace_period_ends: None,
    }
}

/// Review-queue variant of [`resolve`]: missing submissions against an entry
/// with a grace window read `grace_period` until the window closes. The
/// window is anchored at whichever is later of the entry's effective date and
/// the subject's creation date.
///
/// Driver-facing views never use this entry point, so drivers never see
/// `grace_period`.
pub fn resolve_for_review(
    credential_type: &CredentialType,
    record: Option<&CredentialRecord>,
    subject_created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ResolvedCredential {
    let mut resolved = resolve(credential_type, record, now);

    if resolved.display_status == DisplayStatus::NotSubmitted {
        if let Some(grace_days) = credential_type.grace_period_days {
            let anchor = match credential_type.effective_date {
                Some(effective) if effective > subject_created_at => effective,
                _ => subject_created_at,
            };
            let ends = anchor + Duration::days(i64::from(grace_days));
            if now < ends {
                resolved.display_status = DisplayStatus::GracePeriod;
                resolved.grace_period_ends = Some(ends);
            }
        }
    }

    resolved
}

/// Aggregate completion over a subject's resolved credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub complete: usize,
    pub pending: usize,
    pub action_needed: usize,
    pub percentage: u8,
}

/// Fold resolved credentials into completion counts. Only `required` entries
/// count; an empty required set reads as fully complete.
pub fn progress(resolved: &[ResolvedCredential]) -> ProgressSummary {
    let mut total = 0usize;
    let mut complete = 0usize;
    let mut pending = 0usize;
    let mut action_needed = 0usize;

    for credential in resolved {
        if credential.credential_type.requirement != RequirementLevel::Required {
            continue;
        }
        total += 1;
        match credential.display_status {
            DisplayStatus::Approved => complete += 1,
            DisplayStatus::PendingReview | DisplayStatus::Awaiting => pending += 1,
            DisplayStatus::NotSubmitted
            | DisplayStatus::Rejected
            | DisplayStatus::Expired
            | DisplayStatus::Expiring => action_needed += 1,
            // Grace entries only appear in review views, which do not compute
            // progress.
            DisplayStatus::GracePeriod => {}
        }
    }

    let percentage = if total > 0 {
        ((complete as f64 / total as f64) * 100.0).round() as u8
    } else {
        100
    };

    ProgressSummary {
        total,
        complete,
        pending,
        action_needed,
        percentage,
    }
}
