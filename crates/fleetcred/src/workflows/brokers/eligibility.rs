//! Join gate between drivers and brokers.
//!
//! Pure functions over already-resolved credential rows; every caller (the
//! driver trip-sources view, the join operation, admin broker detail) goes
//! through here rather than re-deriving its own variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::credentials::domain::{
    CredentialCategory, CredentialScope, CredentialType, RequirementLevel,
};
use crate::workflows::credentials::resolution::{DisplayStatus, ResolvedCredential};
use crate::workflows::fleet::{Driver, Vehicle, VehicleStatus};

use super::domain::{AssignmentMode, AssignmentStatus, Broker, DriverBrokerAssignment};

/// Gate outcome: eligible exactly when `issues` is empty. Issue strings are
/// shown to drivers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub eligible: bool,
    pub issues: Vec<String>,
}

/// One of the driver's vehicles plus its resolved credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleStanding {
    pub vehicle: Vehicle,
    pub credentials: Vec<ResolvedCredential>,
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Evaluate whether `driver` may work for `broker`.
///
/// `driver_credentials` are the driver's resolved rows (missing global
/// requirements already synthesized as `not_submitted`); `catalog` is the full
/// credential-type list, needed because a vehicle requirement counts even
/// when no instance row exists yet. Only `approved` satisfies the gate; an
/// `expiring` credential already counts as missing.
pub fn evaluate(
    driver: &Driver,
    broker: &Broker,
    driver_credentials: &[ResolvedCredential],
    vehicles: &[VehicleStanding],
    catalog: &[CredentialType],
    now: DateTime<Utc>,
) -> EligibilityReport {
    let mut issues = Vec::new();

    if !broker.accepts_employment(driver.employment_type) {
        issues.push(format!(
            "Employment type ({}) not accepted",
            driver.employment_type.label()
        ));
    }

    if let Some(state) = driver.state.as_deref() {
        if !broker.service_states.is_empty()
            && !broker.service_states.iter().any(|served| served == state)
        {
            issues.push(format!("Not in service area ({state})"));
        }
    }

    let counts_for_driver = |credential_type: &CredentialType| {
        credential_type.category == CredentialCategory::Driver
            && credential_type.requirement == RequirementLevel::Required
            && credential_type.is_live_for_drivers(now)
            && credential_type.employment_type.covers(driver.employment_type)
    };

    let missing_global = driver_credentials
        .iter()
        .filter(|credential| {
            credential.credential_type.scope == CredentialScope::Global
                && counts_for_driver(&credential.credential_type)
                && credential.display_status != DisplayStatus::Approved
        })
        .count();
    if missing_global > 0 {
        issues.push(format!(
            "{missing_global} global credential{} missing",
            plural(missing_global)
        ));
    }

    let missing_broker = driver_credentials
        .iter()
        .filter(|credential| {
            credential.credential_type.scope == CredentialScope::Broker
                && credential.credential_type.broker_id.as_ref() == Some(&broker.id)
                && counts_for_driver(&credential.credential_type)
                && credential.display_status != DisplayStatus::Approved
        })
        .count();
    if missing_broker > 0 {
        issues.push(format!(
            "{missing_broker} {} credential{} missing",
            broker.name,
            plural(missing_broker)
        ));
    }

    let required_vehicle_types: Vec<&CredentialType> = catalog
        .iter()
        .filter(|credential_type| {
            credential_type.category == CredentialCategory::Vehicle
                && credential_type.requirement == RequirementLevel::Required
                && credential_type.is_live_for_drivers(now)
                && credential_type.employment_type.covers(driver.employment_type)
                && (credential_type.scope == CredentialScope::Global
                    || credential_type.broker_id.as_ref() == Some(&broker.id))
        })
        .collect();

    let has_eligible_vehicle = vehicles.iter().any(|standing| {
        if standing.vehicle.status != VehicleStatus::Active {
            return false;
        }
        if !broker.accepts_vehicle(standing.vehicle.vehicle_type) {
            return false;
        }
        required_vehicle_types.iter().all(|credential_type| {
            if !credential_type.applies_to_vehicle(standing.vehicle.vehicle_type) {
                return true;
            }
            standing.credentials.iter().any(|credential| {
                credential.credential_type.id == credential_type.id
                    && credential.display_status == DisplayStatus::Approved
            })
        })
    });
    if !has_eligible_vehicle {
        issues.push("No eligible vehicle".to_string());
    }

    EligibilityReport {
        eligible: issues.is_empty(),
        issues,
    }
}

/// What the join button should offer for one (driver, broker) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinState {
    Assigned,
    Pending,
    NotEligible,
    AutoSignup,
    Request,
    AdminOnly,
}

/// Combine the gate outcome with the broker's assignment mode. An existing
/// pending or assigned row wins outright; removed rows fall through so the
/// driver can re-join.
pub fn join_state(
    report: &EligibilityReport,
    mode: AssignmentMode,
    existing: Option<&DriverBrokerAssignment>,
) -> JoinState {
    match existing.map(|assignment| assignment.status) {
        Some(AssignmentStatus::Assigned) => return JoinState::Assigned,
        Some(AssignmentStatus::Pending) => return JoinState::Pending,
        Some(AssignmentStatus::Removed) | None => {}
    }
    if !report.eligible {
        return JoinState::NotEligible;
    }
    match mode {
        AssignmentMode::AutoSignup => JoinState::AutoSignup,
        AssignmentMode::DriverRequests => JoinState::Request,
        AssignmentMode::AdminOnly => JoinState::AdminOnly,
    }
}
