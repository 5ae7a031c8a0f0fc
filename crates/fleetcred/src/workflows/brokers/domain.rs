use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::fleet::{DriverId, EmploymentType, VehicleType};

/// Identifier wrapper for brokers (trip sources).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrokerId(pub String);

/// Identifier wrapper for driver-broker assignments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub String);

/// Identifier wrapper for rate rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerStatus {
    Active,
    Inactive,
}

/// How drivers get attached to a broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    AdminOnly,
    DriverRequests,
    AutoSignup,
}

/// An organization drivers run trips for. Acceptance lists and service states
/// feed the eligibility gate; rate rows live in their own table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broker {
    pub id: BrokerId,
    pub company_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Two-letter state codes; empty means no geographic restriction.
    #[serde(default)]
    pub service_states: Vec<String>,
    pub accepted_vehicle_types: Vec<VehicleType>,
    pub accepted_employment_types: Vec<EmploymentType>,
    pub assignment_mode: AssignmentMode,
    pub status: BrokerStatus,
    pub created_at: DateTime<Utc>,
}

impl Broker {
    pub fn accepts_employment(&self, employment: EmploymentType) -> bool {
        self.accepted_employment_types.contains(&employment)
    }

    pub fn accepts_vehicle(&self, vehicle_type: VehicleType) -> bool {
        self.accepted_vehicle_types.contains(&vehicle_type)
    }
}

/// Parameters for a new broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBroker {
    pub company_id: String,
    pub name: String,
    #[serde(default)]
    pub contract_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub service_states: Vec<String>,
    pub accepted_vehicle_types: Vec<VehicleType>,
    pub accepted_employment_types: Vec<EmploymentType>,
    pub assignment_mode: AssignmentMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Assigned,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedBy {
    Admin,
    Driver,
}

/// Verdict on a pending join request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AssignmentDecision {
    Approve,
    Deny {
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Join row between a driver and a broker. Removal keeps the row for audit;
/// re-joining inserts a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverBrokerAssignment {
    pub id: AssignmentId,
    pub driver_id: DriverId,
    pub broker_id: BrokerId,
    pub status: AssignmentStatus,
    pub requested_by: RequestedBy,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_reason: Option<String>,
}

/// One rate row. At most one open row (null `effective_to`) may exist per
/// (broker, vehicle type); updates close prior rows rather than editing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerRate {
    pub id: RateId,
    pub broker_id: BrokerId,
    pub vehicle_type: VehicleType,
    pub base_rate_cents: u32,
    pub per_mile_cents: u32,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl BrokerRate {
    pub const fn is_open(&self) -> bool {
        self.effective_to.is_none()
    }
}

/// One row of a rate update, before ids and dates are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub vehicle_type: VehicleType,
    pub base_rate_cents: u32,
    pub per_mile_cents: u32,
}

/// A full-table rate replacement taking effect on `effective_from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateUpdate {
    pub effective_from: NaiveDate,
    pub rates: Vec<RateEntry>,
}
