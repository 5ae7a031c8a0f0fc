use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::storage::DocumentStore;
use crate::workflows::credentials::domain::{
    CredentialCategory, CredentialScope, CredentialSubject, CredentialType,
};
use crate::workflows::credentials::resolution::ResolvedCredential;
use crate::workflows::credentials::service::{CredentialService, CredentialServiceError};
use crate::workflows::credentials::CredentialRepository;
use crate::workflows::fleet::{Driver, DriverId, FleetRepository};

use super::domain::{
    AssignmentDecision, AssignmentId, AssignmentMode, AssignmentStatus, Broker, BrokerId,
    BrokerRate, BrokerStatus, DriverBrokerAssignment, NewBroker, RateId, RateUpdate, RequestedBy,
};
use super::eligibility::{self, EligibilityReport, JoinState, VehicleStanding};
use super::repository::{BrokerRepository, RepositoryError};

/// Service around broker assignment and rate tables. Credential standing is
/// delegated to the credential service so the gate sees exactly the rows the
/// dashboards see.
pub struct BrokerService<B, R, F, S> {
    repository: Arc<B>,
    credentials: Arc<CredentialService<R, F, S>>,
    fleet: Arc<F>,
}

static BROKER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ASSIGNMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static RATE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_broker_id() -> BrokerId {
    let id = BROKER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BrokerId(format!("broker-{id:06}"))
}

fn next_assignment_id() -> AssignmentId {
    let id = ASSIGNMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AssignmentId(format!("assign-{id:06}"))
}

fn next_rate_id() -> RateId {
    let id = RATE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RateId(format!("rate-{id:06}"))
}

impl<B, R, F, S> BrokerService<B, R, F, S>
where
    B: BrokerRepository + 'static,
    R: CredentialRepository + 'static,
    F: FleetRepository + 'static,
    S: DocumentStore + 'static,
{
    pub fn new(
        repository: Arc<B>,
        credentials: Arc<CredentialService<R, F, S>>,
        fleet: Arc<F>,
    ) -> Self {
        Self {
            repository,
            credentials,
            fleet,
        }
    }

    pub fn create_broker(&self, draft: NewBroker) -> Result<Broker, BrokerServiceError> {
        if draft.accepted_employment_types.is_empty() {
            return Err(BrokerServiceError::InvalidBroker(
                "brokers must accept at least one employment type".to_string(),
            ));
        }
        if draft.accepted_vehicle_types.is_empty() {
            return Err(BrokerServiceError::InvalidBroker(
                "brokers must accept at least one vehicle type".to_string(),
            ));
        }
        let broker = Broker {
            id: next_broker_id(),
            company_id: draft.company_id,
            name: draft.name,
            contract_number: draft.contract_number,
            notes: draft.notes,
            service_states: draft.service_states,
            accepted_vehicle_types: draft.accepted_vehicle_types,
            accepted_employment_types: draft.accepted_employment_types,
            assignment_mode: draft.assignment_mode,
            status: BrokerStatus::Active,
            created_at: Utc::now(),
        };
        Ok(self.repository.insert_broker(broker)?)
    }

    /// Admin listing: every broker with assignment and catalog counters.
    pub fn broker_overview(&self) -> Result<Vec<BrokerOverview>, BrokerServiceError> {
        let mut brokers = self.repository.brokers()?;
        brokers.sort_by(|a, b| a.name.cmp(&b.name));
        let catalog: Vec<CredentialType> = self
            .credentials
            .catalog()?
            .into_iter()
            .map(|entry| entry.credential_type)
            .collect();

        let mut views = Vec::with_capacity(brokers.len());
        for broker in brokers {
            let assignments = self.repository.assignments_for_broker(&broker.id)?;
            let assigned_count = assignments
                .iter()
                .filter(|row| row.status == AssignmentStatus::Assigned)
                .count();
            let pending_count = assignments
                .iter()
                .filter(|row| row.status == AssignmentStatus::Pending)
                .count();
            let credential_count = catalog
                .iter()
                .filter(|credential_type| {
                    credential_type.scope == CredentialScope::Broker
                        && credential_type.broker_id.as_ref() == Some(&broker.id)
                })
                .count();
            views.push(BrokerOverview {
                broker,
                assigned_count,
                pending_count,
                credential_count,
            });
        }
        Ok(views)
    }

    /// Trip-source listing for one driver: every visible broker with its
    /// eligibility report and join state.
    pub fn brokers_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<BrokerJoinSummary>, BrokerServiceError> {
        let driver = self
            .fleet
            .driver(driver_id)?
            .ok_or(BrokerServiceError::UnknownDriver)?;
        let assignments = self.repository.assignments_for_driver(driver_id)?;
        let inputs = self.gate_inputs(&driver)?;

        let mut brokers = self.repository.brokers()?;
        brokers.sort_by(|a, b| a.name.cmp(&b.name));

        let now = Utc::now();
        let mut summaries = Vec::new();
        for broker in brokers {
            let assignment = latest_assignment(&assignments, &broker.id);
            // Deactivated brokers stay visible only to already-attached drivers.
            if broker.status == BrokerStatus::Inactive && assignment.is_none() {
                continue;
            }
            let eligibility = eligibility::evaluate(
                &driver,
                &broker,
                &inputs.driver_credentials,
                &inputs.vehicles,
                &inputs.catalog,
                now,
            );
            let join = eligibility::join_state(
                &eligibility,
                broker.assignment_mode,
                assignment.as_ref(),
            );
            summaries.push(BrokerJoinSummary {
                broker,
                assignment,
                eligibility,
                join,
            });
        }
        Ok(summaries)
    }

    /// Gate verdict for one (driver, broker) pair.
    pub fn eligibility(
        &self,
        driver_id: &DriverId,
        broker_id: &BrokerId,
    ) -> Result<EligibilityReport, BrokerServiceError> {
        let driver = self
            .fleet
            .driver(driver_id)?
            .ok_or(BrokerServiceError::UnknownDriver)?;
        let broker = self
            .repository
            .broker(broker_id)?
            .ok_or(BrokerServiceError::UnknownBroker)?;
        let inputs = self.gate_inputs(&driver)?;
        Ok(eligibility::evaluate(
            &driver,
            &broker,
            &inputs.driver_credentials,
            &inputs.vehicles,
            &inputs.catalog,
            Utc::now(),
        ))
    }

    /// Attach a driver to a broker. Admin joins assign directly; driver joins
    /// follow the broker's mode and must pass the gate.
    pub fn join(
        &self,
        driver_id: &DriverId,
        broker_id: &BrokerId,
        requested_by: RequestedBy,
        actor: &str,
    ) -> Result<DriverBrokerAssignment, BrokerServiceError> {
        let driver = self
            .fleet
            .driver(driver_id)?
            .ok_or(BrokerServiceError::UnknownDriver)?;
        let broker = self
            .repository
            .broker(broker_id)?
            .ok_or(BrokerServiceError::UnknownBroker)?;

        let existing = self.repository.assignments_for_driver(driver_id)?;
        if existing.iter().any(|row| {
            row.broker_id == *broker_id
                && matches!(
                    row.status,
                    AssignmentStatus::Pending | AssignmentStatus::Assigned
                )
        }) {
            return Err(BrokerServiceError::AlreadyAssigned);
        }
        if broker.status == BrokerStatus::Inactive {
            return Err(BrokerServiceError::BrokerInactive);
        }

        let now = Utc::now();
        let status = match requested_by {
            RequestedBy::Admin => {
                if !broker.accepts_employment(driver.employment_type) {
                    return Err(BrokerServiceError::NotEligible {
                        issues: vec![format!(
                            "Employment type ({}) not accepted",
                            driver.employment_type.label()
                        )],
                    });
                }
                AssignmentStatus::Assigned
            }
            RequestedBy::Driver => {
                if broker.assignment_mode == AssignmentMode::AdminOnly {
                    return Err(BrokerServiceError::JoinNotAllowed(
                        "driver joins are managed by the admin".to_string(),
                    ));
                }
                let inputs = self.gate_inputs(&driver)?;
                let report = eligibility::evaluate(
                    &driver,
                    &broker,
                    &inputs.driver_credentials,
                    &inputs.vehicles,
                    &inputs.catalog,
                    now,
                );
                if !report.eligible {
                    return Err(BrokerServiceError::NotEligible {
                        issues: report.issues,
                    });
                }
                match broker.assignment_mode {
                    AssignmentMode::AutoSignup => AssignmentStatus::Assigned,
                    _ => AssignmentStatus::Pending,
                }
            }
        };

        let decided = status == AssignmentStatus::Assigned;
        let assignment = self.repository.insert_assignment(DriverBrokerAssignment {
            id: next_assignment_id(),
            driver_id: driver_id.clone(),
            broker_id: broker_id.clone(),
            status,
            requested_by,
            requested_at: now,
            decided_at: decided.then_some(now),
            decided_by: decided.then(|| actor.to_string()),
            removal_reason: None,
        })?;
        if decided {
            self.ensure_broker_credentials(&driver, &broker)?;
        }
        Ok(assignment)
    }

    /// Resolve a pending request.
    pub fn decide(
        &self,
        id: &AssignmentId,
        decided_by: &str,
        decision: AssignmentDecision,
    ) -> Result<DriverBrokerAssignment, BrokerServiceError> {
        let mut assignment = self
            .repository
            .assignment(id)?
            .ok_or(BrokerServiceError::UnknownAssignment)?;
        if assignment.status != AssignmentStatus::Pending {
            return Err(BrokerServiceError::NotPending);
        }

        let now = Utc::now();
        assignment.decided_at = Some(now);
        assignment.decided_by = Some(decided_by.to_string());
        match decision {
            AssignmentDecision::Approve => {
                assignment.status = AssignmentStatus::Assigned;
            }
            AssignmentDecision::Deny { reason } => {
                assignment.status = AssignmentStatus::Removed;
                assignment.removal_reason =
                    Some(reason.unwrap_or_else(|| "Request denied".to_string()));
            }
        }
        self.repository.update_assignment(assignment.clone())?;

        if assignment.status == AssignmentStatus::Assigned {
            let driver = self
                .fleet
                .driver(&assignment.driver_id)?
                .ok_or(BrokerServiceError::UnknownDriver)?;
            let broker = self
                .repository
                .broker(&assignment.broker_id)?
                .ok_or(BrokerServiceError::UnknownBroker)?;
            self.ensure_broker_credentials(&driver, &broker)?;
        }
        Ok(assignment)
    }

    /// Detach a driver. The row is kept with its reason for audit.
    pub fn remove(
        &self,
        id: &AssignmentId,
        removed_by: &str,
        reason: Option<String>,
    ) -> Result<DriverBrokerAssignment, BrokerServiceError> {
        let mut assignment = self
            .repository
            .assignment(id)?
            .ok_or(BrokerServiceError::UnknownAssignment)?;
        if assignment.status == AssignmentStatus::Removed {
            return Err(BrokerServiceError::AlreadyRemoved);
        }
        assignment.status = AssignmentStatus::Removed;
        assignment.decided_at = Some(Utc::now());
        assignment.decided_by = Some(removed_by.to_string());
        assignment.removal_reason = Some(reason.unwrap_or_else(|| "Removed by admin".to_string()));
        self.repository.update_assignment(assignment.clone())?;
        Ok(assignment)
    }

    /// Rate table for display: open rows plus the full history.
    pub fn rates(&self, broker_id: &BrokerId) -> Result<RatesView, BrokerServiceError> {
        self.repository
            .broker(broker_id)?
            .ok_or(BrokerServiceError::UnknownBroker)?;
        let rows = self.repository.rates_for_broker(broker_id)?;

        let mut current: Vec<BrokerRate> = rows.iter().filter(|row| row.is_open()).cloned().collect();
        current.sort_by_key(|row| row.vehicle_type.label());

        let mut history = rows;
        history.sort_by(|a, b| {
            b.effective_from
                .cmp(&a.effective_from)
                .then_with(|| a.vehicle_type.label().cmp(b.vehicle_type.label()))
        });
        Ok(RatesView { current, history })
    }

    /// Replace the open rate table as of `update.effective_from`: every open
    /// row is closed at the day before, then the new rows are inserted
    /// open-ended.
    pub fn update_rates(
        &self,
        broker_id: &BrokerId,
        update: RateUpdate,
    ) -> Result<Vec<BrokerRate>, BrokerServiceError> {
        self.repository
            .broker(broker_id)?
            .ok_or(BrokerServiceError::UnknownBroker)?;
        if update.rates.is_empty() {
            return Err(BrokerServiceError::InvalidRates(
                "at least one rate row is required".to_string(),
            ));
        }
        let mut seen = Vec::with_capacity(update.rates.len());
        for entry in &update.rates {
            if seen.contains(&entry.vehicle_type) {
                return Err(BrokerServiceError::InvalidRates(format!(
                    "duplicate rate row for {}",
                    entry.vehicle_type.label()
                )));
            }
            seen.push(entry.vehicle_type);
        }

        let rows = self.repository.rates_for_broker(broker_id)?;
        let open: Vec<BrokerRate> = rows.into_iter().filter(|row| row.is_open()).collect();
        if let Some(latest) = open.iter().map(|row| row.effective_from).max() {
            if update.effective_from <= latest {
                return Err(BrokerServiceError::InvalidRates(format!(
                    "effective date must be after {latest}"
                )));
            }
        }
        let close_on = update
            .effective_from
            .pred_opt()
            .ok_or_else(|| BrokerServiceError::InvalidRates(
                "effective date is out of range".to_string(),
            ))?;

        for mut row in open {
            row.effective_to = Some(close_on);
            self.repository.update_rate(row)?;
        }

        let mut inserted = Vec::with_capacity(update.rates.len());
        for entry in update.rates {
            inserted.push(self.repository.insert_rate(BrokerRate {
                id: next_rate_id(),
                broker_id: broker_id.clone(),
                vehicle_type: entry.vehicle_type,
                base_rate_cents: entry.base_rate_cents,
                per_mile_cents: entry.per_mile_cents,
                effective_from: update.effective_from,
                effective_to: None,
            })?);
        }
        inserted.sort_by_key(|row| row.vehicle_type.label());
        Ok(inserted)
    }

    fn gate_inputs(&self, driver: &Driver) -> Result<GateInputs, BrokerServiceError> {
        let driver_view = self.credentials.credentials_for_driver(&driver.id)?;
        let mut vehicles = Vec::new();
        for vehicle in self.fleet.vehicles_for_driver(&driver.id)? {
            let view = self.credentials.credentials_for_vehicle(&vehicle.id)?;
            vehicles.push(VehicleStanding {
                vehicle,
                credentials: view.credentials,
            });
        }
        let catalog = self
            .credentials
            .catalog()?
            .into_iter()
            .map(|entry| entry.credential_type)
            .collect();
        Ok(GateInputs {
            driver_credentials: driver_view.credentials,
            vehicles,
            catalog,
        })
    }

    // Assignment creates the broker-scoped rows so the driver's checklist
    // immediately shows what the broker still needs from them.
    fn ensure_broker_credentials(
        &self,
        driver: &Driver,
        broker: &Broker,
    ) -> Result<(), BrokerServiceError> {
        let now = Utc::now();
        for entry in self.credentials.catalog()? {
            let credential_type = entry.credential_type;
            if credential_type.scope != CredentialScope::Broker
                || credential_type.broker_id.as_ref() != Some(&broker.id)
                || credential_type.category != CredentialCategory::Driver
                || !credential_type.is_live_for_drivers(now)
                || !credential_type.employment_type.covers(driver.employment_type)
            {
                continue;
            }
            self.credentials.ensure(
                CredentialSubject::Driver(driver.id.clone()),
                &credential_type.id,
            )?;
        }
        Ok(())
    }
}

struct GateInputs {
    driver_credentials: Vec<ResolvedCredential>,
    vehicles: Vec<VehicleStanding>,
    catalog: Vec<CredentialType>,
}

fn latest_assignment(
    assignments: &[DriverBrokerAssignment],
    broker_id: &BrokerId,
) -> Option<DriverBrokerAssignment> {
    let mut rows: Vec<&DriverBrokerAssignment> = assignments
        .iter()
        .filter(|row| row.broker_id == *broker_id)
        .collect();
    rows.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
    rows.iter()
        .find(|row| row.status != AssignmentStatus::Removed)
        .or_else(|| rows.first())
        .map(|row| (*row).clone())
}

/// One broker as the driver's trip-source page shows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerJoinSummary {
    pub broker: Broker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<DriverBrokerAssignment>,
    pub eligibility: EligibilityReport,
    pub join: JoinState,
}

/// Admin listing row with usage counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerOverview {
    pub broker: Broker,
    pub assigned_count: usize,
    pub pending_count: usize,
    pub credential_count: usize,
}

/// Open rows plus full history for one broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatesView {
    pub current: Vec<BrokerRate>,
    pub history: Vec<BrokerRate>,
}

/// Error raised by the broker service.
#[derive(Debug, thiserror::Error)]
pub enum BrokerServiceError {
    #[error("broker not found")]
    UnknownBroker,
    #[error("driver not found")]
    UnknownDriver,
    #[error("assignment not found")]
    UnknownAssignment,
    #[error("broker is not active")]
    BrokerInactive,
    #[error("an active assignment already exists")]
    AlreadyAssigned,
    #[error("{0}")]
    JoinNotAllowed(String),
    #[error("driver is not eligible: {}", issues.join("; "))]
    NotEligible { issues: Vec<String> },
    #[error("assignment is not pending")]
    NotPending,
    #[error("assignment is already removed")]
    AlreadyRemoved,
    #[error("{0}")]
    InvalidBroker(String),
    #[error("{0}")]
    InvalidRates(String),
    #[error(transparent)]
    Credentials(#[from] CredentialServiceError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
