use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use crate::workflows::brokers::domain::{
    AssignmentId, AssignmentMode, Broker, BrokerId, BrokerRate, BrokerStatus,
    DriverBrokerAssignment, RateId,
};
use crate::workflows::brokers::repository::{BrokerRepository, RepositoryError};
use crate::workflows::brokers::service::BrokerService;
use crate::workflows::credentials::service::CredentialService;
use crate::workflows::fleet::{DriverId, EmploymentType, FleetRepository, VehicleType};

pub(super) use crate::workflows::credentials::tests::common::{
    document_type, driver, read_json_body, vehicle, vehicle_inspection_type, MemoryCredentials,
    MemoryFleet, MemoryStore,
};
use crate::workflows::credentials::domain::{CredentialScope, CredentialType, CredentialTypeId};

/// Required driver paperwork scoped to the default broker.
pub(super) fn broker_packet_type() -> CredentialType {
    let mut row = document_type();
    row.id = CredentialTypeId("ctype-mm-packet".to_string());
    row.name = "Metro Mobility Packet".to_string();
    row.scope = CredentialScope::Broker;
    row.broker_id = Some(broker_id());
    row.display_order = 5;
    row
}

/// Broker that accepts the default driver and vehicle fixtures outright.
pub(super) fn broker() -> Broker {
    Broker {
        id: BrokerId("broker-1".to_string()),
        company_id: "company-1".to_string(),
        name: "Metro Mobility".to_string(),
        contract_number: Some("MM-2209".to_string()),
        notes: None,
        service_states: vec!["TX".to_string(), "OK".to_string()],
        accepted_vehicle_types: vec![VehicleType::Van, VehicleType::Sedan],
        accepted_employment_types: vec![EmploymentType::W2, EmploymentType::Contractor1099],
        assignment_mode: AssignmentMode::DriverRequests,
        status: BrokerStatus::Active,
        created_at: Utc::now() - Duration::days(300),
    }
}

pub(super) fn broker_id() -> BrokerId {
    BrokerId("broker-1".to_string())
}

pub(super) fn driver_id() -> DriverId {
    DriverId("driver-1".to_string())
}

pub(super) type Service = BrokerService<MemoryBrokers, MemoryCredentials, MemoryFleet, MemoryStore>;

/// Service over in-memory tables, pre-seeded with the default driver,
/// vehicle, and broker. The credential catalog starts empty so the fixtures
/// pass the gate until a test says otherwise.
pub(super) fn build_service() -> (
    Service,
    Arc<MemoryBrokers>,
    Arc<MemoryCredentials>,
    Arc<MemoryFleet>,
) {
    let brokers = Arc::new(MemoryBrokers::default());
    let credential_rows = Arc::new(MemoryCredentials::default());
    let fleet = Arc::new(MemoryFleet::default());
    let store = Arc::new(MemoryStore::default());
    fleet.insert_driver(driver()).expect("seed driver");
    fleet.insert_vehicle(vehicle()).expect("seed vehicle");
    brokers.insert_broker(broker()).expect("seed broker");
    let credentials = Arc::new(CredentialService::new(
        credential_rows.clone(),
        fleet.clone(),
        store,
    ));
    let service = BrokerService::new(brokers.clone(), credentials, fleet.clone());
    (service, brokers, credential_rows, fleet)
}

#[derive(Default, Clone)]
pub(super) struct MemoryBrokers {
    brokers: Arc<Mutex<HashMap<BrokerId, Broker>>>,
    assignments: Arc<Mutex<HashMap<AssignmentId, DriverBrokerAssignment>>>,
    rates: Arc<Mutex<HashMap<RateId, BrokerRate>>>,
}

impl BrokerRepository for MemoryBrokers {
    fn insert_broker(&self, broker: Broker) -> Result<Broker, RepositoryError> {
        let mut guard = self.brokers.lock().expect("broker mutex poisoned");
        if guard.contains_key(&broker.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(broker.id.clone(), broker.clone());
        Ok(broker)
    }

    fn broker(&self, id: &BrokerId) -> Result<Option<Broker>, RepositoryError> {
        let guard = self.brokers.lock().expect("broker mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn brokers(&self) -> Result<Vec<Broker>, RepositoryError> {
        let guard = self.brokers.lock().expect("broker mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn insert_assignment(
        &self,
        assignment: DriverBrokerAssignment,
    ) -> Result<DriverBrokerAssignment, RepositoryError> {
        let mut guard = self.assignments.lock().expect("assignment mutex poisoned");
        if guard.contains_key(&assignment.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(assignment.id.clone(), assignment.clone());
        Ok(assignment)
    }

    fn update_assignment(
        &self,
        assignment: DriverBrokerAssignment,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.assignments.lock().expect("assignment mutex poisoned");
        if !guard.contains_key(&assignment.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(assignment.id.clone(), assignment);
        Ok(())
    }

    fn assignment(
        &self,
        id: &AssignmentId,
    ) -> Result<Option<DriverBrokerAssignment>, RepositoryError> {
        let guard = self.assignments.lock().expect("assignment mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn assignments_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<DriverBrokerAssignment>, RepositoryError> {
        let guard = self.assignments.lock().expect("assignment mutex poisoned");
        Ok(guard
            .values()
            .filter(|row| row.driver_id == *driver_id)
            .cloned()
            .collect())
    }

    fn assignments_for_broker(
        &self,
        broker_id: &BrokerId,
    ) -> Result<Vec<DriverBrokerAssignment>, RepositoryError> {
        let guard = self.assignments.lock().expect("assignment mutex poisoned");
        Ok(guard
            .values()
            .filter(|row| row.broker_id == *broker_id)
            .cloned()
            .collect())
    }

    fn insert_rate(&self, rate: BrokerRate) -> Result<BrokerRate, RepositoryError> {
        let mut guard = self.rates.lock().expect("rate mutex poisoned");
        if guard.contains_key(&rate.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(rate.id.clone(), rate.clone());
        Ok(rate)
    }

    fn update_rate(&self, rate: BrokerRate) -> Result<(), RepositoryError> {
        let mut guard = self.rates.lock().expect("rate mutex poisoned");
        if !guard.contains_key(&rate.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(rate.id.clone(), rate);
        Ok(())
    }

    fn rates_for_broker(&self, broker_id: &BrokerId) -> Result<Vec<BrokerRate>, RepositoryError> {
        let guard = self.rates.lock().expect("rate mutex poisoned");
        Ok(guard
            .values()
            .filter(|row| row.broker_id == *broker_id)
            .cloned()
            .collect())
    }
}

/// Repository standing in for a database outage.
pub(super) struct UnavailableBrokers;

impl BrokerRepository for UnavailableBrokers {
    fn insert_broker(&self, _broker: Broker) -> Result<Broker, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn broker(&self, _id: &BrokerId) -> Result<Option<Broker>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn brokers(&self) -> Result<Vec<Broker>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_assignment(
        &self,
        _assignment: DriverBrokerAssignment,
    ) -> Result<DriverBrokerAssignment, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_assignment(
        &self,
        _assignment: DriverBrokerAssignment,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn assignment(
        &self,
        _id: &AssignmentId,
    ) -> Result<Option<DriverBrokerAssignment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn assignments_for_driver(
        &self,
        _driver_id: &DriverId,
    ) -> Result<Vec<DriverBrokerAssignment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn assignments_for_broker(
        &self,
        _broker_id: &BrokerId,
    ) -> Result<Vec<DriverBrokerAssignment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_rate(&self, _rate: BrokerRate) -> Result<BrokerRate, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_rate(&self, _rate: BrokerRate) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn rates_for_broker(&self, _broker_id: &BrokerId) -> Result<Vec<BrokerRate>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
