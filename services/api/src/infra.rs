use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fleetcred::storage::{DocumentStore, DocumentStoreError, SignedUrl, StoredDocument};
use fleetcred::workflows::brokers::{
    AssignmentId, Broker, BrokerId, BrokerRate, BrokerRepository, DriverBrokerAssignment, RateId,
};
use fleetcred::workflows::credentials::{
    CredentialId, CredentialRecord, CredentialRepository, CredentialSubject, CredentialType,
    CredentialTypeId, HistoryEntry, RepositoryError,
};
use fleetcred::workflows::fleet::{
    Driver, DriverId, FleetRepository, Vehicle, VehicleAssignment, VehicleId,
};
use fleetcred::workflows::instructions::{
    AccessTokenVerifier, ChatModelGateway, ChatRequest, GatewayError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use mime::Mime;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCredentialRepository {
    types: Arc<Mutex<HashMap<CredentialTypeId, CredentialType>>>,
    records: Arc<Mutex<HashMap<CredentialId, CredentialRecord>>>,
    history: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl CredentialRepository for InMemoryCredentialRepository {
    fn insert_type(&self, row: CredentialType) -> Result<CredentialType, RepositoryError> {
        let mut guard = self.types.lock().expect("catalog mutex poisoned");
        if guard.contains_key(&row.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    fn update_type(&self, row: CredentialType) -> Result<(), RepositoryError> {
        let mut guard = self.types.lock().expect("catalog mutex poisoned");
        if !guard.contains_key(&row.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(row.id.clone(), row);
        Ok(())
    }

    fn fetch_type(
        &self,
        id: &CredentialTypeId,
    ) -> Result<Option<CredentialType>, RepositoryError> {
        let guard = self.types.lock().expect("catalog mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn types(&self) -> Result<Vec<CredentialType>, RepositoryError> {
        let guard = self.types.lock().expect("catalog mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn insert(&self, record: CredentialRecord) -> Result<CredentialRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("record mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: CredentialRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("record mutex poisoned");
        if !guard.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &CredentialId) -> Result<Option<CredentialRecord>, RepositoryError> {
        let guard = self.records.lock().expect("record mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_subject(
        &self,
        subject: &CredentialSubject,
    ) -> Result<Vec<CredentialRecord>, RepositoryError> {
        let guard = self.records.lock().expect("record mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.subject == *subject)
            .cloned()
            .collect())
    }

    fn records(&self) -> Result<Vec<CredentialRecord>, RepositoryError> {
        let guard = self.records.lock().expect("record mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn append_history(&self, entry: HistoryEntry) -> Result<(), RepositoryError> {
        self.history
            .lock()
            .expect("history mutex poisoned")
            .push(entry);
        Ok(())
    }

    fn history(&self, id: &CredentialId) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let guard = self.history.lock().expect("history mutex poisoned");
        Ok(guard
            .iter()
            .filter(|entry| entry.credential_id == *id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryFleetRepository {
    drivers: Arc<Mutex<HashMap<DriverId, Driver>>>,
    vehicles: Arc<Mutex<HashMap<VehicleId, Vehicle>>>,
    links: Arc<Mutex<Vec<VehicleAssignment>>>,
}

impl FleetRepository for InMemoryFleetRepository {
    fn insert_driver(&self, driver: Driver) -> Result<Driver, RepositoryError> {
        let mut guard = self.drivers.lock().expect("driver mutex poisoned");
        if guard.contains_key(&driver.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(driver.id.clone(), driver.clone());
        Ok(driver)
    }

    fn driver(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError> {
        let guard = self.drivers.lock().expect("driver mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, RepositoryError> {
        let mut guard = self.vehicles.lock().expect("vehicle mutex poisoned");
        if guard.contains_key(&vehicle.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(vehicle.id.clone(), vehicle.clone());
        Ok(vehicle)
    }

    fn vehicle(&self, id: &VehicleId) -> Result<Option<Vehicle>, RepositoryError> {
        let guard = self.vehicles.lock().expect("vehicle mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn link_vehicle(&self, assignment: VehicleAssignment) -> Result<(), RepositoryError> {
        self.links
            .lock()
            .expect("link mutex poisoned")
            .push(assignment);
        Ok(())
    }

    fn vehicles_for_driver(&self, id: &DriverId) -> Result<Vec<Vehicle>, RepositoryError> {
        let vehicles = self.vehicles.lock().expect("vehicle mutex poisoned");
        let links = self.links.lock().expect("link mutex poisoned");
        let mut rows: Vec<Vehicle> = vehicles
            .values()
            .filter(|vehicle| vehicle.owner_driver_id.as_ref() == Some(id))
            .cloned()
            .collect();
        for link in links.iter().filter(|link| link.driver_id == *id) {
            if let Some(vehicle) = vehicles.get(&link.vehicle_id) {
                if !rows.iter().any(|row| row.id == vehicle.id) {
                    rows.push(vehicle.clone());
                }
            }
        }
        Ok(rows)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryBrokerRepository {
    brokers: Arc<Mutex<HashMap<BrokerId, Broker>>>,
    assignments: Arc<Mutex<HashMap<AssignmentId, DriverBrokerAssignment>>>,
    rates: Arc<Mutex<HashMap<RateId, BrokerRate>>>,
}

impl BrokerRepository for InMemoryBrokerRepository {
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

/// Keeps document metadata only; uploaded bytes are accepted and dropped.
/// Display access goes through signed URLs, never raw byte reads.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentStore {
    objects: Arc<Mutex<HashMap<String, StoredDocument>>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: Mime,
    ) -> Result<StoredDocument, DocumentStoreError> {
        let document = StoredDocument {
            path: path.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len(),
        };
        let mut guard = self.objects.lock().expect("store mutex poisoned");
        guard.insert(path.to_string(), document.clone());
        Ok(document)
    }

    fn signed_url(
        &self,
        path: &str,
        ttl: chrono::Duration,
    ) -> Result<SignedUrl, DocumentStoreError> {
        let guard = self.objects.lock().expect("store mutex poisoned");
        if !guard.contains_key(path) {
            return Err(DocumentStoreError::NotFound {
                path: path.to_string(),
            });
        }
        Ok(SignedUrl::issue(path, ttl, Utc::now()))
    }

    fn delete(&self, path: &str) -> Result<(), DocumentStoreError> {
        let mut guard = self.objects.lock().expect("store mutex poisoned");
        guard
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| DocumentStoreError::NotFound {
                path: path.to_string(),
            })
    }
}

/// Accepts exactly the tokens issued through `BUILDER_ACCESS_TOKENS`.
pub(crate) struct StaticTokenVerifier {
    tokens: Vec<String>,
}

impl StaticTokenVerifier {
    pub(crate) fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

impl AccessTokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> bool {
        self.tokens.iter().any(|known| known == token)
    }
}

/// Replays canned completions so the demo runs without a model key.
#[derive(Default)]
pub(crate) struct ScriptedChatGateway {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedChatGateway {
    pub(crate) fn with_replies(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|reply| reply.to_string()).collect()),
        }
    }
}

#[async_trait]
impl ChatModelGateway for ScriptedChatGateway {
    async fn complete(&self, _request: ChatRequest) -> Result<String, GatewayError> {
        self.replies
            .lock()
            .expect("reply mutex poisoned")
            .pop_front()
            .ok_or(GatewayError::EmptyCompletion)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
