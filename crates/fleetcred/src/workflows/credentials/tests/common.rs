use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use mime::Mime;
use serde_json::Value;

use crate::storage::{DocumentStore, DocumentStoreError, SignedUrl, StoredDocument};
use crate::workflows::credentials::domain::{
    CredentialCategory, CredentialId, CredentialRecord, CredentialScope, CredentialStatus,
    CredentialSubject, CredentialType, CredentialTypeId, CredentialTypeStatus,
    EmploymentApplicability, ExpirationType, HistoryEntry, RequirementLevel, SubmissionType,
};
use crate::workflows::credentials::repository::{CredentialRepository, RepositoryError};
use crate::workflows::credentials::router::credential_router;
use crate::workflows::credentials::service::CredentialService;
use crate::workflows::fleet::{
    Driver, DriverId, DriverStatus, EmploymentType, FleetRepository, Vehicle, VehicleAssignment,
    VehicleId, VehicleOwnership, VehicleStatus, VehicleType,
};

pub(crate) fn driver() -> Driver {
    Driver {
        id: DriverId("driver-1".to_string()),
        company_id: "company-1".to_string(),
        full_name: "Jordan Avery".to_string(),
        employment_type: EmploymentType::Contractor1099,
        state: Some("TX".to_string()),
        status: DriverStatus::Active,
        created_at: Utc::now() - Duration::days(120),
    }
}

pub(crate) fn vehicle() -> Vehicle {
    Vehicle {
        id: VehicleId("vehicle-1".to_string()),
        company_id: "company-1".to_string(),
        make: "Toyota".to_string(),
        model: "Sienna".to_string(),
        year: 2021,
        vehicle_type: VehicleType::Van,
        ownership: VehicleOwnership::Driver,
        owner_driver_id: Some(DriverId("driver-1".to_string())),
        seat_capacity: 6,
        wheelchair_capacity: 0,
        status: VehicleStatus::Active,
        exterior_photo_path: None,
        created_at: Utc::now() - Duration::days(120),
    }
}

/// Active global document requirement applying to every driver.
pub(crate) fn document_type() -> CredentialType {
    CredentialType {
        id: CredentialTypeId("ctype-license".to_string()),
        name: "Driver License".to_string(),
        description: None,
        category: CredentialCategory::Driver,
        scope: CredentialScope::Global,
        broker_id: None,
        employment_type: EmploymentApplicability::Both,
        requirement: RequirementLevel::Required,
        vehicle_types: Vec::new(),
        submission_type: SubmissionType::DocumentUpload,
        requires_driver_action: None,
        form_schema: None,
        signature_document_path: None,
        expiration_type: ExpirationType::FixedInterval,
        expiration_interval_days: Some(365),
        expiration_warning_days: Some(30),
        grace_period_days: None,
        status: CredentialTypeStatus::Active,
        effective_date: None,
        instruction_config: None,
        display_order: 1,
        created_at: Utc::now() - Duration::days(200),
    }
}

pub(crate) fn admin_verified_type() -> CredentialType {
    let mut row = document_type();
    row.id = CredentialTypeId("ctype-background".to_string());
    row.name = "Background Check".to_string();
    row.submission_type = SubmissionType::AdminVerified;
    row.expiration_type = ExpirationType::Never;
    row.expiration_interval_days = None;
    row.display_order = 2;
    row
}

pub(crate) fn date_entry_type() -> CredentialType {
    let mut row = document_type();
    row.id = CredentialTypeId("ctype-physical".to_string());
    row.name = "DOT Physical".to_string();
    row.submission_type = SubmissionType::DateEntry;
    row.expiration_type = ExpirationType::DriverSpecified;
    row.expiration_interval_days = None;
    row.display_order = 3;
    row
}

pub(crate) fn vehicle_inspection_type() -> CredentialType {
    let mut row = document_type();
    row.id = CredentialTypeId("ctype-inspection".to_string());
    row.name = "Vehicle Inspection".to_string();
    row.category = CredentialCategory::Vehicle;
    row.display_order = 4;
    row
}

pub(crate) fn record_with_status(
    credential_type: &CredentialType,
    subject: CredentialSubject,
    status: CredentialStatus,
) -> CredentialRecord {
    let mut record = CredentialRecord::not_submitted(
        CredentialId(format!("cred-{}", credential_type.id.0)),
        credential_type.id.clone(),
        subject,
        Utc::now() - Duration::days(90),
    );
    record.status = status;
    if status != CredentialStatus::NotSubmitted {
        record.submission_version = 1;
        record.submitted_at = Some(Utc::now() - Duration::days(1));
    }
    record
}

pub(crate) fn approved_record(
    credential_type: &CredentialType,
    subject: CredentialSubject,
    expires_at: Option<DateTime<Utc>>,
) -> CredentialRecord {
    let mut record = record_with_status(credential_type, subject, CredentialStatus::Approved);
    record.expires_at = expires_at;
    record.reviewed_at = Some(Utc::now() - Duration::days(1));
    record.reviewed_by = Some("reviewer-1".to_string());
    record
}

pub(crate) fn driver_subject() -> CredentialSubject {
    CredentialSubject::Driver(DriverId("driver-1".to_string()))
}

pub(crate) fn vehicle_subject() -> CredentialSubject {
    CredentialSubject::Vehicle(VehicleId("vehicle-1".to_string()))
}

pub(crate) fn build_service() -> (
    CredentialService<MemoryCredentials, MemoryFleet, MemoryStore>,
    Arc<MemoryCredentials>,
    Arc<MemoryFleet>,
    Arc<MemoryStore>,
) {
    let repository = Arc::new(MemoryCredentials::default());
    let fleet = Arc::new(MemoryFleet::default());
    let store = Arc::new(MemoryStore::default());
    fleet.insert_driver(driver()).expect("seed driver");
    fleet.insert_vehicle(vehicle()).expect("seed vehicle");
    let service = CredentialService::new(repository.clone(), fleet.clone(), store.clone());
    (service, repository, fleet, store)
}

pub(crate) fn credential_router_with_service(
    service: CredentialService<MemoryCredentials, MemoryFleet, MemoryStore>,
) -> axum::Router {
    credential_router(Arc::new(service))
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default, Clone)]
pub(crate) struct MemoryCredentials {
    types: Arc<Mutex<HashMap<CredentialTypeId, CredentialType>>>,
    records: Arc<Mutex<HashMap<CredentialId, CredentialRecord>>>,
    history: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl CredentialRepository for MemoryCredentials {
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

pub(crate) struct UnavailableCredentials;

impl CredentialRepository for UnavailableCredentials {
    fn insert_type(&self, _row: CredentialType) -> Result<CredentialType, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_type(&self, _row: CredentialType) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_type(
        &self,
        _id: &CredentialTypeId,
    ) -> Result<Option<CredentialType>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn types(&self) -> Result<Vec<CredentialType>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _record: CredentialRecord) -> Result<CredentialRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: CredentialRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &CredentialId) -> Result<Option<CredentialRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_subject(
        &self,
        _subject: &CredentialSubject,
    ) -> Result<Vec<CredentialRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn records(&self) -> Result<Vec<CredentialRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn append_history(&self, _entry: HistoryEntry) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn history(&self, _id: &CredentialId) -> Result<Vec<HistoryEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryFleet {
    drivers: Arc<Mutex<HashMap<DriverId, Driver>>>,
    vehicles: Arc<Mutex<HashMap<VehicleId, Vehicle>>>,
    assignments: Arc<Mutex<Vec<VehicleAssignment>>>,
}

impl FleetRepository for MemoryFleet {
    fn insert_driver(&self, driver: Driver) -> Result<Driver, RepositoryError> {
        let mut guard = self.drivers.lock().expect("driver mutex poisoned");
        guard.insert(driver.id.clone(), driver.clone());
        Ok(driver)
    }

    fn driver(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError> {
        let guard = self.drivers.lock().expect("driver mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, RepositoryError> {
        let mut guard = self.vehicles.lock().expect("vehicle mutex poisoned");
        guard.insert(vehicle.id.clone(), vehicle.clone());
        Ok(vehicle)
    }

    fn vehicle(&self, id: &VehicleId) -> Result<Option<Vehicle>, RepositoryError> {
        let guard = self.vehicles.lock().expect("vehicle mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn link_vehicle(&self, assignment: VehicleAssignment) -> Result<(), RepositoryError> {
        self.assignments
            .lock()
            .expect("assignment mutex poisoned")
            .push(assignment);
        Ok(())
    }

    fn vehicles_for_driver(&self, id: &DriverId) -> Result<Vec<Vehicle>, RepositoryError> {
        let vehicles = self.vehicles.lock().expect("vehicle mutex poisoned");
        let assignments = self.assignments.lock().expect("assignment mutex poisoned");
        let mut rows: Vec<Vehicle> = vehicles
            .values()
            .filter(|vehicle| vehicle.owner_driver_id.as_ref() == Some(id))
            .cloned()
            .collect();
        for assignment in assignments.iter().filter(|link| link.driver_id == *id) {
            if let Some(vehicle) = vehicles.get(&assignment.vehicle_id) {
                if !rows.iter().any(|row| row.id == vehicle.id) {
                    rows.push(vehicle.clone());
                }
            }
        }
        Ok(rows)
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryStore {
    objects: Arc<Mutex<HashMap<String, (String, usize)>>>,
}

impl DocumentStore for MemoryStore {
    fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: Mime,
    ) -> Result<StoredDocument, DocumentStoreError> {
        let mut guard = self.objects.lock().expect("store mutex poisoned");
        guard.insert(path.to_string(), (content_type.to_string(), bytes.len()));
        Ok(StoredDocument {
            path: path.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len(),
        })
    }

    fn signed_url(&self, path: &str, ttl: Duration) -> Result<SignedUrl, DocumentStoreError> {
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
