use super::domain::{Driver, DriverId, Vehicle, VehicleAssignment, VehicleId};

/// Error enumeration shared by every repository trait in the service.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction for drivers, vehicles, and their assignments.
pub trait FleetRepository: Send + Sync {
    fn insert_driver(&self, driver: Driver) -> Result<Driver, RepositoryError>;
    fn driver(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError>;
    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, RepositoryError>;
    fn vehicle(&self, id: &VehicleId) -> Result<Option<Vehicle>, RepositoryError>;
    fn link_vehicle(&self, assignment: VehicleAssignment) -> Result<(), RepositoryError>;
    /// Vehicles the driver can work: owned rows plus assignment links.
    fn vehicles_for_driver(&self, id: &DriverId) -> Result<Vec<Vehicle>, RepositoryError>;
}
