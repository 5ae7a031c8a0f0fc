//! Driver and vehicle records shared by the credentialing and broker
//! workflows.

pub mod domain;
pub mod repository;

pub use domain::{
    Driver, DriverId, DriverStatus, EmploymentType, Vehicle, VehicleAssignment,
    VehicleAssignmentKind, VehicleId, VehicleOwnership, VehicleStatus, VehicleType,
};
pub use repository::{FleetRepository, RepositoryError};
