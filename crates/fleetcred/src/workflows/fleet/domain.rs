use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for drivers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriverId(pub String);

/// Identifier wrapper for fleet vehicles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

/// How a driver is engaged by the company. Broker acceptance lists and
/// credential applicability both key off this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentType {
    #[serde(rename = "w2")]
    W2,
    #[serde(rename = "1099")]
    Contractor1099,
}

impl EmploymentType {
    pub const fn label(self) -> &'static str {
        match self {
            EmploymentType::W2 => "w2",
            EmploymentType::Contractor1099 => "1099",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Active,
    Inactive,
    Suspended,
}

/// Driver profile fields consumed by credentialing and eligibility. The
/// identity/auth profile lives outside this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub company_id: String,
    pub full_name: String,
    pub employment_type: EmploymentType,
    /// Two-letter home state, when the driver has provided one.
    pub state: Option<String>,
    pub status: DriverStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Sedan,
    Suv,
    Minivan,
    Van,
    WheelchairVan,
    StretcherVan,
    Bus,
}

impl VehicleType {
    pub const fn label(self) -> &'static str {
        match self {
            VehicleType::Sedan => "sedan",
            VehicleType::Suv => "suv",
            VehicleType::Minivan => "minivan",
            VehicleType::Van => "van",
            VehicleType::WheelchairVan => "wheelchair_van",
            VehicleType::StretcherVan => "stretcher_van",
            VehicleType::Bus => "bus",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Active,
    Inactive,
    Retired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleOwnership {
    Company,
    Driver,
}

/// Fleet vehicle snapshot. Photo fields hold document-store paths, never raw
/// URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub company_id: String,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub vehicle_type: VehicleType,
    pub ownership: VehicleOwnership,
    pub owner_driver_id: Option<DriverId>,
    pub seat_capacity: u8,
    pub wheelchair_capacity: u8,
    pub status: VehicleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exterior_photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleAssignmentKind {
    Owned,
    Assigned,
    Borrowed,
}

/// Links a company vehicle to a W-2 driver; 1099 drivers work their own
/// vehicles via `owner_driver_id` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleAssignment {
    pub id: String,
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,
    pub kind: VehicleAssignmentKind,
    pub is_primary: bool,
}
