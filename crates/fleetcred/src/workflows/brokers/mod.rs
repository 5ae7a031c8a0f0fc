//! Trip-source (broker) management: the join flow between drivers and
//! brokers, and per-vehicle-type rate tables.
//!
//! Whether a driver may join is decided by the pure gate in [`eligibility`],
//! fed with rows resolved by the credential workflow so the gate and the
//! dashboards can never disagree about a credential's standing.

pub mod domain;
pub mod eligibility;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AssignmentDecision, AssignmentId, AssignmentMode, AssignmentStatus, Broker, BrokerId,
    BrokerRate, BrokerStatus, DriverBrokerAssignment, NewBroker, RateEntry, RateId, RateUpdate,
    RequestedBy,
};
pub use eligibility::{evaluate, join_state, EligibilityReport, JoinState, VehicleStanding};
pub use repository::{BrokerRepository, RepositoryError};
pub use router::broker_router;
pub use service::{
    BrokerJoinSummary, BrokerOverview, BrokerService, BrokerServiceError, RatesView,
};
