use super::domain::{AssignmentId, Broker, BrokerId, BrokerRate, DriverBrokerAssignment};
use crate::workflows::fleet::DriverId;

pub use crate::workflows::fleet::RepositoryError;

/// Storage abstraction for brokers, their rate tables, and driver
/// assignments.
pub trait BrokerRepository: Send + Sync {
    fn insert_broker(&self, broker: Broker) -> Result<Broker, RepositoryError>;
    fn broker(&self, id: &BrokerId) -> Result<Option<Broker>, RepositoryError>;
    fn brokers(&self) -> Result<Vec<Broker>, RepositoryError>;

    fn insert_assignment(
        &self,
        assignment: DriverBrokerAssignment,
    ) -> Result<DriverBrokerAssignment, RepositoryError>;
    fn update_assignment(&self, assignment: DriverBrokerAssignment)
        -> Result<(), RepositoryError>;
    fn assignment(
        &self,
        id: &AssignmentId,
    ) -> Result<Option<DriverBrokerAssignment>, RepositoryError>;
    fn assignments_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<DriverBrokerAssignment>, RepositoryError>;
    fn assignments_for_broker(
        &self,
        broker_id: &BrokerId,
    ) -> Result<Vec<DriverBrokerAssignment>, RepositoryError>;

    fn insert_rate(&self, rate: BrokerRate) -> Result<BrokerRate, RepositoryError>;
    fn update_rate(&self, rate: BrokerRate) -> Result<(), RepositoryError>;
    fn rates_for_broker(&self, broker_id: &BrokerId) -> Result<Vec<BrokerRate>, RepositoryError>;
}
