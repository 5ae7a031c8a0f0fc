pub mod brokers;
pub mod credentials;
pub mod fleet;
pub mod instructions;
