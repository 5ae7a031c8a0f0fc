//! Core library for the fleetcred credentialing service.
//!
//! Workflows are grouped by business area under [`workflows`]; the remaining
//! modules carry the cross-cutting concerns (configuration, telemetry, the
//! unified application error, the read-through query cache, and the document
//! storage seam).

pub mod cache;
pub mod config;
pub mod error;
pub mod storage;
pub mod telemetry;
pub mod workflows;
