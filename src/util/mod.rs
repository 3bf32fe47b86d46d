//! Utility functions shared by services: randomness and constant-time comparison, time
//! conversions, input validation and telemetry counters.

pub mod crypto;
pub mod telemetry;
pub mod time;
pub mod validation;
