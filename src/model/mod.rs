//! Domain models and type definitions.
//!
//! Contains application state, the per-request context, database model aliases and the
//! input/output types used by services. Outward-facing DTOs never carry secrets or provider
//! tokens.

pub mod account;
pub mod app;
pub mod campaign;
pub mod context;
pub mod db;
pub mod device;
pub mod id;
pub mod payment;
pub mod user;
