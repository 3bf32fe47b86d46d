//! Service layer for business logic.
//!
//! Services borrow a [`RequestContext`](crate::model::context::RequestContext), coordinate
//! repositories with the ephemeral store, enforce domain rules and hand every field-level
//! change to the audit log.

pub mod account;
pub mod auth;
pub mod campaign;
pub mod device;
pub mod pairing;
pub mod payment;
pub mod retry;
pub mod subscription;
pub mod user;
