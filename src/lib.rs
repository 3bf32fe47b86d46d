//! Persistence and domain core for the tandem account service.
//!
//! The crate covers identity (username/secret authentication, subscriptions, Google sign-in),
//! device pairing through short-lived token tickets, campaigns and payments, and an
//! append-only field-level audit log. Durable state lives in a relational store accessed
//! through sea-orm; pairing tickets, reservations and secondary indices live in an ephemeral
//! key/value store (Redis/Valkey or in-process).
//!
//! Every mutating operation takes a [`RequestContext`](model::context::RequestContext) built
//! from the process-wide [`AppState`](model::app::AppState).

pub mod audit;
pub mod config;
pub mod data;
pub mod error;
pub mod id;
pub mod model;
pub mod service;
pub mod startup;
pub mod store;
pub mod util;
