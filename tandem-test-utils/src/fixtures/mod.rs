//! Test fixture modules for database and HTTP mock creation.
//!
//! - `factory` - in-memory models with standard test values
//! - `user` - users with their subscriptions, accounts and devices
//! - `campaign` - campaigns and payments
//! - `google` - identity provider token and userinfo endpoints

pub mod campaign;
pub mod factory;
pub mod google;
pub mod user;

use std::sync::atomic::{AtomicI64, Ordering};

static NEXT_ID: AtomicI64 = AtomicI64::new(1_000);

/// Unique primary key for rows inserted by fixtures.
pub fn next_id() -> i64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}
