//! Key layout of the ephemeral store.

use crate::model::id::Id;

/// Hash of `lowercase(username)` to user ID.
pub const USERNAMES_TO_IDS: &str = "usernames_to_ids";
/// Hash of `{user_id}:{lowercase(device name)}` to device ID.
pub const DEVICE_NAMES_TO_IDS: &str = "device_names_to_ids";

/// Sorted set of user IDs scored by last activity (Unix seconds).
pub const USERS_BY_LAST_ACTIVE: &str = "users_by_last_active";
/// Sorted set of user IDs scored by join date (Unix seconds).
pub const USERS_BY_JOIN_DATE: &str = "users_by_join_date";
/// Sorted set of user IDs scored by subscription expiry (Unix seconds).
pub const USERS_BY_SUBSCRIPTION_EXPIRATION: &str = "users_by_subscription_expiration";

/// Hash caching the public record of a user, one JSON-encoded value per field.
pub fn user(user_id: Id) -> String {
    format!("users:{user_id}")
}

/// Pairing ticket for an already canonicalized token pair.
pub fn tokens(low: &str, high: &str) -> String {
    format!("tokens:{low}:{high}")
}

/// Hash whose fields are the ticket keys issued to a user.
pub fn user_tickets(user_id: Id) -> String {
    format!("tickets_by_user:{user_id}")
}

/// Audit key for the pairing tickets of a user.
pub fn user_tokens(user_id: Id) -> String {
    format!("tokens:{user_id}")
}

/// Reservation field for a device name, unique per user.
pub fn device_name(user_id: Id, name: &str) -> String {
    format!("{user_id}:{}", name.to_lowercase())
}

/// List of audit entry IDs for an entity key, newest at the head.
pub fn audit_list(key: &str) -> String {
    format!("audit:{key}")
}

/// Hash holding a single audit entry.
pub fn audit_item(key: &str, id: Id) -> String {
    format!("audit:{key}:item:{id}")
}
