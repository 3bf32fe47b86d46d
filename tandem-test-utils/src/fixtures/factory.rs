//! Factory functions for generating mock database models.
//!
//! Pure functions returning in-memory models with standard test values; nothing is
//! persisted.

use chrono::{Duration, NaiveDateTime, Utc};

use super::next_id;

/// Hex secret shared by every fixture user (128 characters).
pub fn mock_secret() -> String {
    "ab".repeat(64)
}

/// Hex email confirmation code shared by every fixture user (64 characters).
pub fn mock_email_code() -> String {
    "cd".repeat(32)
}

pub fn mock_subscription_model(expires: NaiveDateTime) -> entity::subscription::Model {
    entity::subscription::Model {
        id: next_id(),
        expires,
        auto_renew: false,
        funding_id: None,
        funding_source: None,
    }
}

pub fn mock_user_model(username: &str, subscription_id: i64) -> entity::user::Model {
    let now = Utc::now().naive_utc();
    entity::user::Model {
        id: next_id(),
        username: username.to_string(),
        email: format!("{}@example.com", username.to_lowercase()),
        email_unconfirmed: false,
        email_code: mock_email_code(),
        secret: mock_secret(),
        joined: now,
        given_name: "Test".to_string(),
        family_name: "User".to_string(),
        last_active: now,
        is_admin: false,
        subscription_id,
    }
}

pub fn mock_account_model(user_id: i64, provider: &str, foreign_id: &str) -> entity::account::Model {
    entity::account::Model {
        id: next_id(),
        provider: provider.to_string(),
        foreign_id: foreign_id.to_string(),
        added: Utc::now().naive_utc(),
        email: "test@example.com".to_string(),
        email_verified: true,
        display_name: "Test User".to_string(),
        given_name: "Test".to_string(),
        family_name: "User".to_string(),
        picture: String::new(),
        locale: "en".to_string(),
        timezone: String::new(),
        gender: String::new(),
        access_token: Some("access_token".to_string()),
        refresh_token: None,
        token_expires: Some(Utc::now().naive_utc() + Duration::hours(1)),
        user_id,
    }
}

pub fn mock_device_model(user_id: i64, name: &str) -> entity::device::Model {
    let now = Utc::now().naive_utc();
    entity::device::Model {
        id: next_id(),
        name: name.to_string(),
        last_seen: now,
        last_ip: "203.0.113.7".to_string(),
        client_type: "android_phone".to_string(),
        created: now,
        push_token: None,
        user_id,
    }
}

pub fn mock_campaign_model(
    starts: Option<NaiveDateTime>,
    ends: Option<NaiveDateTime>,
) -> entity::campaign::Model {
    entity::campaign::Model {
        id: next_id(),
        title: "Test Campaign".to_string(),
        description: "Raising funds for tests".to_string(),
        goal: 100_000,
        amount: 0,
        auxilliary: false,
        starts,
        ends,
    }
}

pub fn mock_payment_model(
    user_id: i64,
    campaign: i64,
    amount: i64,
    status: &str,
    created: NaiveDateTime,
) -> entity::payment::Model {
    entity::payment::Model {
        id: next_id(),
        remote_id: None,
        amount,
        message: None,
        created,
        completed: None,
        user_id,
        funding_source_id: None,
        anonymous: false,
        campaign,
        status: status.to_string(),
        error: None,
    }
}
