use std::sync::Arc;

use tandem_test_utils::prelude::*;

use crate::{
    config::Config,
    error::{Error, ErrorKind},
    model::{
        app::AppState,
        id::Id,
        user::{NewUser, SubscriptionStatus, UserUpdate},
    },
    service::user::UserService,
    store::{keys, EphemeralStore, MemoryStore},
    util::test::{state_over, state_with},
};

mod authenticate;

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{}@example.com", username.to_lowercase()),
        given_name: "Test".to_string(),
        family_name: "User".to_string(),
        email_unconfirmed: true,
        is_admin: false,
    }
}

fn state_with_config(test: &TestSetup, config: Config) -> AppState {
    state_with(test.db.clone(), Arc::new(MemoryStore::new()), config)
}
