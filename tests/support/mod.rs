//! Shared state builders for integration tests.

use std::sync::Arc;

use tandem::{
    config::Config, id::IdGenerator, model::app::AppState, store::MemoryStore,
};
use tandem_test_utils::TestSetup;

/// State over the test database with default configuration and an in-memory ephemeral store
pub fn state(test: &TestSetup) -> AppState {
    state_with_config(test, Config::default())
}

pub fn state_with_config(test: &TestSetup, config: Config) -> AppState {
    AppState::new(
        config,
        test.db.clone(),
        Arc::new(MemoryStore::new()),
        IdGenerator::snowflake(),
    )
}
