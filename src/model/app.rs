use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::Config,
    id::IdGenerator,
    model::{context::RequestContext, id::Id},
    store::EphemeralStore,
    util::telemetry::Telemetry,
};

/// Process-wide state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: DatabaseConnection,
    pub cache: Arc<dyn EphemeralStore>,
    pub ids: IdGenerator,
    pub telemetry: Arc<Telemetry>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: DatabaseConnection,
        cache: Arc<dyn EphemeralStore>,
        ids: IdGenerator,
    ) -> Self {
        Self {
            config: Arc::new(config),
            db,
            cache,
            ids,
            telemetry: Arc::new(Telemetry::new()),
        }
    }

    /// Builds the context for a single request from `ip`, authenticated as `user` if known.
    pub fn request(&self, ip: impl Into<String>, user: Option<Id>) -> RequestContext {
        RequestContext::new(self.clone(), ip.into(), user)
    }
}
