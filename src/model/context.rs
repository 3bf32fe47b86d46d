use sea_orm::DatabaseConnection;

use crate::{
    audit::AuditLog,
    config::Config,
    error::Error,
    id::IdGenerator,
    model::{app::AppState, id::Id},
    store::EphemeralStore,
    util::telemetry::Telemetry,
};

/// Immutable per-request carrier of configuration, caller identity and collaborators.
///
/// Every mutating operation takes exactly one `&RequestContext`; the audit entries it writes
/// are attributed to [`user`](Self::user) and [`ip`](Self::ip).
pub struct RequestContext {
    state: AppState,
    ip: String,
    user: Option<Id>,
}

impl RequestContext {
    pub fn new(state: AppState, ip: String, user: Option<Id>) -> Self {
        Self { state, ip, user }
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub fn cache(&self) -> &dyn EphemeralStore {
        self.state.cache.as_ref()
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.state.ids
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.state.telemetry
    }

    /// Client address of the caller.
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Authenticated caller, `None` for anonymous requests.
    pub fn user(&self) -> Option<Id> {
        self.user
    }

    pub fn audit(&self) -> AuditLog<'_> {
        AuditLog::new(self)
    }

    /// Refuses mutations while the service runs in maintenance mode.
    pub fn ensure_writable(&self) -> Result<(), Error> {
        if self.config().maintenance_mode {
            return Err(Error::MaintenanceMode);
        }
        Ok(())
    }
}
