//! Append-only, field-level audit log.
//!
//! A mutation is described by an [`AuditDelta`]: the audited entity key plus a
//! `field -> (from, to)` map. Recording a delta allocates one audit ID per changed field and
//! writes, in a single batch:
//!
//! - `audit:{key}:item:{id}`: hash with `from`, `to`, `field`, `timestamp`, `user` and `ip`
//! - `audit:{key}`: list of entry IDs, newest at the head
//!
//! Recording is best-effort. A failed write is logged and counted in telemetry but never
//! propagated, so it can't roll back the mutation it describes.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    error::Error,
    model::{context::RequestContext, id::Id},
    store::{first_failure, keys, Command},
    util::time,
};

/// Stand-in recorded for secret-bearing fields.
pub const REDACTED: &str = "[redacted]";

/// Audit key of a relational entity, e.g. `users:42`.
pub fn entity_key(table: &str, id: Id) -> String {
    format!("{table}:{id}")
}

/// String rendering of a value as stored in the audit log.
pub trait AuditValue {
    fn audit_value(&self) -> String;
}

impl AuditValue for String {
    fn audit_value(&self) -> String {
        self.clone()
    }
}

impl AuditValue for str {
    fn audit_value(&self) -> String {
        self.to_string()
    }
}

impl AuditValue for bool {
    fn audit_value(&self) -> String {
        self.to_string()
    }
}

impl AuditValue for i64 {
    fn audit_value(&self) -> String {
        self.to_string()
    }
}

impl AuditValue for Id {
    fn audit_value(&self) -> String {
        self.to_string()
    }
}

impl AuditValue for NaiveDateTime {
    fn audit_value(&self) -> String {
        time::rfc3339(*self)
    }
}

impl<T: AuditValue> AuditValue for Option<T> {
    fn audit_value(&self) -> String {
        self.as_ref().map(AuditValue::audit_value).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub from: String,
    pub to: String,
}

/// Field-level changes to a single audited entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditDelta {
    key: String,
    changes: BTreeMap<String, Change>,
}

impl AuditDelta {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            changes: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn changes(&self) -> &BTreeMap<String, Change> {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Records `field` only when `from` and `to` differ.
    pub fn change<T>(&mut self, field: &str, from: &T, to: &T) -> &mut Self
    where
        T: AuditValue + PartialEq + ?Sized,
    {
        if from != to {
            self.raw(field, from.audit_value(), to.audit_value());
        }
        self
    }

    /// Records a field coming into existence.
    pub fn created<T: AuditValue + ?Sized>(&mut self, field: &str, value: &T) -> &mut Self {
        self.raw(field, String::new(), value.audit_value())
    }

    /// Records a field going away.
    pub fn deleted<T: AuditValue + ?Sized>(&mut self, field: &str, value: &T) -> &mut Self {
        self.raw(field, value.audit_value(), String::new())
    }

    /// Records a secret-bearing field without its value.
    pub fn secret(&mut self, field: &str, from_present: bool, to_present: bool) -> &mut Self {
        let render = |present: bool| if present { REDACTED.to_string() } else { String::new() };
        self.raw(field, render(from_present), render(to_present))
    }

    /// Records a change verbatim.
    pub fn raw(&mut self, field: &str, from: String, to: String) -> &mut Self {
        self.changes.insert(field.to_string(), Change { from, to });
        self
    }
}

/// A single persisted audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub id: Id,
    pub key: String,
    pub field: String,
    pub from: String,
    pub to: String,
    pub ip: String,
    /// Authenticated caller that made the change, if any.
    pub user: Option<Id>,
    /// RFC 3339 time of the change.
    pub timestamp: String,
}

/// Audit sink bound to a request, attributing entries to its caller.
pub struct AuditLog<'a> {
    ctx: &'a RequestContext,
}

impl<'a> AuditLog<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Persists `delta`, logging and counting failures instead of returning them.
    pub async fn record(&self, delta: AuditDelta) {
        if delta.is_empty() {
            return;
        }

        match self.write(&delta).await {
            Ok(()) => self
                .ctx
                .telemetry()
                .record_audit_writes(delta.len() as u64),
            Err(e) => {
                tracing::warn!(
                    "Failed to record {} audit entries for {}: {}",
                    delta.len(),
                    delta.key(),
                    e
                );
                self.ctx.telemetry().record_audit_failure();
            }
        }
    }

    async fn write(&self, delta: &AuditDelta) -> Result<(), Error> {
        let timestamp = time::rfc3339(time::now());
        let user = self.ctx.user().map(|id| id.to_string()).unwrap_or_default();
        let list_key = keys::audit_list(delta.key());

        let mut commands = Vec::with_capacity(delta.len() * 2);
        for (field, change) in delta.changes() {
            let id = self.ctx.ids().next().await?;

            commands.push(Command::HashSet {
                key: keys::audit_item(delta.key(), id),
                fields: vec![
                    ("from".to_string(), change.from.clone()),
                    ("to".to_string(), change.to.clone()),
                    ("field".to_string(), field.clone()),
                    ("timestamp".to_string(), timestamp.clone()),
                    ("user".to_string(), user.clone()),
                    ("ip".to_string(), self.ctx.ip().to_string()),
                ],
            });
            commands.push(Command::ListPush {
                key: list_key.clone(),
                value: id.to_string(),
            });
        }

        first_failure(self.ctx.cache().batch(commands).await?)?;
        Ok(())
    }

    /// Returns up to `count` entries for `key`, newest first.
    pub async fn list(&self, key: &str, count: usize) -> Result<Vec<AuditEntry>, Error> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let ids = self
            .ctx
            .cache()
            .list_range(&keys::audit_list(key), 0, count as i64 - 1)
            .await?;

        let mut entries = Vec::with_capacity(ids.len());
        for raw_id in ids {
            let id = raw_id.parse::<Id>()?;
            let mut item = self
                .ctx
                .cache()
                .hash_get_all(&keys::audit_item(key, id))
                .await?;
            if item.is_empty() {
                continue;
            }

            let mut take = |name: &str| item.remove(name).unwrap_or_default();
            let user = take("user");
            entries.push(AuditEntry {
                id,
                key: key.to_string(),
                field: take("field"),
                from: take("from"),
                to: take("to"),
                ip: take("ip"),
                user: if user.is_empty() {
                    None
                } else {
                    Some(user.parse::<Id>()?)
                },
                timestamp: take("timestamp"),
            });
        }

        Ok(entries)
    }
}
