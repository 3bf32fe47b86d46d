//! Identifier allocation.
//!
//! An [`IdSource`] hands out unique, time-ordered 64-bit identifiers. Two sources exist: the
//! in-process [`SnowflakeIdSource`] and the [`RemoteIdSource`] that asks a shared generator
//! over HTTP. Services never talk to a source directly; they go through the cloneable
//! [`IdGenerator`] handle carried by the request context, which retries transient failures.

pub mod remote;
pub mod snowflake;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

pub use remote::RemoteIdSource;
pub use snowflake::SnowflakeIdSource;

use crate::{
    error::{id::IdError, Error},
    model::id::Id,
    service::retry::RetryContext,
};

/// Source of unique identifiers.
///
/// IDs are unique across every caller of the same source and monotone for a single caller.
#[async_trait]
pub trait IdSource: Send + Sync {
    async fn next_id(&self) -> Result<Id, IdError>;
}

/// Handle used by services to allocate IDs.
#[derive(Clone)]
pub struct IdGenerator {
    source: Arc<dyn IdSource>,
}

impl IdGenerator {
    const MAX_ATTEMPTS: u32 = 5;
    const INITIAL_BACKOFF: Duration = Duration::from_millis(25);

    pub fn new(source: Arc<dyn IdSource>) -> Self {
        Self { source }
    }

    /// Generator backed by a fresh in-process snowflake source with a random worker ID.
    pub fn snowflake() -> Self {
        Self::new(Arc::new(SnowflakeIdSource::new()))
    }

    /// Allocates the next ID, retrying transient failures up to five attempts.
    pub async fn next(&self) -> Result<Id, Error> {
        let ctx = RetryContext::with_policy(Self::MAX_ATTEMPTS, Self::INITIAL_BACKOFF);

        ctx.execute_with_retry("ID allocation", || {
            let source = self.source.clone();
            Box::pin(async move { Ok(source.next_id().await?) })
        })
        .await
    }
}
