//! [`EphemeralStore`] backed by Redis/Valkey through a fred connection pool.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use fred::{
    prelude::*,
    types::{Expiration, SetOptions, Value},
};

use super::{
    lua::{DELETE_IF_EQ_SCRIPT, HASH_DELETE_IF_EQ_SCRIPT, RANGE_BY_SCORE_SCRIPT},
    Command, EphemeralStore, SortOrder,
};
use crate::error::store::StoreError;

#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

fn millis(ttl: Duration) -> i64 {
    // Redis rejects a zero TTL
    (ttl.as_millis() as i64).max(1)
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let reply: Option<String> = self
            .pool
            .set(
                key,
                value,
                ttl.map(|ttl| Expiration::PX(millis(ttl))),
                Some(SetOptions::NX),
                false,
            )
            .await?;

        // NX answers OK when written and nil when the key already exists
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.pool.get(key).await?)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed: i64 = self.pool.del(key).await?;
        Ok(removed > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let updated: i64 = self.pool.pexpire(key, millis(ttl), None).await?;
        Ok(updated == 1)
    }

    async fn hash_set_if_absent(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        let written: i64 = self.pool.hsetnx(key, field, value).await?;
        Ok(written == 1)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self.pool.hget(key, field).await?)
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.pool.hgetall(key).await?)
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let removed: i64 = self.pool.hdel(key, field).await?;
        Ok(removed > 0)
    }

    async fn hash_delete_if_eq(
        &self,
        key: &str,
        field: &str,
        expected: &str,
    ) -> Result<bool, StoreError> {
        let removed: i64 = self
            .pool
            .eval(HASH_DELETE_IF_EQ_SCRIPT, vec![key], vec![field, expected])
            .await?;
        Ok(removed == 1)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let _: i64 = self
            .pool
            .zadd(key, None, None, false, false, (score, member))
            .await?;
        Ok(())
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let direction = match order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        let limit = limit.map_or(-1, |limit| limit as i64);

        let flat: Vec<String> = self
            .pool
            .eval(
                RANGE_BY_SCORE_SCRIPT,
                vec![key],
                vec![
                    min.to_string(),
                    max.to_string(),
                    direction.to_string(),
                    limit.to_string(),
                ],
            )
            .await?;

        flat.chunks_exact(2)
            .map(|pair| {
                let score = pair[1]
                    .parse::<f64>()
                    .map_err(|_| StoreError::WrongType(key.to_string()))?;
                Ok((pair[0].clone(), score))
            })
            .collect()
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let removed: i64 = self.pool.zrem(key, member).await?;
        Ok(removed > 0)
    }

    async fn list_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self.pool.lrange(key, start, stop).await?)
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let removed: i64 = self
            .pool
            .eval(DELETE_IF_EQ_SCRIPT, vec![key], vec![expected])
            .await?;
        Ok(removed == 1)
    }

    async fn batch(
        &self,
        commands: Vec<Command>,
    ) -> Result<Vec<Result<(), StoreError>>, StoreError> {
        let pipeline = self.pool.next().pipeline();

        for command in commands {
            match command {
                Command::Set { key, value, ttl } => {
                    let _: () = pipeline
                        .set(key, value, ttl.map(|ttl| Expiration::PX(millis(ttl))), None, false)
                        .await?;
                }
                Command::HashSet { key, fields } => {
                    let fields: HashMap<String, String> = fields.into_iter().collect();
                    let _: () = pipeline.hset(key, fields).await?;
                }
                Command::HashDelete { key, field } => {
                    let _: () = pipeline.hdel(key, field).await?;
                }
                Command::ListPush { key, value } => {
                    let _: () = pipeline.lpush(key, value).await?;
                }
                Command::SortedSetAdd { key, member, score } => {
                    let _: () = pipeline
                        .zadd(key, None, None, false, false, (score, member))
                        .await?;
                }
                Command::SortedSetRemove { key, member } => {
                    let _: () = pipeline.zrem(key, member).await?;
                }
                Command::Expire { key, ttl } => {
                    let _: () = pipeline.pexpire(key, millis(ttl), None).await?;
                }
                Command::Delete { key } => {
                    let _: () = pipeline.del(key).await?;
                }
            }
        }

        let replies = pipeline.try_all::<Value>().await;
        Ok(replies
            .into_iter()
            .map(|reply| reply.map(|_| ()).map_err(StoreError::from))
            .collect())
    }
}
