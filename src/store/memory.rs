//! In-process [`EphemeralStore`] for single-node deployments and tests.
//!
//! Expiry is evaluated lazily on access against tokio's clock, so tests running with a paused
//! clock can move tickets past their TTL with `tokio::time::advance`. Keys nobody reads again
//! are dropped by a sweep that runs on the first access after each [`SWEEP_INTERVAL`].

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{Command, EphemeralStore, SortOrder};
use crate::error::store::StoreError;

#[derive(Debug, Clone)]
enum Entry {
    String(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    SortedSet(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct Slot {
    entry: Entry,
    expires_at: Option<Instant>,
}

/// Minimum time between two sweeps of expired keys.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, Slot>>,
    swept_at: Mutex<Option<Instant>>,
}

type Slots = HashMap<String, Slot>;

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Instant::now();
        let mut swept_at = self
            .swept_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if swept_at.is_none_or(|at| now.duration_since(at) >= SWEEP_INTERVAL) {
            slots.retain(|_, slot| slot.expires_at.is_none_or(|at| at > now));
            *swept_at = Some(now);
        }

        slots
    }

    /// Number of keys held, live or expired but not yet swept.
    #[cfg(test)]
    fn held_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Drops the key if its TTL has passed and returns the live slot, if any.
fn live<'a>(slots: &'a mut Slots, key: &str) -> Option<&'a mut Slot> {
    let expired = slots
        .get(key)
        .and_then(|slot| slot.expires_at)
        .is_some_and(|at| at <= Instant::now());
    if expired {
        slots.remove(key);
    }
    slots.get_mut(key)
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType(key.to_string())
}

fn hash_mut<'a>(slots: &'a mut Slots, key: &str) -> Result<&'a mut HashMap<String, String>, StoreError> {
    if live(slots, key).is_none() {
        slots.insert(
            key.to_string(),
            Slot {
                entry: Entry::Hash(HashMap::new()),
                expires_at: None,
            },
        );
    }
    match slots.get_mut(key).map(|slot| &mut slot.entry) {
        Some(Entry::Hash(hash)) => Ok(hash),
        _ => Err(wrong_type(key)),
    }
}

fn sorted_set_mut<'a>(
    slots: &'a mut Slots,
    key: &str,
) -> Result<&'a mut HashMap<String, f64>, StoreError> {
    if live(slots, key).is_none() {
        slots.insert(
            key.to_string(),
            Slot {
                entry: Entry::SortedSet(HashMap::new()),
                expires_at: None,
            },
        );
    }
    match slots.get_mut(key).map(|slot| &mut slot.entry) {
        Some(Entry::SortedSet(set)) => Ok(set),
        _ => Err(wrong_type(key)),
    }
}

fn list_mut<'a>(slots: &'a mut Slots, key: &str) -> Result<&'a mut VecDeque<String>, StoreError> {
    if live(slots, key).is_none() {
        slots.insert(
            key.to_string(),
            Slot {
                entry: Entry::List(VecDeque::new()),
                expires_at: None,
            },
        );
    }
    match slots.get_mut(key).map(|slot| &mut slot.entry) {
        Some(Entry::List(list)) => Ok(list),
        _ => Err(wrong_type(key)),
    }
}

/// Removes a container key once its last element is gone, as Redis does.
fn drop_if_empty(slots: &mut Slots, key: &str) {
    let empty = match slots.get(key).map(|slot| &slot.entry) {
        Some(Entry::Hash(hash)) => hash.is_empty(),
        Some(Entry::List(list)) => list.is_empty(),
        Some(Entry::SortedSet(set)) => set.is_empty(),
        _ => false,
    };
    if empty {
        slots.remove(key);
    }
}

fn apply(slots: &mut Slots, command: Command) -> Result<(), StoreError> {
    match command {
        Command::Set { key, value, ttl } => {
            slots.insert(
                key,
                Slot {
                    entry: Entry::String(value),
                    expires_at: ttl.map(|ttl| Instant::now() + ttl),
                },
            );
        }
        Command::HashSet { key, fields } => {
            let hash = hash_mut(slots, &key)?;
            hash.extend(fields);
        }
        Command::HashDelete { key, field } => {
            if live(slots, &key).is_some() {
                hash_mut(slots, &key)?.remove(&field);
                drop_if_empty(slots, &key);
            }
        }
        Command::ListPush { key, value } => {
            list_mut(slots, &key)?.push_front(value);
        }
        Command::SortedSetAdd { key, member, score } => {
            sorted_set_mut(slots, &key)?.insert(member, score);
        }
        Command::SortedSetRemove { key, member } => {
            if live(slots, &key).is_some() {
                sorted_set_mut(slots, &key)?.remove(&member);
                drop_if_empty(slots, &key);
            }
        }
        Command::Expire { key, ttl } => {
            if let Some(slot) = live(slots, &key) {
                slot.expires_at = Some(Instant::now() + ttl);
            }
        }
        Command::Delete { key } => {
            slots.remove(&key);
        }
    }
    Ok(())
}

/// Resolves Redis-style inclusive indices against a length.
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let mut slots = self.lock();
        if live(&mut slots, key).is_some() {
            return Ok(false);
        }
        apply(
            &mut slots,
            Command::Set {
                key: key.to_string(),
                value: value.to_string(),
                ttl,
            },
        )?;
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut slots = self.lock();
        match live(&mut slots, key).map(|slot| &slot.entry) {
            None => Ok(None),
            Some(Entry::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut slots = self.lock();
        if live(&mut slots, key).is_none() {
            return Ok(false);
        }
        Ok(slots.remove(key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut slots = self.lock();
        match live(&mut slots, key) {
            Some(slot) => {
                slot.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn hash_set_if_absent(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut slots = self.lock();
        let hash = hash_mut(&mut slots, key)?;
        if hash.contains_key(field) {
            return Ok(false);
        }
        hash.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut slots = self.lock();
        match live(&mut slots, key).map(|slot| &slot.entry) {
            None => Ok(None),
            Some(Entry::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut slots = self.lock();
        match live(&mut slots, key).map(|slot| &slot.entry) {
            None => Ok(HashMap::new()),
            Some(Entry::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut slots = self.lock();
        let removed = match live(&mut slots, key).map(|slot| &mut slot.entry) {
            None => false,
            Some(Entry::Hash(hash)) => hash.remove(field).is_some(),
            Some(_) => return Err(wrong_type(key)),
        };
        drop_if_empty(&mut slots, key);
        Ok(removed)
    }

    async fn hash_delete_if_eq(
        &self,
        key: &str,
        field: &str,
        expected: &str,
    ) -> Result<bool, StoreError> {
        let mut slots = self.lock();
        let removed = match live(&mut slots, key).map(|slot| &mut slot.entry) {
            None => false,
            Some(Entry::Hash(hash)) => {
                if hash.get(field).map(String::as_str) == Some(expected) {
                    hash.remove(field);
                    true
                } else {
                    false
                }
            }
            Some(_) => return Err(wrong_type(key)),
        };
        drop_if_empty(&mut slots, key);
        Ok(removed)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut slots = self.lock();
        sorted_set_mut(&mut slots, key)?.insert(member.to_string(), score);
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
        let mut slots = self.lock();
        let set = match live(&mut slots, key).map(|slot| &slot.entry) {
            None => return Ok(Vec::new()),
            Some(Entry::SortedSet(set)) => set,
            Some(_) => return Err(wrong_type(key)),
        };

        let mut members: Vec<(String, f64)> = set
            .iter()
            .filter(|(_, score)| **score >= min && **score <= max)
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        // Ties are broken lexicographically by member
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        if order == SortOrder::Descending {
            members.reverse();
        }
        if let Some(limit) = limit {
            members.truncate(limit);
        }
        Ok(members)
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut slots = self.lock();
        let removed = match live(&mut slots, key).map(|slot| &mut slot.entry) {
            None => false,
            Some(Entry::SortedSet(set)) => set.remove(member).is_some(),
            Some(_) => return Err(wrong_type(key)),
        };
        drop_if_empty(&mut slots, key);
        Ok(removed)
    }

    async fn list_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>, StoreError> {
        let mut slots = self.lock();
        let list = match live(&mut slots, key).map(|slot| &slot.entry) {
            None => return Ok(Vec::new()),
            Some(Entry::List(list)) => list,
            Some(_) => return Err(wrong_type(key)),
        };

        Ok(match resolve_range(list.len(), start, stop) {
            Some((start, stop)) => list.range(start..=stop).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn delete_if_eq(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut slots = self.lock();
        let matches = match live(&mut slots, key).map(|slot| &slot.entry) {
            None => false,
            Some(Entry::String(value)) => value == expected,
            Some(_) => return Err(wrong_type(key)),
        };
        if matches {
            slots.remove(key);
        }
        Ok(matches)
    }

    async fn batch(
        &self,
        commands: Vec<Command>,
    ) -> Result<Vec<Result<(), StoreError>>, StoreError> {
        let mut slots = self.lock();
        Ok(commands
            .into_iter()
            .map(|command| apply(&mut slots, command))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{MemoryStore, SWEEP_INTERVAL};
    use crate::{
        error::store::StoreError,
        store::{Command, EphemeralStore, SortOrder},
    };

    mod set_if_absent {
        use super::*;

        /// Expect the second writer to lose while the key lives
        #[tokio::test]
        async fn refuses_existing_key() -> Result<(), StoreError> {
            let store = MemoryStore::new();

            assert!(store.set_if_absent("k", "first", None).await?);
            assert!(!store.set_if_absent("k", "second", None).await?);
            assert_eq!(store.get("k").await?, Some("first".to_string()));

            Ok(())
        }

        /// Expect the key to disappear once its TTL passes
        #[tokio::test(start_paused = true)]
        async fn expires_after_ttl() -> Result<(), StoreError> {
            let store = MemoryStore::new();
            store
                .set_if_absent("k", "v", Some(Duration::from_secs(10)))
                .await?;

            tokio::time::advance(Duration::from_secs(9)).await;
            assert_eq!(store.get("k").await?, Some("v".to_string()));

            tokio::time::advance(Duration::from_secs(1)).await;
            assert_eq!(store.get("k").await?, None);
            assert!(store.set_if_absent("k", "again", None).await?);

            Ok(())
        }
    }

    mod hashes {
        use super::*;

        /// Expect reservations to be exclusive and conditional release to respect the owner
        #[tokio::test]
        async fn reserves_and_releases_fields() -> Result<(), StoreError> {
            let store = MemoryStore::new();

            assert!(store.hash_set_if_absent("names", "ada", "1").await?);
            assert!(!store.hash_set_if_absent("names", "ada", "2").await?);
            assert!(!store.hash_delete_if_eq("names", "ada", "2").await?);
            assert!(store.hash_delete_if_eq("names", "ada", "1").await?);
            assert_eq!(store.hash_get("names", "ada").await?, None);
            assert!(store.hash_get_all("names").await?.is_empty());

            Ok(())
        }

        /// Expect hash operations on a string key to fail with a wrong type error
        #[tokio::test]
        async fn rejects_wrong_type() -> Result<(), StoreError> {
            let store = MemoryStore::new();
            store.set_if_absent("plain", "v", None).await?;

            let result = store.hash_get("plain", "field").await;

            assert!(matches!(result, Err(StoreError::WrongType(_))));

            Ok(())
        }
    }

    mod sorted_sets {
        use super::*;

        /// Expect score bounds, order and limit to be honored
        #[tokio::test]
        async fn ranges_by_score() -> Result<(), StoreError> {
            let store = MemoryStore::new();
            store.zadd("z", "a", 1.0).await?;
            store.zadd("z", "b", 2.0).await?;
            store.zadd("z", "c", 3.0).await?;
            store.zadd("z", "d", 4.0).await?;

            let ascending = store
                .zrange_by_score("z", 2.0, f64::INFINITY, SortOrder::Ascending, Some(2))
                .await?;
            let descending = store
                .zrange_by_score("z", f64::NEG_INFINITY, f64::INFINITY, SortOrder::Descending, None)
                .await?;

            assert_eq!(
                ascending,
                vec![("b".to_string(), 2.0), ("c".to_string(), 3.0)]
            );
            assert_eq!(
                descending.iter().map(|(m, _)| m.as_str()).collect::<Vec<_>>(),
                vec!["d", "c", "b", "a"]
            );

            assert!(store.zrem("z", "a").await?);
            assert!(!store.zrem("z", "a").await?);

            Ok(())
        }
    }

    mod batch {
        use super::*;

        /// Expect replies in submission order with per-command failures
        #[tokio::test]
        async fn replies_in_submission_order() -> Result<(), StoreError> {
            let store = MemoryStore::new();
            store.set_if_absent("plain", "v", None).await?;

            let replies = store
                .batch(vec![
                    Command::ListPush {
                        key: "list".to_string(),
                        value: "1".to_string(),
                    },
                    Command::HashSet {
                        key: "plain".to_string(),
                        fields: vec![("f".to_string(), "v".to_string())],
                    },
                    Command::ListPush {
                        key: "list".to_string(),
                        value: "2".to_string(),
                    },
                ])
                .await?;

            assert!(replies[0].is_ok());
            assert!(matches!(replies[1], Err(StoreError::WrongType(_))));
            assert!(replies[2].is_ok());
            assert_eq!(store.list_range("list", 0, -1).await?, vec!["2", "1"]);
            assert_eq!(store.list_range("list", 0, 0).await?, vec!["2"]);
            assert!(store.list_range("list", 5, 10).await?.is_empty());

            Ok(())
        }
    }

    mod delete_if_eq {
        use super::*;

        /// Expect the key to be removed only while it holds the expected value
        #[tokio::test]
        async fn deletes_only_expected_value() -> Result<(), StoreError> {
            let store = MemoryStore::new();
            store.set_if_absent("tokens:a:b", "1", None).await?;

            assert!(!store.delete_if_eq("tokens:a:b", "2").await?);
            assert!(!store.delete_if_eq("tokens:c:d", "1").await?);
            assert!(store.delete_if_eq("tokens:a:b", "1").await?);
            assert_eq!(store.get("tokens:a:b").await?, None);

            Ok(())
        }
    }

    mod sweep {
        use super::*;

        /// Expect expired keys nobody reads again to be dropped by a later write
        #[tokio::test(start_paused = true)]
        async fn drops_unread_expired_keys() -> Result<(), StoreError> {
            let store = MemoryStore::new();
            for i in 0..1_000 {
                store
                    .set_if_absent(&format!("tokens:{i}:x"), "1", Some(Duration::from_secs(300)))
                    .await?;
            }
            assert_eq!(store.held_keys(), 1_000);

            tokio::time::advance(Duration::from_secs(3_600)).await;
            store.set_if_absent("fresh", "1", None).await?;

            assert_eq!(store.held_keys(), 1);

            Ok(())
        }

        /// Expect no sweep before the interval elapses
        #[tokio::test(start_paused = true)]
        async fn waits_for_interval() -> Result<(), StoreError> {
            let store = MemoryStore::new();
            store.set_if_absent("fresh", "1", None).await?;
            store
                .set_if_absent("short", "1", Some(Duration::from_secs(1)))
                .await?;

            tokio::time::advance(Duration::from_secs(2)).await;
            store.set_if_absent("other", "1", None).await?;
            assert_eq!(store.held_keys(), 3);

            tokio::time::advance(SWEEP_INTERVAL).await;
            store.set_if_absent("last", "1", None).await?;
            assert_eq!(store.held_keys(), 3);

            Ok(())
        }
    }

    mod expire_command {
        use super::*;

        /// Expect a batched TTL to expire the key and to skip missing keys
        #[tokio::test(start_paused = true)]
        async fn expires_through_batch() -> Result<(), StoreError> {
            let store = MemoryStore::new();
            store.hash_set_if_absent("index", "tokens:a:b", "").await?;

            let replies = store
                .batch(vec![
                    Command::Expire {
                        key: "index".to_string(),
                        ttl: Duration::from_secs(10),
                    },
                    Command::Expire {
                        key: "missing".to_string(),
                        ttl: Duration::from_secs(10),
                    },
                ])
                .await?;

            assert!(replies.iter().all(Result::is_ok));
            tokio::time::advance(Duration::from_secs(10)).await;
            assert!(store.hash_get_all("index").await?.is_empty());
            assert_eq!(store.get("missing").await?, None);

            Ok(())
        }
    }
}
