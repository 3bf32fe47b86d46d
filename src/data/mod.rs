//! Typed repositories over the relational store.
//!
//! Every repository borrows a connection (`DatabaseConnection` or a transaction) and returns
//! `DbErr` directly; services lift those into [`Error`](crate::error::Error). Every value is
//! bound as a query parameter by the sea-orm query builder.

pub mod account;
pub mod campaign;
pub mod device;
pub mod payment;
pub mod subscription;
pub mod user;

/// Largest page any listing returns.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Keyset paging over an ordering key.
///
/// Both bounds are exclusive; `count` is clamped to [`MAX_PAGE_SIZE`] and applied as the
/// `LIMIT` after the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<K> {
    pub before: Option<K>,
    pub after: Option<K>,
    pub count: u64,
}

impl<K> Page<K> {
    pub fn first(count: u64) -> Self {
        Self {
            before: None,
            after: None,
            count,
        }
    }

    pub fn before(mut self, key: K) -> Self {
        self.before = Some(key);
        self
    }

    pub fn after(mut self, key: K) -> Self {
        self.after = Some(key);
        self
    }

    pub fn limit(&self) -> u64 {
        self.count.min(MAX_PAGE_SIZE)
    }
}
