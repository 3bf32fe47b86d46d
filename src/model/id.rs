use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Opaque 64-bit identifier allocated by an [`IdSource`](crate::id::IdSource).
///
/// Ordering by ID approximates insertion order. The canonical string form is the unsigned
/// decimal rendering and parsing accepts exactly that form. Relational rows store the same
/// bits as a signed `BIGINT`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    /// Zero, meaning "not yet assigned".
    pub const UNSET: Id = Id(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_digit())
            && (s == "0" || !s.starts_with('0'));
        if !canonical {
            return Err(Error::ParseError(format!("invalid ID {s:?}")));
        }

        s.parse::<u64>()
            .map(Id)
            .map_err(|e| Error::ParseError(format!("invalid ID {s:?}: {e}")))
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self(value as u64)
    }
}

impl From<Id> for i64 {
    fn from(id: Id) -> Self {
        id.0 as i64
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
