//! Device pairing through short-lived token tickets.
//!
//! Pairing two devices of the same user works as a rendezvous: the signed-in device issues a
//! ticket of two short tokens, the user carries them to the other device, and that device
//! redeems them for the issuer's user ID. Tokens are compared order-independently, so a
//! ticket is stored under its canonical `(min, max)` pair.
//!
//! A ticket lives for [`TICKET_TTL`] and can be redeemed any number of times until then.
//! Each user's ticket keys are also listed in a per-user index hash, which expires with the
//! user's newest ticket, so a user's tickets can be dropped without scanning the keyspace.

use std::time::Duration;

use crate::{
    audit::AuditDelta,
    error::{auth::AuthError, pairing::PairingError, Error},
    model::{context::RequestContext, id::Id},
    store::{first_failure, keys, Command},
    util::crypto,
};

/// Symbols tokens are drawn from; excludes look-alikes such as `0/O`, `1/l/I` and `u/v`.
pub const TOKEN_ALPHABET: &[u8] = b"abcdefghjkmnpqrstwxyzABCDEFGHJKMNPQRSTWXYZ23456789";
pub const TOKEN_LENGTH: usize = 5;
pub const TICKET_TTL: Duration = Duration::from_secs(300);

/// Draws a single token from the cryptographic RNG.
pub fn generate_token() -> String {
    crypto::random_string(TOKEN_ALPHABET, TOKEN_LENGTH)
}

/// Whether `token` has the length and alphabet of an issued token.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.bytes().all(|b| TOKEN_ALPHABET.contains(&b))
}

/// Orders a token pair so both presentation orders map to the same ticket.
pub fn canonicalize<'t>(x: &'t str, y: &'t str) -> (&'t str, &'t str) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

pub struct PairingService<'a> {
    ctx: &'a RequestContext,
}

impl<'a> PairingService<'a> {
    pub fn new(ctx: &'a RequestContext) -> Self {
        Self { ctx }
    }

    /// Issues a ticket for `user_id` and returns its two tokens.
    ///
    /// # Returns
    /// - `Ok((a, b))` - Tokens in canonical order
    /// - `Err(Error::PairingError(PairingError::Collision))` - The pair is held by a live
    ///   ticket; the caller may simply issue again
    pub async fn issue(&self, user_id: Id) -> Result<(String, String), Error> {
        self.store_ticket(user_id, &generate_token(), &generate_token())
            .await
    }

    async fn store_ticket(
        &self,
        user_id: Id,
        first: &str,
        second: &str,
    ) -> Result<(String, String), Error> {
        let (low, high) = canonicalize(first, second);
        let ticket = keys::tokens(low, high);

        let written = self
            .ctx
            .cache()
            .set_if_absent(&ticket, &user_id.to_string(), Some(TICKET_TTL))
            .await?;
        if !written {
            tracing::debug!("Pairing tokens collided with a live ticket for user {}", user_id);
            return Err(PairingError::Collision.into());
        }

        let index = keys::user_tickets(user_id);
        let replies = self
            .ctx
            .cache()
            .batch(vec![
                Command::HashSet {
                    key: index.clone(),
                    fields: vec![(ticket, String::new())],
                },
                Command::Expire {
                    key: index,
                    ttl: TICKET_TTL,
                },
            ])
            .await?;
        first_failure(replies)?;

        let mut delta = AuditDelta::new(keys::user_tokens(user_id));
        delta.raw(low, String::new(), high.to_string());
        self.ctx.audit().record(delta).await;

        Ok((low.to_string(), high.to_string()))
    }

    /// Looks up the user holding the ticket for `x` and `y`, in either order.
    ///
    /// Malformed tokens resolve to `None` without touching the store.
    pub async fn resolve(&self, x: &str, y: &str) -> Result<Option<Id>, Error> {
        if !is_well_formed(x) || !is_well_formed(y) {
            return Ok(None);
        }

        let (low, high) = canonicalize(x, y);
        match self.ctx.cache().get(&keys::tokens(low, high)).await? {
            Some(value) => value.parse::<Id>().map(Some).map_err(|_| {
                Error::InternalError(format!("Pairing ticket holds invalid user ID {value:?}"))
            }),
            None => Ok(None),
        }
    }

    /// Redeems a ticket for the issuing user's ID.
    ///
    /// Redemption does not consume the ticket.
    pub async fn redeem(&self, x: &str, y: &str) -> Result<Id, Error> {
        self.resolve(x, y)
            .await?
            .ok_or_else(|| AuthError::InvalidCredentials.into())
    }

    /// Deletes every live ticket held by `user_id`, returning how many were removed.
    ///
    /// Only tickets listed in the user's index are visited. A listed key that expired and was
    /// reissued to another user is left alone.
    pub async fn invalidate_user(&self, user_id: Id) -> Result<u64, Error> {
        let cache = self.ctx.cache();
        let index = keys::user_tickets(user_id);
        let owner = user_id.to_string();

        let mut removed = 0;
        for ticket in cache.hash_get_all(&index).await?.into_keys() {
            if cache.delete_if_eq(&ticket, &owner).await? {
                removed += 1;
            }
        }
        cache.delete(&index).await?;

        if removed > 0 {
            tracing::debug!("Invalidated {} pairing tickets for user {}", removed, user_id);
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        error::ErrorKind,
        util::test::{chi_square, test_state},
    };

    mod tokens {
        use super::*;

        /// Expect tokens of the documented length over the alphabet
        #[test]
        fn generates_well_formed_tokens() {
            for _ in 0..1_000 {
                let token = generate_token();
                assert!(is_well_formed(&token), "{token:?}");
            }
        }

        /// Expect every alphabet symbol to be drawn with equal frequency
        ///
        /// 100,000 symbols over 50; the bound sits near the 1e-7 tail of chi-square with 49
        /// degrees of freedom.
        #[test]
        fn draws_symbols_uniformly() {
            let mut counts = [0u64; TOKEN_ALPHABET.len()];
            for _ in 0..20_000 {
                for symbol in generate_token().bytes() {
                    let position = TOKEN_ALPHABET.iter().position(|&b| b == symbol).unwrap();
                    counts[position] += 1;
                }
            }

            let statistic = chi_square(&counts);
            assert!(statistic < 125.0, "chi-square {statistic} over {counts:?}");
        }

        #[test]
        fn rejects_malformed_tokens() {
            for token in ["abcd", "abcdef", "abcd0", "abcdl", "ab cd", "abcdé"] {
                assert!(!is_well_formed(token), "{token:?}");
            }
        }

        #[test]
        fn canonicalizes_order() {
            assert_eq!(canonicalize("bbbbb", "aaaaa"), ("aaaaa", "bbbbb"));
            assert_eq!(canonicalize("aaaaa", "bbbbb"), ("aaaaa", "bbbbb"));
        }
    }

    mod redeem {
        use super::*;

        /// Expect the issuer's ID regardless of token order, repeatedly
        #[tokio::test]
        async fn redeems_in_either_order() {
            let state = test_state().await;
            let ctx = state.request("10.0.0.1", Some(Id::new(42)));
            let pairing = PairingService::new(&ctx);

            let (a, b) = pairing.issue(Id::new(42)).await.unwrap();

            assert_eq!(pairing.redeem(&a, &b).await.unwrap(), Id::new(42));
            assert_eq!(pairing.redeem(&b, &a).await.unwrap(), Id::new(42));
            assert_eq!(pairing.redeem(&a, &b).await.unwrap(), Id::new(42));
        }

        /// Expect invalid credentials once the ticket expires
        #[tokio::test]
        async fn rejects_expired_ticket() {
            let state = test_state().await;
            tokio::time::pause();
            let ctx = state.request("10.0.0.1", Some(Id::new(42)));
            let pairing = PairingService::new(&ctx);

            let (a, b) = pairing.issue(Id::new(42)).await.unwrap();

            tokio::time::advance(Duration::from_secs(299)).await;
            assert_eq!(pairing.redeem(&a, &b).await.unwrap(), Id::new(42));

            tokio::time::advance(Duration::from_secs(2)).await;
            let result = pairing.redeem(&a, &b).await;
            assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidCredentials);
        }

        /// Expect malformed and unknown tokens to be invalid credentials
        #[tokio::test]
        async fn rejects_unknown_and_malformed_tokens() {
            let state = test_state().await;
            let ctx = state.request("10.0.0.1", None);
            let pairing = PairingService::new(&ctx);

            for (x, y) in [("abcde", "fghjk"), ("abc", "fghjk"), ("abcd0", "fghjk")] {
                let result = pairing.redeem(x, y).await;
                assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidCredentials);
            }
        }
    }

    mod issue {
        use super::*;

        /// Expect a collision when the pair is held by a live ticket, in either order
        #[tokio::test]
        async fn fails_on_collision() {
            let state = test_state().await;
            let ctx = state.request("10.0.0.1", None);
            let pairing = PairingService::new(&ctx);

            let issued = pairing.store_ticket(Id::new(1), "qrstw", "abcde").await.unwrap();
            assert_eq!(issued, ("abcde".to_string(), "qrstw".to_string()));

            let result = pairing.store_ticket(Id::new(2), "abcde", "qrstw").await;

            assert_eq!(result.unwrap_err().kind(), ErrorKind::UniqueConflict);
            assert_eq!(pairing.resolve("qrstw", "abcde").await.unwrap(), Some(Id::new(1)));
        }

        /// Expect the ticket to be audited under the user's token key
        #[tokio::test]
        async fn audits_issued_ticket() {
            let state = test_state().await;
            let ctx = state.request("10.0.0.1", Some(Id::new(42)));
            let pairing = PairingService::new(&ctx);

            let (a, b) = pairing.issue(Id::new(42)).await.unwrap();
            let entries = ctx.audit().list("tokens:42", 10).await.unwrap();

            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].field, a);
            assert_eq!(entries[0].from, "");
            assert_eq!(entries[0].to, b);
        }
    }

    mod invalidate_user {
        use super::*;

        /// Expect only the user's tickets to be removed
        #[tokio::test]
        async fn removes_only_users_tickets() {
            let state = test_state().await;
            let ctx = state.request("10.0.0.1", None);
            let pairing = PairingService::new(&ctx);

            let (a1, b1) = pairing.issue(Id::new(1)).await.unwrap();
            let (a2, b2) = pairing.issue(Id::new(1)).await.unwrap();
            let (a3, b3) = pairing.issue(Id::new(2)).await.unwrap();

            let removed = pairing.invalidate_user(Id::new(1)).await.unwrap();

            assert_eq!(removed, 2);
            assert_eq!(pairing.resolve(&a1, &b1).await.unwrap(), None);
            assert_eq!(pairing.resolve(&a2, &b2).await.unwrap(), None);
            assert_eq!(pairing.resolve(&a3, &b3).await.unwrap(), Some(Id::new(2)));
            assert!(ctx
                .cache()
                .hash_get_all(&keys::user_tickets(Id::new(1)))
                .await
                .unwrap()
                .is_empty());
        }

        /// Expect a ticket reissued to another user after expiry to survive
        #[tokio::test]
        async fn keeps_ticket_reissued_to_other_user() {
            let state = test_state().await;
            tokio::time::pause();
            let ctx = state.request("10.0.0.1", None);
            let pairing = PairingService::new(&ctx);

            pairing.store_ticket(Id::new(1), "abcde", "qrstw").await.unwrap();
            tokio::time::advance(Duration::from_secs(200)).await;
            pairing.issue(Id::new(1)).await.unwrap();
            tokio::time::advance(Duration::from_secs(150)).await;
            pairing.store_ticket(Id::new(2), "abcde", "qrstw").await.unwrap();

            let removed = pairing.invalidate_user(Id::new(1)).await.unwrap();

            assert_eq!(removed, 1);
            assert_eq!(pairing.resolve("abcde", "qrstw").await.unwrap(), Some(Id::new(2)));
        }

        /// Expect the index to expire with the user's newest ticket
        #[tokio::test]
        async fn index_expires_with_tickets() {
            let state = test_state().await;
            tokio::time::pause();
            let ctx = state.request("10.0.0.1", None);
            let pairing = PairingService::new(&ctx);
            let index = keys::user_tickets(Id::new(1));

            pairing.issue(Id::new(1)).await.unwrap();
            tokio::time::advance(Duration::from_secs(100)).await;
            pairing.issue(Id::new(1)).await.unwrap();
            assert_eq!(ctx.cache().hash_get_all(&index).await.unwrap().len(), 2);

            tokio::time::advance(TICKET_TTL).await;

            assert!(ctx.cache().hash_get_all(&index).await.unwrap().is_empty());
            assert_eq!(pairing.invalidate_user(Id::new(1)).await.unwrap(), 0);
        }
    }
}
