//! Secret generation and comparison.
//!
//! All randomness comes from `rand::rng()`, a ChaCha12 generator seeded from the operating
//! system and periodically reseeded.

use rand::{Rng, RngCore};
use subtle::ConstantTimeEq;

/// Random bytes in a user secret. Rendered as 128 hex characters.
pub const SECRET_BYTES: usize = 64;
/// Random bytes in an email confirmation code. Rendered as 64 hex characters.
pub const EMAIL_CODE_BYTES: usize = 32;

/// Returns `len` random bytes rendered as lowercase hex.
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Picks `len` symbols uniformly from `alphabet`.
pub fn random_string(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

/// Compares two strings in constant time.
///
/// Every byte of the longer input is examined regardless of where the inputs differ, so the
/// running time depends only on the lengths.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let len = a.len().max(b.len());

    let mut padded_a = vec![0u8; len];
    let mut padded_b = vec![0u8; len];
    padded_a[..a.len()].copy_from_slice(a);
    padded_b[..b.len()].copy_from_slice(b);

    let same_len = (a.len() as u64).ct_eq(&(b.len() as u64));
    let same_bytes = padded_a.ct_eq(&padded_b);

    bool::from(same_len & same_bytes)
}
