use sha2::{Digest, Sha256};

use crate::error::AuthenticationFailure;

/// Session authentication states. The transition is one-directional: a
/// session never returns to `Unauthenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// Compares two digests without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Checks the entered password against the configured SHA-256 digest.
///
/// An undecodable configured digest also fails verification rather than
/// panicking; the operator sees it as a rejected login.
pub fn verify_password(input: &str, expected_hex: &str) -> Result<(), AuthenticationFailure> {
    let expected = hex::decode(expected_hex.trim()).map_err(|_| AuthenticationFailure)?;
    let digest = Sha256::digest(input.as_bytes());
    if constant_time_eq(&digest, &expected) {
        Ok(())
    } else {
        Err(AuthenticationFailure)
    }
}
