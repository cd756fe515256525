//! Shared-secret check for destructive endpoints
//!
//! A single static key gates `report-closed`. It is a placeholder trust
//! mechanism, not an authentication system: no rotation, no rate limiting,
//! no per-cafe scoping.

use subtle::ConstantTimeEq;

/// Compare a caller-supplied key against the configured secret in constant time
pub fn check_key(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
