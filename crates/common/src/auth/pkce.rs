//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for authorization without a client secret. The code
//! verifier is a single-use secret: the challenge struct zeroizes all of its
//! material on drop, so every exit path of the login flow clears it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Generate a cryptographically secure code verifier
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43
/// characters). Per RFC 7636, verifiers must be 43-128 characters long.
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Generate the code challenge for a verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier))).
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state token for CSRF protection
#[must_use]
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Validate the state returned by the authorization redirect.
///
/// Uses a constant-time comparison so the check leaks nothing about how much
/// of a forged state matched.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    constant_time_eq(expected.as_bytes(), actual.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

/// PKCE challenge triple for one authorization attempt.
///
/// `code_verifier` is kept secret until the token exchange; `code_challenge`
/// and `state` travel in the authorization request. The whole triple is
/// single-use and zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PkceChallenge {
    /// Random secret (43 chars base64url), sent only during token exchange.
    pub code_verifier: String,

    /// SHA256 hash of `code_verifier` (base64url), sent in the
    /// authorization request for server-side validation.
    pub code_challenge: String,

    /// Random anti-forgery token; must match between request and redirect.
    pub state: String,
}

impl PkceChallenge {
    /// Generate a new challenge with cryptographically secure random values.
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        let state = generate_state();

        Self { code_verifier, code_challenge, state }
    }

    /// Challenge method identifier (always "S256").
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the verifier
        f.debug_struct("PkceChallenge")
            .field("code_challenge", &self.code_challenge)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
