//! Bearer token verification.
//!
//! Tokens have the shape `ct1.<user_id>.<role>.<expires_unix>.<mac>` where
//! `mac` is a keyed BLAKE3 hash of `user_id|role|expires_unix`. The key is
//! derived from the project secret, so any holder of the secret can both issue
//! and verify tokens. In deployment the issuing half belongs to the external
//! login service; `ct login` stands in for it locally.

use rand::RngCore;
use std::time::Duration;

use crate::error::CaretakerError;
use crate::model::session::{Role, Session};

pub const TOKEN_VERSION: &str = "ct1";
const KEY_CONTEXT: &str = "caretaker 2026-01-15 session token mac v1";
const SECRET_BYTES: usize = 32;

/// Turns a bearer token into a verified [`Session`].
pub trait TokenVerifier {
    /// # Errors
    ///
    /// Returns [`CaretakerError::Unauthorized`] for malformed, forged, or
    /// expired tokens.
    fn verify(&self, token: &str, now_unix: i64) -> Result<Session, CaretakerError>;
}

/// Issues and verifies tokens keyed by a shared secret.
#[derive(Clone)]
pub struct TokenAuthority {
    key: [u8; 32],
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority").finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// # Errors
    ///
    /// Returns [`CaretakerError::Validation`] when the secret is blank.
    pub fn from_secret(secret: &str) -> Result<Self, CaretakerError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(CaretakerError::validation("secret", "must not be empty"));
        }
        Ok(Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
        })
    }

    /// Mint a token for `session` valid for `ttl` from `now_unix`.
    ///
    /// # Errors
    ///
    /// Returns [`CaretakerError::Validation`] when the user id cannot be
    /// embedded in a token.
    pub fn issue(
        &self,
        session: &Session,
        ttl: Duration,
        now_unix: i64,
    ) -> Result<String, CaretakerError> {
        if session.user_id.is_empty()
            || session
                .user_id
                .chars()
                .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(CaretakerError::validation(
                "user",
                format!("'{}' cannot be used as a user id", session.user_id),
            ));
        }
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = now_unix.saturating_add(ttl_secs);
        let mac = self.mac(&session.user_id, session.role, expires);
        Ok(format!(
            "{TOKEN_VERSION}.{}.{}.{expires}.{}",
            session.user_id,
            session.role,
            mac.to_hex()
        ))
    }

    fn mac(&self, user_id: &str, role: Role, expires: i64) -> blake3::Hash {
        let message = format!("{user_id}|{role}|{expires}");
        blake3::keyed_hash(&self.key, message.as_bytes())
    }
}

impl TokenVerifier for TokenAuthority {
    fn verify(&self, token: &str, now_unix: i64) -> Result<Session, CaretakerError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CaretakerError::unauthorized("missing bearer token"));
        }

        // User ids may contain dots, so peel fixed fields off the right.
        let mut parts = token.rsplitn(4, '.');
        let (Some(mac_hex), Some(expires), Some(role), Some(head)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CaretakerError::unauthorized("malformed token"));
        };

        let user_id = head
            .strip_prefix(TOKEN_VERSION)
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|user| !user.is_empty())
            .ok_or_else(|| CaretakerError::unauthorized("malformed token"))?;
        let role: Role = role
            .parse()
            .map_err(|_| CaretakerError::unauthorized("token carries an unknown role"))?;
        let expires: i64 = expires
            .parse()
            .map_err(|_| CaretakerError::unauthorized("malformed token expiry"))?;
        let presented = blake3::Hash::from_hex(mac_hex)
            .map_err(|_| CaretakerError::unauthorized("malformed token signature"))?;

        // blake3::Hash equality is constant-time.
        if presented != self.mac(user_id, role, expires) {
            return Err(CaretakerError::unauthorized("token signature mismatch"));
        }
        if now_unix >= expires {
            return Err(CaretakerError::unauthorized("token expired"));
        }

        Ok(Session::new(user_id, role))
    }
}

/// Fresh random secret, hex encoded.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0_u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
