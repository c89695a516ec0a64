//! HMAC authentication tokens over canonically serialised payloads.
//!
//! A [`Token`] is `HMAC-SHA256(secret, canonical_json(payload))`. It carries no
//! copy of the payload, so the verifier has to rebuild the same payload on its
//! side and recompute the tag.
//!
//! Canonical JSON means: object keys sorted lexicographically at every nesting
//! level, array order preserved, compact separators. Sender and verifier
//! therefore agree on the bytes regardless of how either side built the map.
//!
//! ```rust
//! use courier_kernel::token::{Secret, TokenCodec};
//! use serde_json::json;
//!
//! let codec = TokenCodec::new(Secret::from("registry-secret"));
//! let token = codec.encode(&json!({"status_code": 200})).unwrap();
//! assert!(codec.verify(&json!({"status_code": 200}), &token).unwrap());
//! assert!(!codec.verify(&json!({"status_code": 500}), &token).unwrap());
//! ```

use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 tag in bytes.
pub const TOKEN_LEN: usize = 32;

/// Name of the HTTP header every token travels in.
pub const TOKEN_HEADER: &str = "Token";

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// The payload could not be turned into canonical JSON.
#[derive(Debug, Error)]
#[error("payload cannot be canonically serialised: {0}")]
pub struct EncodingError(#[from] serde_json::Error);

/// A token string is not 64 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenParseError {
    #[error("token is empty")]
    Empty,

    #[error("token must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("token is not valid hex")]
    InvalidHex,
}

// ─────────────────────────────────────────────────────────────────────────────
// Secret
// ─────────────────────────────────────────────────────────────────────────────

/// Shared secret for one trust relationship.
///
/// `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Arc<[u8]>);

impl Secret {
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self(Arc::from(bytes.as_ref()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// UTF-8 view, used only when the secret has to be declared to the
    /// registry inside the self-record.
    pub fn expose(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.0)
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} bytes redacted>)", self.0.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────────────

/// An HMAC-SHA256 tag bound to exactly one (secret, payload) pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token([u8; TOKEN_LEN]);

impl Token {
    /// Parse the wire form (hex, either case, surrounding whitespace ignored).
    pub fn parse(s: &str) -> Result<Self, TokenParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TokenParseError::Empty);
        }
        if s.len() != TOKEN_LEN * 2 {
            return Err(TokenParseError::InvalidLength {
                expected: TOKEN_LEN * 2,
                actual: s.len(),
            });
        }
        let mut bytes = [0u8; TOKEN_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| TokenParseError::InvalidHex)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Lowercase hex, the form sent in the `Token` header.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Token {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Enough to correlate in logs, not enough to replay.
        write!(f, "Token({}…)", &self.to_hex()[..8])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical serialisation
// ─────────────────────────────────────────────────────────────────────────────

/// Serialise `payload` to canonical JSON bytes.
pub fn canonical_bytes<P: Serialize + ?Sized>(payload: &P) -> Result<Vec<u8>, EncodingError> {
    let value = serde_json::to_value(payload)?;
    Ok(serde_json::to_vec(&canonicalize(value))?)
}

/// Rebuild `value` with every object's keys in lexicographic order.
///
/// Independent of whether `serde_json` was compiled with `preserve_order`.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec
// ─────────────────────────────────────────────────────────────────────────────

/// Compute the token for `(secret, payload)`.
pub fn encode<P: Serialize + ?Sized>(secret: &Secret, payload: &P) -> Result<Token, EncodingError> {
    let bytes = canonical_bytes(payload)?;
    Ok(Token(tag(secret, &bytes)))
}

/// Recompute the token for `(secret, payload)` and compare it with `token` in
/// constant time.
pub fn verify<P: Serialize + ?Sized>(
    secret: &Secret,
    payload: &P,
    token: &Token,
) -> Result<bool, EncodingError> {
    let expected = encode(secret, payload)?;
    Ok(expected.0.ct_eq(&token.0).into())
}

fn tag(secret: &Secret, message: &[u8]) -> [u8; TOKEN_LEN] {
    // HMAC accepts keys of any length; `new_from_slice` only fails for
    // fixed-key MACs.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    };
    mac.update(message);
    let mut out = [0u8; TOKEN_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// A [`Secret`] bound to the encode/verify operations.
///
/// Cheap to clone; shared between the registry client, the heartbeat loop and
/// request handlers.
#[derive(Clone, Debug)]
pub struct TokenCodec {
    secret: Secret,
}

impl TokenCodec {
    pub fn new(secret: impl Into<Secret>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn encode<P: Serialize + ?Sized>(&self, payload: &P) -> Result<Token, EncodingError> {
        encode(&self.secret, payload)
    }

    pub fn verify<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        token: &Token,
    ) -> Result<bool, EncodingError> {
        verify(&self.secret, payload, token)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Liveness payload
// ─────────────────────────────────────────────────────────────────────────────

/// The fixed `{"status_code":200}` payload used for heartbeats and
/// liveness-only calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LivenessPayload {
    pub status_code: u16,
}

impl Default for LivenessPayload {
    fn default() -> Self {
        Self { status_code: 200 }
    }
}

pub fn liveness_payload() -> LivenessPayload {
    LivenessPayload::default()
}
