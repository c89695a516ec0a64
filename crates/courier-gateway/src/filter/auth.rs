//! HMAC token authentication for inbound requests.
//!
//! Callers put `HMAC(gateway_secret, canonical_json(payload))` in the `Token`
//! header. The payload is either the request's JSON body or, for calls that
//! carry no body, the fixed liveness payload `{"status_code":200}`.
//!
//! Requests without a usable token, or whose token does not match, are
//! rejected before any business logic runs.

use axum::http::HeaderMap;
use courier_kernel::token::{TOKEN_HEADER, liveness_payload};
use courier_kernel::{EncodingError, Token, TokenCodec};
use serde_json::Value;
use std::fmt;
use tracing::{error, warn};

/// Payload a request's token is expected to cover.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPayload {
    /// The declared JSON body.
    Body(Value),
    /// `{"status_code":200}` for liveness-only calls.
    Liveness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No `Token` header, or one that is not 64 hex characters.
    MissingToken,
    /// Well-formed token that does not match the payload.
    InvalidToken,
}

impl RejectReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::MissingToken => "MISSING_TOKEN",
            RejectReason::InvalidToken => "INVALID_TOKEN",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingToken => f.write_str("missing or malformed token"),
            RejectReason::InvalidToken => f.write_str("invalid token"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    Rejected(RejectReason),
}

impl AuthOutcome {
    pub fn is_authenticated(self) -> bool {
        matches!(self, AuthOutcome::Authenticated)
    }
}

/// Stateless verifier bound to the gateway's own secret.
///
/// Shared by every in-flight request; holds nothing mutable.
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    codec: TokenCodec,
}

impl RequestAuthenticator {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    fn extract_token(headers: &HeaderMap) -> Option<Token> {
        let raw = headers.get(TOKEN_HEADER)?.to_str().ok()?;
        Token::parse(raw).ok()
    }

    fn missing_token() -> RejectReason {
        warn!(reason = "missing_token", "rejected request");
        RejectReason::MissingToken
    }

    fn outcome(verified: Result<bool, EncodingError>) -> AuthOutcome {
        match verified {
            Ok(true) => AuthOutcome::Authenticated,
            Ok(false) => {
                warn!(reason = "invalid_token", "rejected request");
                AuthOutcome::Rejected(RejectReason::InvalidToken)
            }
            Err(e) => {
                error!(error = %e, "request payload could not be canonicalised");
                AuthOutcome::Rejected(RejectReason::InvalidToken)
            }
        }
    }

    /// Check the `Token` header against `payload`.
    pub fn authenticate(&self, headers: &HeaderMap, payload: &RequestPayload) -> AuthOutcome {
        let Some(token) = Self::extract_token(headers) else {
            return AuthOutcome::Rejected(Self::missing_token());
        };

        Self::outcome(match payload {
            RequestPayload::Body(body) => self.codec.verify(body, &token),
            RequestPayload::Liveness => self.codec.verify(&liveness_payload(), &token),
        })
    }

    /// Authenticate a request whose token covers its raw JSON body.
    ///
    /// Returns the parsed body on success. A body that is not JSON has no
    /// canonical form, so no token can match it.
    pub fn authenticate_json(&self, headers: &HeaderMap, body: &[u8]) -> Result<Value, RejectReason> {
        let token = Self::extract_token(headers).ok_or_else(Self::missing_token)?;

        let Ok(value) = serde_json::from_slice::<Value>(body) else {
            warn!(reason = "invalid_token", "rejected request: body is not JSON");
            return Err(RejectReason::InvalidToken);
        };

        match Self::outcome(self.codec.verify(&value, &token)) {
            AuthOutcome::Authenticated => Ok(value),
            AuthOutcome::Rejected(reason) => Err(reason),
        }
    }
}
