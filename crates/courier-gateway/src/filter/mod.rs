//! Request filters applied before any business logic.

mod auth;

pub use auth::{AuthOutcome, RejectReason, RequestAuthenticator, RequestPayload};
