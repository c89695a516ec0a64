//! `courier-kernel` — contracts and data types for the Courier message gateway.
//!
//! Nothing in this crate performs network I/O. It defines:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`token`] | [`TokenCodec`](token::TokenCodec): HMAC-SHA256 tokens over canonical JSON |
//! | [`service`] | self-record, discovery directory, [`DependentService`](service::DependentService), [`RegistrationState`](service::RegistrationState) |
//! | [`message`] | inbound message schema check, forward payload, decline replies |
//! | [`transport`] | [`RegistryTransport`](transport::RegistryTransport) and [`DialogForwarder`](transport::DialogForwarder) traits |
//! | [`clock`] | injectable [`Clock`](clock::Clock) for the polling loops |
//! | [`config`] | multi-format configuration loader and [`GatewayConfig`](config::GatewayConfig) |
//!
//! Runtime implementations (reqwest transports, the axum server, the registry
//! lifecycle and heartbeat loop) live in `courier-gateway`.

pub mod clock;
pub mod config;
pub mod message;
pub mod service;
pub mod token;
pub mod transport;

pub use clock::{Clock, TokioClock};
pub use message::{
    DeclineReason, DeclineReply, ForwardEndpoint, ForwardPayload, InboundMessage,
    ValidationErrors,
};
pub use service::{
    DependentService, DirectoryError, RegistrationState, ServiceRecord, ServicesDirectory,
    ServicesQuery, StateError,
};
pub use token::{EncodingError, LivenessPayload, Secret, Token, TokenCodec, TokenParseError};
pub use transport::{DialogForwarder, RegistryTransport, TransportError};
