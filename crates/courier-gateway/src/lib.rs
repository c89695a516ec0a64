//! `courier-gateway` — Courier message gateway runtime.
//!
//! This crate provides the concrete implementations of the contracts defined
//! in `courier-kernel`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`RegistryTransport`](courier_kernel::RegistryTransport) | [`discovery::HttpRegistryTransport`] |
//! | [`DialogForwarder`](courier_kernel::DialogForwarder) | [`backend::HttpDialogForwarder`] |
//!
//! On top of those it runs the registration/discovery startup sequence
//! ([`discovery::RegistryClient`]), the heartbeat loop
//! ([`discovery::HeartbeatLoop`]), and the axum server
//! ([`server::GatewayServer`]) that authenticates and routes `/msg` calls.
//! [`bootstrap::run`] wires them together in startup order.

pub mod backend;
pub mod bootstrap;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use courier_kernel as kernel;
