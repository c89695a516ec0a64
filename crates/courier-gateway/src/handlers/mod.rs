//! Request handlers for the gateway HTTP surface

pub mod health;
pub mod msg;

pub use health::health_router;
pub use msg::msg_router;
