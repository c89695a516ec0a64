//! Courier Testing Framework
//!
//! Doubles for the gateway's outbound seams and time source, so the
//! registration lifecycle, heartbeat loop and message routing can be tested
//! without a live registry or dialog service.
//!
//! | Double | Stands in for |
//! |--------|---------------|
//! | [`ScriptedRegistry`] | `RegistryTransport`, with scripted failures |
//! | [`RecordingForwarder`] | `DialogForwarder` |
//! | [`RecordingClock`] | `Clock`; records waits, returns immediately |
//! | [`MockRegistryServer`] / [`MockDialogServer`] | real HTTP peers on an ephemeral port |

pub mod clock;
pub mod forwarder;
pub mod registry;
pub mod server;

pub use clock::RecordingClock;
pub use forwarder::{ForwardCall, RecordingForwarder};
pub use registry::ScriptedRegistry;
pub use server::{MockDialogServer, MockRegistryServer, RecordedRequest};

use serde_json::{Value, json};

/// A schema-valid `/msg` body from a private, human sender.
pub fn sample_message(text: &str) -> Value {
    json!({
        "text": text,
        "telegram_user_id": 1001,
        "is_bot": false,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "username": "ada",
        "chat_id": 555,
        "chat_type": "private",
        "date": 1_700_000_000.0
    })
}

#[macro_export]
macro_rules! assert_forwarded {
    ($forwarder:expr, $endpoint:expr, $expected_count:expr) => {
        let count = $forwarder
            .calls()
            .iter()
            .filter(|call| call.endpoint == $endpoint)
            .count();
        assert_eq!(
            count, $expected_count,
            "Expected {} forwards to '{}', but saw {}",
            $expected_count, $endpoint, count
        );
    };
}
