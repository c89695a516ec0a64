//! Message routing.
//!
//! Decides, per validated inbound message, whether to answer locally or to
//! forward to the dialog service, and on which endpoint.
//!
//! | Condition (first match wins) | Outcome |
//! |------------------------------|---------|
//! | sender is a bot | declined with the bot reply |
//! | chat is not private | declined with the private-only reply |
//! | text is an activation code | forwarded to `/user` |
//! | otherwise | forwarded to `/message` |

mod matcher;

pub use matcher::ActivationMatcher;

use courier_kernel::{
    DeclineReason, DeclineReply, DependentService, DialogForwarder, EncodingError,
    ForwardEndpoint, InboundMessage, TokenCodec, TransportError,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Answered locally; nothing was forwarded.
    Declined(DeclineReply),
    /// The dialog service answered with `status`.
    Forwarded { endpoint: ForwardEndpoint, status: u16 },
    /// The dialog service could not be reached.
    ForwardFailed {
        endpoint: ForwardEndpoint,
        error: TransportError,
    },
}

impl RouteOutcome {
    /// `true` unless a forward was attempted and did not get a 2xx answer.
    pub fn is_delivered(&self) -> bool {
        match self {
            RouteOutcome::Declined(_) => true,
            RouteOutcome::Forwarded { status, .. } => (200..300).contains(status),
            RouteOutcome::ForwardFailed { .. } => false,
        }
    }
}

/// Routes messages to the resolved dialog service.
///
/// Built once the gateway is `Ready`; immutable afterwards.
pub struct MessageRouter {
    dependent: DependentService,
    codec: TokenCodec,
    matcher: ActivationMatcher,
    forwarder: Arc<dyn DialogForwarder>,
}

impl MessageRouter {
    pub fn new(
        dependent: DependentService,
        matcher: ActivationMatcher,
        forwarder: Arc<dyn DialogForwarder>,
    ) -> Self {
        let codec = TokenCodec::new(dependent.secret.clone());
        Self {
            dependent,
            codec,
            matcher,
            forwarder,
        }
    }

    pub fn dependent(&self) -> &DependentService {
        &self.dependent
    }

    /// Classify `message` without side effects.
    pub fn classify(&self, message: &InboundMessage) -> Result<ForwardEndpoint, DeclineReason> {
        if message.is_bot {
            return Err(DeclineReason::Bot);
        }
        if !message.is_private() {
            return Err(DeclineReason::NonPrivateChat);
        }
        if self.matcher.is_activation(&message.text) {
            Ok(ForwardEndpoint::Registration)
        } else {
            Ok(ForwardEndpoint::Message)
        }
    }

    pub async fn route(&self, message: &InboundMessage) -> Result<RouteOutcome, EncodingError> {
        let endpoint = match self.classify(message) {
            Ok(endpoint) => endpoint,
            Err(reason) => {
                info!(chat_id = message.chat_id, reason = ?reason, "message declined");
                return Ok(RouteOutcome::Declined(DeclineReply::new(reason, message.chat_id)));
            }
        };

        let payload = message.forward_payload();
        let token = self.codec.encode(&payload)?;

        debug!(
            chat_id = message.chat_id,
            endpoint = %endpoint,
            target = %self.dependent.name,
            "forwarding message"
        );
        match self
            .forwarder
            .forward(&self.dependent, endpoint, &payload, &token)
            .await
        {
            Ok(status) => {
                if !(200..300).contains(&status) {
                    warn!(endpoint = %endpoint, status, "dialog service rejected message");
                }
                Ok(RouteOutcome::Forwarded { endpoint, status })
            }
            Err(error) => {
                warn!(endpoint = %endpoint, error = %error, "forwarding failed");
                Ok(RouteOutcome::ForwardFailed { endpoint, error })
            }
        }
    }
}
