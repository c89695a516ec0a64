//! Inbound chat messages and the payloads derived from them.
//!
//! [`InboundMessage::validate`] is a flat presence/type check over the JSON
//! body of `POST /msg`. It reports every offending field at once, keyed by
//! field name, so callers get a complete error map in a single round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const MISSING_FIELD: &str = "Missing data for required field.";
pub const UNKNOWN_FIELD: &str = "Unknown field.";
pub const INVALID_INPUT: &str = "Invalid input type.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_AN_INTEGER: &str = "Not a valid integer.";
pub const NOT_A_BOOLEAN: &str = "Not a valid boolean.";
pub const NOT_A_NUMBER: &str = "Not a valid number.";

/// Key used when the body as a whole is unacceptable.
pub const SCHEMA_KEY: &str = "_schema";

/// The only conversation type the gateway forwards.
pub const PRIVATE_CHAT: &str = "private";

// ─────────────────────────────────────────────────────────────────────────────
// Validation errors
// ─────────────────────────────────────────────────────────────────────────────

/// Field name → list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid message body:")?;
        for (field, messages) in &self.0 {
            write!(f, " {field}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ─────────────────────────────────────────────────────────────────────────────
// InboundMessage
// ─────────────────────────────────────────────────────────────────────────────

/// A schema-valid message posted to `/msg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub text: String,
    pub telegram_user_id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub chat_id: i64,
    pub chat_type: String,
    pub date: f64,
}

#[derive(Clone, Copy)]
enum FieldKind {
    Str,
    Int,
    Bool,
    Float,
}

const FIELDS: &[(&str, FieldKind)] = &[
    ("text", FieldKind::Str),
    ("telegram_user_id", FieldKind::Int),
    ("is_bot", FieldKind::Bool),
    ("first_name", FieldKind::Str),
    ("last_name", FieldKind::Str),
    ("username", FieldKind::Str),
    ("chat_id", FieldKind::Int),
    ("chat_type", FieldKind::Str),
    ("date", FieldKind::Float),
];

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    // `i64::MAX as f64` rounds up to 2^63, so the upper bound must be strict.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < 9_223_372_036_854_775_808.0 {
        Some(f as i64)
    } else {
        None
    }
}

fn check(kind: FieldKind, value: &Value) -> Result<(), &'static str> {
    let ok = match kind {
        FieldKind::Str => value.is_string(),
        FieldKind::Int => as_integer(value).is_some(),
        FieldKind::Bool => value.is_boolean(),
        FieldKind::Float => value.is_number(),
    };
    if ok {
        return Ok(());
    }
    Err(match kind {
        FieldKind::Str => NOT_A_STRING,
        FieldKind::Int => NOT_AN_INTEGER,
        FieldKind::Bool => NOT_A_BOOLEAN,
        FieldKind::Float => NOT_A_NUMBER,
    })
}

fn string_field(body: &Map<String, Value>, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl InboundMessage {
    /// Check every required field for presence and type; reject unknown
    /// fields.
    pub fn validate(body: &Value) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let Some(object) = body.as_object() else {
            errors.add(SCHEMA_KEY, INVALID_INPUT);
            return Err(errors);
        };

        for (name, kind) in FIELDS {
            match object.get(*name) {
                None => errors.add(*name, MISSING_FIELD),
                Some(value) => {
                    if let Err(message) = check(*kind, value) {
                        errors.add(*name, message);
                    }
                }
            }
        }

        for key in object.keys() {
            if !FIELDS.iter().any(|(name, _)| *name == key.as_str()) {
                errors.add(key.clone(), UNKNOWN_FIELD);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            text: string_field(object, "text"),
            telegram_user_id: object.get("telegram_user_id").and_then(as_integer).unwrap_or_default(),
            is_bot: object.get("is_bot").and_then(Value::as_bool).unwrap_or_default(),
            first_name: string_field(object, "first_name"),
            last_name: string_field(object, "last_name"),
            username: string_field(object, "username"),
            chat_id: object.get("chat_id").and_then(as_integer).unwrap_or_default(),
            chat_type: string_field(object, "chat_type"),
            date: object.get("date").and_then(Value::as_f64).unwrap_or_default(),
        })
    }

    pub fn is_private(&self) -> bool {
        self.chat_type == PRIVATE_CHAT
    }

    /// The subset of fields sent on to the dialog service.
    pub fn forward_payload(&self) -> ForwardPayload {
        ForwardPayload {
            text: self.text.clone(),
            telegram_user_id: self.telegram_user_id,
            chat_id: self.chat_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Forwarding
// ─────────────────────────────────────────────────────────────────────────────

/// Body posted to the dialog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardPayload {
    pub text: String,
    pub telegram_user_id: i64,
    pub chat_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

/// Destination endpoint on the dialog service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwardEndpoint {
    /// The text is an activation code: register the user.
    Registration,
    /// Ordinary chat message.
    Message,
}

impl ForwardEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            ForwardEndpoint::Registration => "/user",
            ForwardEndpoint::Message => "/message",
        }
    }
}

impl fmt::Display for ForwardEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decline replies
// ─────────────────────────────────────────────────────────────────────────────

pub const BOT_DECLINE: &str = "Unfortunately I'm not allowed to chat with bots!";
pub const NON_PRIVATE_DECLINE: &str = "Unfortunately I work only in private chats!";

/// Why a message was answered locally instead of forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    Bot,
    NonPrivateChat,
}

impl DeclineReason {
    pub fn text(self) -> &'static str {
        match self {
            DeclineReason::Bot => BOT_DECLINE,
            DeclineReason::NonPrivateChat => NON_PRIVATE_DECLINE,
        }
    }
}

/// Reply body returned to the caller for a declined message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclineReply {
    pub text: String,
    pub chat_id: i64,
}

impl DeclineReply {
    pub fn new(reason: DeclineReason, chat_id: i64) -> Self {
        Self {
            text: reason.text().to_string(),
            chat_id,
        }
    }
}
