use serde_json::Value as JsonValue;

use super::state_dump::StateDump;
use crate::error::{LinkError, Result};

/// A record fetched from the key/value mirror.
///
/// The currency travels out-of-band: `dump.currency` is always `None` and
/// whatever the uploader carried is reported in `currency`. `raw` keeps the
/// fetched object (minus `currency`) so callers can overlay only the keys the
/// uploader actually sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSnapshot {
    pub dump: StateDump,
    pub currency: Option<String>,
    pub raw: JsonValue,
}

impl RemoteSnapshot {
    /// Split a decoded record into the page record and its currency.
    pub fn from_dump(mut dump: StateDump) -> Self {
        let currency = dump.currency.take();
        let raw = serde_json::to_value(&dump).unwrap_or(JsonValue::Null);
        Self {
            dump,
            currency,
            raw,
        }
    }

    /// Decode a fetched JSON record.
    pub fn from_json(mut value: JsonValue) -> Result<Self> {
        let object = value.as_object_mut().ok_or_else(|| {
            LinkError::SerializationError("remote record must be a JSON object".to_string())
        })?;
        let currency = match object.remove("currency") {
            Some(JsonValue::String(code)) if !code.is_empty() => Some(code),
            _ => None,
        };

        let dump: StateDump = serde_json::from_value(value.clone())?;
        Ok(Self {
            dump,
            currency,
            raw: value,
        })
    }

    /// Path the uploader embedded in the record, if it sent one.
    pub fn embedded_path(&self) -> Option<&str> {
        self.raw.get("path").and_then(JsonValue::as_str)
    }
}
