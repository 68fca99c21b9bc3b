use std::io::Cursor;

use diagmux_frame::Event;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::DecoderConfig;
use crate::error::{PayloadError, Result};
use crate::value::DiagValue;

/// Decodes MessagePack diagnostic payloads.
#[derive(Debug, Clone, Default)]
pub struct PayloadDecoder {
    config: DecoderConfig,
}

impl PayloadDecoder {
    /// Create a decoder with default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with explicit config.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a payload into a tagged value, unrounded.
    pub fn decode(&self, payload: &[u8]) -> Result<DiagValue> {
        let mut cursor = Cursor::new(payload);
        let value = {
            let mut de = rmp_serde::Deserializer::new(&mut cursor);
            DiagValue::deserialize(&mut de)?
        };

        let consumed = cursor.position() as usize;
        if consumed < payload.len() && !self.config.allow_trailing_bytes {
            return Err(PayloadError::TrailingBytes {
                extra: payload.len() - consumed,
                total: payload.len(),
            });
        }

        let depth = value.depth();
        if depth > self.config.max_depth {
            return Err(PayloadError::TooDeep {
                depth,
                max: self.config.max_depth,
            });
        }

        Ok(value)
    }

    /// Decode a payload and round its floats to the configured precision.
    pub fn decode_rounded(&self, payload: &[u8]) -> Result<DiagValue> {
        Ok(self.decode(payload)?.round_floats(self.config.float_precision))
    }

    /// Decode a diagnostic frame event; `None` for log lines.
    pub fn decode_event(&self, event: &Event) -> Option<Result<DiagValue>> {
        let payload = event.as_frame()?;
        let result = self.decode_rounded(payload);
        if let Err(err) = &result {
            tracing::debug!(size = payload.len(), error = %err, "diagnostic payload rejected");
        }
        Some(result)
    }

    /// Decode a payload straight into a typed structure.
    pub fn decode_as<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(payload)?)
    }

    /// Encode a value as a MessagePack payload.
    ///
    /// Structs are written as maps with field names, matching what
    /// [`decode`](Self::decode) turns into a [`DiagValue::Mapping`].
    pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Encode a JSON document as a MessagePack payload.
    pub fn encode_json(json: &str) -> Result<Vec<u8>> {
        let value: DiagValue = serde_json::from_str(json)?;
        Self::encode(&value)
    }
}
