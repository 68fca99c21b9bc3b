//! Decoding of diagnostic frame payloads.
//!
//! Frames delimited by `diagmux-frame` carry MessagePack documents. This
//! crate turns them into a recursive [`DiagValue`] and applies the display
//! normalization (fixed float precision) used by presentation sinks.
//!
//! Decoding is independent of framing: a payload that fails to decode is
//! simply dropped by the caller, the stream keeps flowing.

pub mod config;
pub mod decoder;
pub mod error;
pub mod value;

pub use config::DecoderConfig;
pub use decoder::PayloadDecoder;
pub use error::{PayloadError, Result};
pub use value::{round_to, DiagValue};
