//! Split serial streams into text logs and diagnostic frames.
//!
//! diagmux reads the byte stream of a device that interleaves plain log
//! lines with MessagePack diagnostic records, and hands each kind to its own
//! consumer.
//!
//! # Crate Structure
//!
//! - [`frame`] — Incremental demultiplexer, stream reader/writer
//! - [`payload`] — MessagePack payload decoding (behind `payload` feature)

/// Re-export frame types.
pub mod frame {
    pub use diagmux_frame::*;
}

/// Re-export payload types (requires `payload` feature).
#[cfg(feature = "payload")]
pub mod payload {
    pub use diagmux_payload::*;
}
