/// Default number of decimal places kept when rounding floats for display.
pub const DEFAULT_FLOAT_PRECISION: u32 = 3;

/// Default maximum nesting depth of a decoded payload.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Controls payload decoding behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Decimal places kept by [`PayloadDecoder::decode_rounded`](crate::PayloadDecoder::decode_rounded).
    pub float_precision: u32,
    /// Payloads nested deeper than this are rejected.
    pub max_depth: usize,
    /// When false, bytes after the first MessagePack value are an error.
    pub allow_trailing_bytes: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            float_precision: DEFAULT_FLOAT_PRECISION,
            max_depth: DEFAULT_MAX_DEPTH,
            allow_trailing_bytes: false,
        }
    }
}
