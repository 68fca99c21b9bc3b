/// Errors that can occur while decoding or encoding payloads.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The payload is not valid MessagePack.
    #[error("payload is not valid MessagePack: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A value could not be encoded as MessagePack.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// A value could not be converted to or from JSON.
    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload nests deeper than the configured limit.
    #[error("payload nesting too deep ({depth} levels, max {max})")]
    TooDeep { depth: usize, max: usize },

    /// Bytes remain after the first MessagePack value.
    #[error("{extra} trailing byte(s) after MessagePack value ({total} bytes total)")]
    TrailingBytes { extra: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, PayloadError>;
