/// Errors raised at the I/O edges of the demultiplexer.
///
/// The [`Demultiplexer`](crate::Demultiplexer) itself never fails; these only
/// surface from readers, writers and producer-side encoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the encodable or configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A log line cannot be written without corrupting the stream framing.
    #[error("invalid log line: {0}")]
    InvalidLine(String),

    /// An I/O error occurred while reading or writing the stream.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink stopped accepting bytes mid-write.
    #[error("connection closed (incomplete write)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
