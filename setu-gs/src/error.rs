//! Error types for setu-gs

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// setu-gs error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Frame length does not match the fixed wire size
    #[error("Bad frame length: expected {expected} bytes, got {actual}")]
    BadLength {
        /// Required length in bytes
        expected: usize,
        /// Length that was received
        actual: usize,
    },

    /// Trailing checksum does not match the additive sum of the frame
    #[error("Checksum mismatch: frame carries {received:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the frame
        received: u32,
        /// Checksum computed over the preceding bytes
        computed: u32,
    },

    /// Connect or receive did not complete within the caller's timeout
    #[error("Connection timed out")]
    Timeout,

    /// Peer actively refused the command connection
    #[error("Connection refused")]
    ConnectionRefused,

    /// Peer closed the connection before a full acknowledgment arrived
    #[error("Incomplete acknowledgment: received {received} of 12 bytes")]
    ShortAck {
        /// Bytes received before the peer closed
        received: usize,
    },

    /// Command type byte outside the known set
    #[error("Unknown command type: {0}")]
    UnknownCommandType(u8),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Command queue is at capacity
    #[error("Command queue full")]
    QueueFull,

    /// Worker or channel on the other side is gone
    #[error("Disconnected: {0}")]
    Disconnected(&'static str),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classify an I/O error raised on the command path.
    ///
    /// `WouldBlock` is what a socket read timeout surfaces as on Unix.
    pub fn from_transport(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Error::Timeout,
            std::io::ErrorKind::ConnectionRefused => Error::ConnectionRefused,
            _ => Error::Io(err),
        }
    }

    /// True for connect/receive timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
