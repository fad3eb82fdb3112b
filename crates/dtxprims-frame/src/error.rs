/// Boxed error returned by the delegated auxiliary and payload decoders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while decoding, reassembling or encoding DTX messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The first four bytes are not the DTX magic (stream desynchronized).
    #[error("invalid message magic {found:#010x} (expected 0x795b3d1f)")]
    BadMagic { found: u32 },

    /// The declared frame header length is not 32.
    #[error("invalid header length {found} (expected 32)")]
    BadHeaderLength { found: u32 },

    /// A declared region extends past the end of the buffer.
    #[error("incomplete data ({needed} bytes needed, {available} available)")]
    IncompleteData { needed: usize, available: usize },

    /// The payload header describes an auxiliary or payload range that cannot exist.
    #[error("malformed {region} region [{start}, {end})")]
    MalformedRegion {
        region: &'static str,
        start: i64,
        end: i64,
    },

    /// The declared message body exceeds the configured maximum.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The auxiliary dictionary decoder rejected its input.
    #[error("auxiliary decode error: {0}")]
    Auxiliary(#[source] BoxError),

    /// The payload object-graph decoder rejected its input.
    #[error("payload decode error: {0}")]
    Payload(#[source] BoxError),

    /// A continuation fragment arrived without an open sequence for its identifier.
    #[error("fragment {index} for identifier {identifier} has no open sequence")]
    OrphanFragment { identifier: u32, index: u16 },

    /// A continuation fragment arrived out of order.
    #[error("fragment out of order for identifier {identifier} (expected index {expected}, found {found})")]
    FragmentOutOfOrder {
        identifier: u32,
        expected: u16,
        found: u16,
    },

    /// Too many fragmented messages are being reassembled at once.
    #[error("too many fragment sequences in flight (max {max})")]
    TooManySequences { max: usize },

    /// An I/O error occurred while reading or writing messages.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

impl FrameError {
    /// Returns true for errors that mean the byte stream lost frame alignment.
    ///
    /// Callers should drop the connection rather than try to skip a frame.
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            FrameError::BadMagic { .. } | FrameError::BadHeaderLength { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
