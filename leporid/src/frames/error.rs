/// Error encoding or decoding a frame
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error from the underlying transport
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error from the field codec
    #[error(transparent)]
    Codec(#[from] leporid_types::codec::Error),

    /// Frame type octet is not a method, header, body or heartbeat frame
    #[error("invalid frame type {0:#04x}")]
    InvalidFrameType(u8),

    /// The octet after the payload is not the 0xCE frame-end sentinel
    #[error("missing frame end octet")]
    MissingFrameEnd,

    /// An inbound frame is larger than the negotiated maximum
    #[error("frame size {size} exceeds the maximum of {max}")]
    FrameTooLarge {
        /// Total frame size announced on the wire
        size: usize,
        /// Negotiated maximum frame size
        max: usize,
    },
}
