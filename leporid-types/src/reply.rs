//! Reply codes carried by basic.return and the close methods.

/// A reply code from the AMQP 0-9-1 constant table, including the
/// RabbitMQ-defined no-route code.
///
/// Codes in the 300 range are soft errors scoped to the offending request;
/// 400s and 500s are hard errors that close the channel or connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    /// 200: the request completed normally
    ReplySuccess,
    /// 311: the message payload exceeds a server limit
    ContentTooLarge,
    /// 312: a mandatory message could not be routed to any queue
    NoRoute,
    /// 313: an immediate message had no ready consumer
    NoConsumers,
    /// 320: the connection is being closed by operator action
    ConnectionForced,
    /// 402: the virtual host path was malformed
    InvalidPath,
    /// 403: the client lacks permission for the resource
    AccessRefused,
    /// 404: the named entity does not exist
    NotFound,
    /// 405: the resource is locked by another client
    ResourceLocked,
    /// 406: a precondition on the request failed
    PreconditionFailed,
    /// 501: a malformed frame was received
    FrameError,
    /// 502: a frame contained illegal values
    SyntaxError,
    /// 503: a method was invalid for the channel state
    CommandInvalid,
    /// 504: a method referred to a channel in an unusable state
    ChannelError,
    /// 505: a content frame arrived when a method was expected
    UnexpectedFrame,
    /// 506: the server ran out of a resource
    ResourceError,
    /// 530: the request violates a server policy
    NotAllowed,
    /// 540: the method is not implemented by the server
    NotImplemented,
    /// 541: the server experienced an internal fault
    InternalError,
    /// Any code outside the known constant table
    Other(u16),
}

impl ReplyCode {
    /// The numeric code as carried on the wire.
    pub fn as_u16(self) -> u16 {
        match self {
            ReplyCode::ReplySuccess => 200,
            ReplyCode::ContentTooLarge => 311,
            ReplyCode::NoRoute => 312,
            ReplyCode::NoConsumers => 313,
            ReplyCode::ConnectionForced => 320,
            ReplyCode::InvalidPath => 402,
            ReplyCode::AccessRefused => 403,
            ReplyCode::NotFound => 404,
            ReplyCode::ResourceLocked => 405,
            ReplyCode::PreconditionFailed => 406,
            ReplyCode::FrameError => 501,
            ReplyCode::SyntaxError => 502,
            ReplyCode::CommandInvalid => 503,
            ReplyCode::ChannelError => 504,
            ReplyCode::UnexpectedFrame => 505,
            ReplyCode::ResourceError => 506,
            ReplyCode::NotAllowed => 530,
            ReplyCode::NotImplemented => 540,
            ReplyCode::InternalError => 541,
            ReplyCode::Other(code) => code,
        }
    }

    /// True for every code other than success.
    pub fn is_error(self) -> bool {
        !matches!(self, ReplyCode::ReplySuccess)
    }

    /// True for soft errors, which fail the request without closing the
    /// channel.
    pub fn is_soft_error(self) -> bool {
        matches!(self.as_u16(), 300..=399)
    }
}

impl From<u16> for ReplyCode {
    fn from(code: u16) -> Self {
        match code {
            200 => ReplyCode::ReplySuccess,
            311 => ReplyCode::ContentTooLarge,
            312 => ReplyCode::NoRoute,
            313 => ReplyCode::NoConsumers,
            320 => ReplyCode::ConnectionForced,
            402 => ReplyCode::InvalidPath,
            403 => ReplyCode::AccessRefused,
            404 => ReplyCode::NotFound,
            405 => ReplyCode::ResourceLocked,
            406 => ReplyCode::PreconditionFailed,
            501 => ReplyCode::FrameError,
            502 => ReplyCode::SyntaxError,
            503 => ReplyCode::CommandInvalid,
            504 => ReplyCode::ChannelError,
            505 => ReplyCode::UnexpectedFrame,
            506 => ReplyCode::ResourceError,
            530 => ReplyCode::NotAllowed,
            540 => ReplyCode::NotImplemented,
            541 => ReplyCode::InternalError,
            other => ReplyCode::Other(other),
        }
    }
}

impl From<ReplyCode> for u16 {
    fn from(code: ReplyCode) -> Self {
        code.as_u16()
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReplyCode::ReplySuccess => "REPLY_SUCCESS",
            ReplyCode::ContentTooLarge => "CONTENT_TOO_LARGE",
            ReplyCode::NoRoute => "NO_ROUTE",
            ReplyCode::NoConsumers => "NO_CONSUMERS",
            ReplyCode::ConnectionForced => "CONNECTION_FORCED",
            ReplyCode::InvalidPath => "INVALID_PATH",
            ReplyCode::AccessRefused => "ACCESS_REFUSED",
            ReplyCode::NotFound => "NOT_FOUND",
            ReplyCode::ResourceLocked => "RESOURCE_LOCKED",
            ReplyCode::PreconditionFailed => "PRECONDITION_FAILED",
            ReplyCode::FrameError => "FRAME_ERROR",
            ReplyCode::SyntaxError => "SYNTAX_ERROR",
            ReplyCode::CommandInvalid => "COMMAND_INVALID",
            ReplyCode::ChannelError => "CHANNEL_ERROR",
            ReplyCode::UnexpectedFrame => "UNEXPECTED_FRAME",
            ReplyCode::ResourceError => "RESOURCE_ERROR",
            ReplyCode::NotAllowed => "NOT_ALLOWED",
            ReplyCode::NotImplemented => "NOT_IMPLEMENTED",
            ReplyCode::InternalError => "INTERNAL_ERROR",
            ReplyCode::Other(code) => return write!(f, "{}", code),
        };
        write!(f, "{} ({})", name, self.as_u16())
    }
}
