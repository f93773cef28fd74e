//! Interface between entities and the channel lifecycle layer.
//!
//! The channel open/close handshake itself lives in the outer transport
//! layer. Entities see it through two narrow seams: [`ChannelEvent`]s
//! flowing in (open/close notifications and inbound frames) and
//! [`ChannelCommand`]s flowing out (frames to send, reopen requests).

use tokio::sync::mpsc;
use tracing::debug;

use crate::frames::FrameBody;
use leporid_types::method::Method;

/// Requests an entity sends up to the channel lifecycle layer
#[derive(Debug)]
pub enum ChannelCommand {
    /// Send a frame on the entity's channel
    SendFrame(FrameBody),

    /// Reopen the channel so a deferred operation can be replayed
    Reopen,
}

/// Channel lifecycle input for an entity event loop
#[derive(Debug)]
pub enum ChannelEvent {
    /// The channel finished its open handshake
    Opened,

    /// The channel closed, whether locally requested or forced by the
    /// broker
    Closed,

    /// A frame arrived addressed to this channel
    Frame(FrameBody),
}

/// An entity's view of the channel it lives on.
///
/// Holds the channel number, the negotiated frame size limit and the
/// command channel into the lifecycle layer, plus a cached open flag
/// that the entity maintains from [`ChannelEvent`] notifications.
#[derive(Debug)]
pub struct ChannelLink {
    id: u16,
    frame_max: usize,
    open: bool,
    commands: mpsc::UnboundedSender<ChannelCommand>,
}

impl ChannelLink {
    /// Creates a link sending commands on `commands`.
    ///
    /// The link starts closed; the lifecycle layer announces readiness
    /// with [`ChannelEvent::Opened`]. `frame_max` is the negotiated
    /// maximum frame size including the eight envelope octets, at least
    /// 4096 per the protocol.
    pub fn new(id: u16, frame_max: usize, commands: mpsc::UnboundedSender<ChannelCommand>) -> Self {
        Self {
            id,
            frame_max,
            open: false,
            commands,
        }
    }

    /// Channel number
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Negotiated maximum frame size
    pub fn frame_max(&self) -> usize {
        self.frame_max
    }

    /// Largest content chunk that fits in one body frame
    pub fn max_body_size(&self) -> usize {
        // 7 octets of envelope precede the payload; the end octet is
        // accounted separately by the codec.
        self.frame_max.saturating_sub(7)
    }

    /// Whether the channel is currently open
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub(crate) fn send_method(&self, method: Method) {
        self.send_frame(FrameBody::Method(method));
    }

    pub(crate) fn send_frame(&self, body: FrameBody) {
        if self.commands.send(ChannelCommand::SendFrame(body)).is_err() {
            debug!(channel = self.id, "lifecycle layer gone, frame discarded");
        }
    }

    pub(crate) fn request_reopen(&self) {
        if self.commands.send(ChannelCommand::Reopen).is_err() {
            debug!(
                channel = self.id,
                "lifecycle layer gone, reopen request discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_body_size() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let link = ChannelLink::new(1, 4096, tx);
        assert_eq!(link.max_body_size(), 4089);
    }

    #[test]
    fn test_send_after_lifecycle_drop_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = ChannelLink::new(1, 4096, tx);
        drop(rx);

        // Both sends must be infallible from the entity's point of view.
        link.send_frame(FrameBody::Heartbeat);
        link.request_reopen();
    }
}
