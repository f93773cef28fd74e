//! The protocol state machine trait shared by queues and exchanges

use leporid_types::method::Method;

use crate::frames::ContentHeader;
use crate::Payload;

/// A channel-scoped protocol state machine.
///
/// Handlers are synchronous and infallible: broker errors surface as
/// events on the entity's notification stream and local misuse is
/// logged and dropped, so there is nothing for a handler to return.
/// [`EntityEngine`](crate::engine::EntityEngine) invokes every handler
/// from a single task in frame arrival order, which is what the
/// header-follows-method and body-follows-header invariants rely on.
pub trait Entity {
    /// Handle-originated requests delivered through the engine's
    /// control channel
    type Control;

    /// The channel finished its open handshake
    fn on_channel_opened(&mut self);

    /// The channel closed
    fn on_channel_closed(&mut self);

    /// A method frame arrived on the entity's channel
    fn on_method(&mut self, method: Method);

    /// A content header frame arrived
    fn on_header(&mut self, header: ContentHeader);

    /// A content body frame arrived
    fn on_body(&mut self, body: Payload);

    /// A request arrived from the entity's handle
    fn handle_control(&mut self, control: Self::Control);
}
