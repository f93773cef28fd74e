//! The message type handed to applications by a queue

use leporid_types::BasicProperties;

use crate::Payload;

/// A delivery reassembled from one method frame, one content header and
/// zero or more content body frames.
///
/// A message dequeued before its final body frame arrived carries the
/// bytes received so far; check
/// [`QueueEntity::has_message`](crate::queue::QueueEntity::has_message)
/// before dequeuing directly from an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Server-assigned delivery tag, used to acknowledge the message
    pub delivery_tag: u64,

    /// True if the broker may have delivered this message before
    pub redelivered: bool,

    /// Exchange the message was originally published to
    pub exchange: String,

    /// Routing key the message was published with
    pub routing_key: String,

    /// Content properties from the header frame
    pub properties: BasicProperties,

    /// Reassembled body bytes
    pub payload: Payload,
}
