//! Reassembly of deliveries from method, header and body frames

use std::collections::VecDeque;

use bytes::BytesMut;
use tracing::warn;

use crate::frames::ContentHeader;
use crate::message::Message;
use crate::Payload;

/// One in-flight delivery.
///
/// `remaining` is `None` until the content header arrives; a delivery
/// is complete only once the header has been seen and the announced
/// body size has been fully received.
#[derive(Debug)]
struct PendingDelivery {
    message: Message,
    buffer: BytesMut,
    remaining: Option<u64>,
}

impl PendingDelivery {
    fn is_complete(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Reassembles deliveries announced by `Deliver` or `GetOk` from the
/// content frames that follow them.
///
/// Content frames always apply to the most recently started delivery:
/// AMQP 0-9-1 forbids interleaving content on one channel, so the
/// newest delivery is the only one that can still be receiving frames.
/// Completed deliveries stay queued in arrival order until taken.
#[derive(Debug, Default)]
pub(crate) struct DeliveryAssembler {
    pending: VecDeque<PendingDelivery>,
}

impl DeliveryAssembler {
    /// Starts reassembling a new delivery from its method frame fields
    pub(crate) fn begin(&mut self, message: Message) {
        self.pending.push_back(PendingDelivery {
            message,
            buffer: BytesMut::new(),
            remaining: None,
        });
    }

    /// Applies a content header to the newest delivery
    pub(crate) fn apply_header(&mut self, header: ContentHeader) {
        let Some(delivery) = self.pending.back_mut() else {
            warn!("content header arrived with no delivery pending");
            return;
        };
        delivery.remaining = Some(header.body_size);
        delivery.message.properties = header.properties;
    }

    /// Appends body bytes to the newest delivery.
    ///
    /// Returns true when this chunk completed the delivery *and* it is
    /// the only one pending — the sole condition under which a message
    /// notification is raised.
    pub(crate) fn apply_body(&mut self, chunk: Payload) -> bool {
        let Some(delivery) = self.pending.back_mut() else {
            warn!("content body arrived with no delivery pending");
            return false;
        };
        match delivery.remaining {
            Some(remaining) => {
                delivery.remaining = Some(remaining.saturating_sub(chunk.len() as u64));
            }
            None => warn!("content body arrived before the content header"),
        }
        delivery.buffer.extend_from_slice(&chunk);

        delivery.is_complete() && self.pending.len() == 1
    }

    /// Whether the oldest delivery has been fully received
    pub(crate) fn has_message(&self) -> bool {
        self.pending
            .front()
            .is_some_and(PendingDelivery::is_complete)
    }

    /// Dequeues the oldest delivery whether or not it is complete
    pub(crate) fn take_message(&mut self) -> Option<Message> {
        self.pending.pop_front().map(|delivery| {
            let PendingDelivery {
                mut message,
                buffer,
                ..
            } = delivery;
            message.payload = buffer.freeze();
            message
        })
    }

    /// Drops every delivery still waiting for frames, keeping completed
    /// ones for the application to take. Returns how many were dropped.
    pub(crate) fn discard_incomplete(&mut self) -> usize {
        let before = self.pending.len();
        self.pending.retain(PendingDelivery::is_complete);
        before - self.pending.len()
    }
}
