//! Queue entity: declaration, bindings, subscriptions and delivery
//! reassembly
//!
//! A queue lives on its own channel. The [`QueueEntity`] state machine
//! tracks the declared flag and the active consumer tag, defers
//! declares and bindings issued while the channel is closed, and
//! reassembles deliveries from content frames. Applications drive it
//! through the [`Queue`] handle and watch the [`QueueEvent`] stream.

use tokio::sync::{mpsc, oneshot};

use crate::channel::{ChannelEvent, ChannelLink};
use crate::engine::EntityEngine;
use crate::error::Error;
use crate::message::Message;
use leporid_types::method::{basic, queue};

mod assembly;
mod entity;

pub use entity::QueueEntity;

/// Notifications a queue raises to the owning application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// The broker confirmed the queue as declared
    Declared,

    /// The broker deleted or purged the queue
    Removed,

    /// A binding was added (`true`) or removed (`false`)
    Bound(bool),

    /// A fetch found the queue empty
    Empty,

    /// A delivery has been fully received and can be taken with
    /// [`Queue::get_message`]
    MessageReceived,
}

/// Requests sent from a [`Queue`] handle to its entity
#[derive(Debug)]
pub enum QueueControl {
    /// Declare the queue under a (possibly empty) name
    Declare {
        /// Queue name; empty asks the broker to generate one
        name: String,
        /// Declare options
        options: queue::DeclareOptions,
    },

    /// Delete the queue
    Remove {
        /// Delete options
        options: queue::DeleteOptions,
    },

    /// Drop all messages held by the queue
    Purge,

    /// Bind the queue to an exchange
    Bind {
        /// Source exchange name
        exchange: String,
        /// Binding routing key
        routing_key: String,
    },

    /// Remove a binding
    Unbind {
        /// Source exchange name
        exchange: String,
        /// Binding routing key
        routing_key: String,
    },

    /// Start a subscription
    Consume {
        /// Consume options
        options: basic::ConsumeOptions,
    },

    /// Preset the consumer tag sent with the next consume
    SetConsumerTag(String),

    /// Set the no-ack flag carried by fetches
    SetNoAck(bool),

    /// Fetch a single message
    Get,

    /// Acknowledge one delivery
    Ack {
        /// Tag of the delivery to acknowledge
        delivery_tag: u64,
    },

    /// Dequeue the oldest fully received message, if any
    GetMessage {
        /// Receives the dequeued message
        responder: oneshot::Sender<Option<Message>>,
    },
}

/// Application handle to a queue entity.
///
/// All requests are fire-and-forget: they enqueue work for the entity's
/// engine task and return immediately, with outcomes reported on the
/// [`QueueEvent`] stream. The only error a handle can return is
/// [`Error::EngineStopped`].
#[derive(Debug)]
pub struct Queue {
    control: mpsc::UnboundedSender<QueueControl>,
}

impl Queue {
    /// Creates a queue entity on `link` together with its handle.
    ///
    /// Returns the handle, the event stream, and the engine that must
    /// be [`spawn`](EntityEngine::spawn)ed to drive the entity.
    /// `lifecycle` carries the channel open/close notifications and
    /// inbound frames from the transport layer.
    pub fn new(
        name: impl Into<String>,
        link: ChannelLink,
        lifecycle: mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> (
        Queue,
        mpsc::UnboundedReceiver<QueueEvent>,
        EntityEngine<QueueEntity>,
    ) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let entity = QueueEntity::new(name, link, event_tx);
        let engine = EntityEngine::new(entity, lifecycle, control_rx);
        (
            Queue {
                control: control_tx,
            },
            event_rx,
            engine,
        )
    }

    fn send(&self, control: QueueControl) -> Result<(), Error> {
        self.control
            .send(control)
            .map_err(|_| Error::EngineStopped)
    }

    /// Declares the queue as `name` with `options`
    pub fn declare(
        &self,
        name: impl Into<String>,
        options: queue::DeclareOptions,
    ) -> Result<(), Error> {
        self.send(QueueControl::Declare {
            name: name.into(),
            options,
        })
    }

    /// Deletes the queue
    pub fn remove(&self, options: queue::DeleteOptions) -> Result<(), Error> {
        self.send(QueueControl::Remove { options })
    }

    /// Drops all messages held by the queue
    pub fn purge(&self) -> Result<(), Error> {
        self.send(QueueControl::Purge)
    }

    /// Binds the queue to `exchange` under `routing_key`
    pub fn bind(
        &self,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Result<(), Error> {
        self.send(QueueControl::Bind {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        })
    }

    /// Removes the binding to `exchange` under `routing_key`
    pub fn unbind(
        &self,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Result<(), Error> {
        self.send(QueueControl::Unbind {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        })
    }

    /// Starts a subscription; deliveries are announced on the event
    /// stream as [`QueueEvent::MessageReceived`]
    pub fn consume(&self, options: basic::ConsumeOptions) -> Result<(), Error> {
        self.send(QueueControl::Consume { options })
    }

    /// Presets the consumer tag sent with the next
    /// [`consume`](Self::consume)
    pub fn set_consumer_tag(&self, consumer_tag: impl Into<String>) -> Result<(), Error> {
        self.send(QueueControl::SetConsumerTag(consumer_tag.into()))
    }

    /// Sets the no-ack flag carried by [`get`](Self::get)
    pub fn set_no_ack(&self, no_ack: bool) -> Result<(), Error> {
        self.send(QueueControl::SetNoAck(no_ack))
    }

    /// Fetches a single message; the broker answers with either a
    /// delivery or [`QueueEvent::Empty`]
    pub fn get(&self) -> Result<(), Error> {
        self.send(QueueControl::Get)
    }

    /// Acknowledges `message`
    pub fn ack(&self, message: &Message) -> Result<(), Error> {
        self.send(QueueControl::Ack {
            delivery_tag: message.delivery_tag,
        })
    }

    /// Dequeues the oldest fully received message.
    ///
    /// Returns `None` when nothing has been fully received yet;
    /// partially reassembled deliveries are never handed out here.
    pub async fn get_message(&self) -> Result<Option<Message>, Error> {
        let (responder, response) = oneshot::channel();
        self.send(QueueControl::GetMessage { responder })?;
        response.await.map_err(|_| Error::EngineStopped)
    }
}
