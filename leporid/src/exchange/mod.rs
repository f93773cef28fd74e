//! Exchange entity: declaration lifecycle, publishing, and publisher
//! confirms.
//!
//! An exchange is represented by three cooperating pieces:
//!
//! - [`ExchangeEntity`], the protocol state machine,
//! - an [`EntityEngine`] task that feeds it channel events and control
//!   requests,
//! - an [`Exchange`] handle the application talks to.
//!
//! The entity sends protocol frames through its [`ChannelLink`] and
//! reports outcomes on an [`ExchangeEvent`] stream. When the channel is
//! closed, declare and remove requests are remembered and replayed once
//! the channel reopens.

mod confirm;
mod entity;

pub use entity::{ExchangeEntity, ExchangeState};

use std::time::Duration;

use leporid_types::method::{basic, exchange};
use leporid_types::{BasicProperties, FieldTable, ReplyCode};
use tokio::sync::{mpsc, watch};

use crate::channel::{ChannelEvent, ChannelLink};
use crate::engine::EntityEngine;
use crate::error::Error;
use crate::Payload;

/// The exchange types defined by AMQP 0-9-1, plus an escape hatch for
/// broker extensions such as `"x-delayed-message"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Routes on an exact routing key match
    Direct,
    /// Routes to every bound queue, ignoring the routing key
    Fanout,
    /// Routes on dotted routing key patterns
    Topic,
    /// Routes on header table matches
    Headers,
    /// A broker-specific exchange type
    Custom(String),
}

impl ExchangeKind {
    /// The type string carried by exchange.declare.
    pub fn as_str(&self) -> &str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Topic => "topic",
            ExchangeKind::Headers => "headers",
            ExchangeKind::Custom(kind) => kind,
        }
    }
}

/// Notifications an exchange raises to the owning application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// The broker confirmed the exchange as declared
    Declared,

    /// The broker confirmed the exchange as deleted
    Removed,

    /// A published message was returned with an error reply code
    Error(ReplyCode),

    /// The broker put the channel into confirm mode
    ConfirmsEnabled,

    /// Every tracked publish has been confirmed by the broker
    AllMessagesDelivered,
}

/// Requests sent from an [`Exchange`] handle to its entity
#[derive(Debug)]
pub enum ExchangeControl {
    /// Declare the exchange
    Declare {
        /// Exchange type string
        kind: String,
        /// Declare options
        options: exchange::DeclareOptions,
        /// Server-specific declare arguments
        arguments: FieldTable,
    },

    /// Delete the exchange
    Remove {
        /// Delete options
        options: exchange::DeleteOptions,
    },

    /// Publish a message through the exchange
    Publish {
        /// Message body
        payload: Payload,
        /// Routing key
        routing_key: String,
        /// Content MIME type, used when `properties` carries none
        mime_type: String,
        /// Application headers, used when `properties` carries none
        headers: FieldTable,
        /// Message properties; unset fields fall back to defaults
        properties: BasicProperties,
        /// Publish options
        options: basic::PublishOptions,
    },

    /// Put the channel into publisher confirm mode
    EnableConfirms {
        /// Do not wait for select-ok
        no_wait: bool,
    },
}

/// Application handle to an exchange entity.
///
/// All requests are fire-and-forget: they enqueue work for the entity's
/// engine task and return immediately, with outcomes reported on the
/// [`ExchangeEvent`] stream. The only error a handle can return is
/// [`Error::EngineStopped`].
#[derive(Debug)]
pub struct Exchange {
    control: mpsc::UnboundedSender<ExchangeControl>,
    confirmed: watch::Receiver<usize>,
}

impl Exchange {
    /// Creates an exchange entity on `link` together with its handle.
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
        Exchange,
        mpsc::UnboundedReceiver<ExchangeEvent>,
        EntityEngine<ExchangeEntity>,
    ) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (entity, confirmed) = ExchangeEntity::new(name, link, event_tx);
        let engine = EntityEngine::new(entity, lifecycle, control_rx);
        (
            Exchange {
                control: control_tx,
                confirmed,
            },
            event_rx,
            engine,
        )
    }

    fn send(&self, control: ExchangeControl) -> Result<(), Error> {
        self.control
            .send(control)
            .map_err(|_| Error::EngineStopped)
    }

    /// Declares the exchange as a `kind` exchange.
    ///
    /// While the channel is closed the declare is remembered and sent
    /// once the channel reopens. The broker's answer arrives as
    /// [`ExchangeEvent::Declared`].
    pub fn declare(
        &self,
        kind: ExchangeKind,
        options: exchange::DeclareOptions,
        arguments: FieldTable,
    ) -> Result<(), Error> {
        self.send(ExchangeControl::Declare {
            kind: kind.as_str().to_string(),
            options,
            arguments,
        })
    }

    /// Deletes the exchange. The broker's answer arrives as
    /// [`ExchangeEvent::Removed`].
    pub fn remove(&self, options: exchange::DeleteOptions) -> Result<(), Error> {
        self.send(ExchangeControl::Remove { options })
    }

    /// Publishes `payload` with `routing_key` through the exchange.
    ///
    /// Fields left unset in `properties` fall back to `mime_type`,
    /// `headers`, a `"utf-8"` content encoding, and a `"0"` message id.
    pub fn publish(
        &self,
        payload: impl Into<Payload>,
        routing_key: impl Into<String>,
        mime_type: impl Into<String>,
        headers: FieldTable,
        properties: BasicProperties,
        options: basic::PublishOptions,
    ) -> Result<(), Error> {
        self.send(ExchangeControl::Publish {
            payload: payload.into(),
            routing_key: routing_key.into(),
            mime_type: mime_type.into(),
            headers,
            properties,
            options,
        })
    }

    /// Publishes a plain-text message with default properties.
    pub fn publish_text(
        &self,
        text: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Result<(), Error> {
        self.publish(
            text.into(),
            routing_key,
            "text.plain",
            FieldTable::new(),
            BasicProperties::default(),
            basic::PublishOptions::default(),
        )
    }

    /// Asks the broker to enable publisher confirms.
    ///
    /// Delivery tags are tracked for every publish from this call on;
    /// the broker's answer arrives as [`ExchangeEvent::ConfirmsEnabled`].
    pub fn enable_confirms(&self, no_wait: bool) -> Result<(), Error> {
        self.send(ExchangeControl::EnableConfirms { no_wait })
    }

    /// Waits until every tracked publish has been confirmed, or until
    /// `timeout` elapses.
    ///
    /// Returns whether the set of unconfirmed publishes was empty when
    /// the wait ended. Publishes sent before
    /// [`enable_confirms`](Self::enable_confirms) are not tracked and
    /// never waited on.
    pub async fn wait_for_confirms(&mut self, timeout: Duration) -> Result<bool, Error> {
        let result = tokio::time::timeout(timeout, self.confirmed.wait_for(|count| *count == 0))
            .await
            .map(|changed| changed.map(|_| ()));
        match result {
            Ok(Ok(())) => Ok(true),
            Ok(Err(_)) => Err(Error::EngineStopped),
            Err(_) => Ok(*self.confirmed.borrow() == 0),
        }
    }
}
