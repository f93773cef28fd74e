//! An AMQP 0-9-1 client protocol engine.
//!
//! This crate implements the channel-scoped protocol layer of an AMQP
//! 0-9-1 client: the [`exchange`] and [`queue`] entity state machines,
//! content framing and delivery reassembly, and publisher-confirm
//! tracking. Connection management, socket I/O and the channel
//! open/close handshake are deliberately left to an outer transport
//! layer, which drives entities through [`ChannelLink`] and
//! [`ChannelEvent`] and receives outbound frames as [`ChannelCommand`]s.
//!
//! Each entity runs on its own [`EntityEngine`] task. Applications hold
//! a cheap handle ([`Exchange`] or [`Queue`]) that forwards requests to
//! the engine and observe outcomes on an event stream, so all protocol
//! state is mutated from exactly one task, in frame arrival order.
//!
//! # Declaring an exchange and publishing
//!
//! ```rust,ignore
//! use leporid::{ChannelLink, Exchange, ExchangeKind};
//! use leporid_types::method::exchange::DeclareOptions;
//! use leporid_types::FieldTable;
//! use tokio::sync::mpsc;
//!
//! // The transport layer owns the other end of both channels.
//! let (commands_tx, commands_rx) = mpsc::unbounded_channel();
//! let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
//!
//! let link = ChannelLink::new(1, frame_max, commands_tx);
//! let (exchange, mut events, engine) = Exchange::new("logs", link, lifecycle_rx);
//! let _engine = engine.spawn();
//!
//! exchange.declare(ExchangeKind::Fanout, DeclareOptions::default(), FieldTable::new())?;
//! exchange.publish_text("hello", "")?;
//! ```

#![deny(missing_docs, missing_debug_implementations)]

use bytes::Bytes;

pub mod channel;
pub mod engine;
pub mod entity;
pub mod error;
pub mod exchange;
pub mod frames;
pub mod message;
pub mod queue;

pub use channel::{ChannelCommand, ChannelEvent, ChannelLink};
pub use engine::EntityEngine;
pub use error::Error;
pub use exchange::{Exchange, ExchangeKind};
pub use message::Message;
pub use queue::Queue;

/// Message body bytes, passed by ownership between frames and entities.
pub type Payload = Bytes;
