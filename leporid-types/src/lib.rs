#![deny(missing_docs, missing_debug_implementations)]

//! Data types for the AMQP 0-9-1 methods and content fields exercised by the
//! entity layer: the Exchange, Queue, Basic, and Confirm classes as defined in
//! the [specification](https://www.rabbitmq.com/resources/specs/amqp0-9-1.pdf),
//! plus the field-table value model of the RabbitMQ errata.

pub mod codec;
pub mod method;
pub mod properties;
pub mod reply;
pub mod value;

pub use codec::{FieldGet, FieldPut};
pub use method::Method;
pub use properties::BasicProperties;
pub use reply::ReplyCode;
pub use value::{FieldTable, FieldValue};
