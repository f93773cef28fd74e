//! Typed method arguments for the supported AMQP 0-9-1 classes.
//!
//! Every method is identified on the wire by a `(class-id, method-id)` pair
//! written ahead of its arguments. [`Method::decode`] dispatches a method
//! frame payload to the matching typed decoder; [`Method::encode`] writes
//! the pair followed by the arguments.

pub mod basic;
pub mod confirm;
pub mod exchange;
pub mod queue;

use bytes::{Buf, BytesMut};

use crate::codec::{Error, FieldGet, FieldPut};

/// A decoded method frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    /// exchange.declare
    ExchangeDeclare(exchange::Declare),
    /// exchange.declare-ok
    ExchangeDeclareOk(exchange::DeclareOk),
    /// exchange.delete
    ExchangeDelete(exchange::Delete),
    /// exchange.delete-ok
    ExchangeDeleteOk(exchange::DeleteOk),

    /// queue.declare
    QueueDeclare(queue::Declare),
    /// queue.declare-ok
    QueueDeclareOk(queue::DeclareOk),
    /// queue.bind
    QueueBind(queue::Bind),
    /// queue.bind-ok
    QueueBindOk(queue::BindOk),
    /// queue.purge
    QueuePurge(queue::Purge),
    /// queue.purge-ok
    QueuePurgeOk(queue::PurgeOk),
    /// queue.delete
    QueueDelete(queue::Delete),
    /// queue.delete-ok
    QueueDeleteOk(queue::DeleteOk),
    /// queue.unbind
    QueueUnbind(queue::Unbind),
    /// queue.unbind-ok
    QueueUnbindOk(queue::UnbindOk),

    /// basic.consume
    BasicConsume(basic::Consume),
    /// basic.consume-ok
    BasicConsumeOk(basic::ConsumeOk),
    /// basic.publish
    BasicPublish(basic::Publish),
    /// basic.return
    BasicReturn(basic::Return),
    /// basic.deliver
    BasicDeliver(basic::Deliver),
    /// basic.get
    BasicGet(basic::Get),
    /// basic.get-ok
    BasicGetOk(basic::GetOk),
    /// basic.get-empty
    BasicGetEmpty(basic::GetEmpty),
    /// basic.ack
    BasicAck(basic::Ack),
    /// basic.nack
    BasicNack(basic::Nack),

    /// confirm.select
    ConfirmSelect(confirm::Select),
    /// confirm.select-ok
    ConfirmSelectOk(confirm::SelectOk),
}

impl Method {
    /// Class id of the wrapped method.
    pub fn class_id(&self) -> u16 {
        match self {
            Method::ExchangeDeclare(_)
            | Method::ExchangeDeclareOk(_)
            | Method::ExchangeDelete(_)
            | Method::ExchangeDeleteOk(_) => exchange::CLASS_ID,

            Method::QueueDeclare(_)
            | Method::QueueDeclareOk(_)
            | Method::QueueBind(_)
            | Method::QueueBindOk(_)
            | Method::QueuePurge(_)
            | Method::QueuePurgeOk(_)
            | Method::QueueDelete(_)
            | Method::QueueDeleteOk(_)
            | Method::QueueUnbind(_)
            | Method::QueueUnbindOk(_) => queue::CLASS_ID,

            Method::BasicConsume(_)
            | Method::BasicConsumeOk(_)
            | Method::BasicPublish(_)
            | Method::BasicReturn(_)
            | Method::BasicDeliver(_)
            | Method::BasicGet(_)
            | Method::BasicGetOk(_)
            | Method::BasicGetEmpty(_)
            | Method::BasicAck(_)
            | Method::BasicNack(_) => basic::CLASS_ID,

            Method::ConfirmSelect(_) | Method::ConfirmSelectOk(_) => confirm::CLASS_ID,
        }
    }

    /// Method id of the wrapped method within its class.
    pub fn method_id(&self) -> u16 {
        match self {
            Method::ExchangeDeclare(_) => exchange::DECLARE,
            Method::ExchangeDeclareOk(_) => exchange::DECLARE_OK,
            Method::ExchangeDelete(_) => exchange::DELETE,
            Method::ExchangeDeleteOk(_) => exchange::DELETE_OK,

            Method::QueueDeclare(_) => queue::DECLARE,
            Method::QueueDeclareOk(_) => queue::DECLARE_OK,
            Method::QueueBind(_) => queue::BIND,
            Method::QueueBindOk(_) => queue::BIND_OK,
            Method::QueuePurge(_) => queue::PURGE,
            Method::QueuePurgeOk(_) => queue::PURGE_OK,
            Method::QueueDelete(_) => queue::DELETE,
            Method::QueueDeleteOk(_) => queue::DELETE_OK,
            Method::QueueUnbind(_) => queue::UNBIND,
            Method::QueueUnbindOk(_) => queue::UNBIND_OK,

            Method::BasicConsume(_) => basic::CONSUME,
            Method::BasicConsumeOk(_) => basic::CONSUME_OK,
            Method::BasicPublish(_) => basic::PUBLISH,
            Method::BasicReturn(_) => basic::RETURN,
            Method::BasicDeliver(_) => basic::DELIVER,
            Method::BasicGet(_) => basic::GET,
            Method::BasicGetOk(_) => basic::GET_OK,
            Method::BasicGetEmpty(_) => basic::GET_EMPTY,
            Method::BasicAck(_) => basic::ACK,
            Method::BasicNack(_) => basic::NACK,

            Method::ConfirmSelect(_) => confirm::SELECT,
            Method::ConfirmSelectOk(_) => confirm::SELECT_OK,
        }
    }

    /// Encodes the full method payload: class id, method id, arguments.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        buf.put_short(self.class_id());
        buf.put_short(self.method_id());
        match self {
            Method::ExchangeDeclare(args) => args.encode_args(buf),
            Method::ExchangeDeclareOk(args) => args.encode_args(buf),
            Method::ExchangeDelete(args) => args.encode_args(buf),
            Method::ExchangeDeleteOk(args) => args.encode_args(buf),

            Method::QueueDeclare(args) => args.encode_args(buf),
            Method::QueueDeclareOk(args) => args.encode_args(buf),
            Method::QueueBind(args) => args.encode_args(buf),
            Method::QueueBindOk(args) => args.encode_args(buf),
            Method::QueuePurge(args) => args.encode_args(buf),
            Method::QueuePurgeOk(args) => args.encode_args(buf),
            Method::QueueDelete(args) => args.encode_args(buf),
            Method::QueueDeleteOk(args) => args.encode_args(buf),
            Method::QueueUnbind(args) => args.encode_args(buf),
            Method::QueueUnbindOk(args) => args.encode_args(buf),

            Method::BasicConsume(args) => args.encode_args(buf),
            Method::BasicConsumeOk(args) => args.encode_args(buf),
            Method::BasicPublish(args) => args.encode_args(buf),
            Method::BasicReturn(args) => args.encode_args(buf),
            Method::BasicDeliver(args) => args.encode_args(buf),
            Method::BasicGet(args) => args.encode_args(buf),
            Method::BasicGetOk(args) => args.encode_args(buf),
            Method::BasicGetEmpty(args) => args.encode_args(buf),
            Method::BasicAck(args) => args.encode_args(buf),
            Method::BasicNack(args) => args.encode_args(buf),

            Method::ConfirmSelect(args) => args.encode_args(buf),
            Method::ConfirmSelectOk(args) => args.encode_args(buf),
        }
    }

    /// Decodes a full method payload: class id, method id, arguments.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, Error> {
        let class_id = buf.get_short()?;
        let method_id = buf.get_short()?;
        let method = match (class_id, method_id) {
            (exchange::CLASS_ID, exchange::DECLARE) => {
                Method::ExchangeDeclare(exchange::Declare::decode_args(buf)?)
            }
            (exchange::CLASS_ID, exchange::DECLARE_OK) => {
                Method::ExchangeDeclareOk(exchange::DeclareOk::decode_args(buf)?)
            }
            (exchange::CLASS_ID, exchange::DELETE) => {
                Method::ExchangeDelete(exchange::Delete::decode_args(buf)?)
            }
            (exchange::CLASS_ID, exchange::DELETE_OK) => {
                Method::ExchangeDeleteOk(exchange::DeleteOk::decode_args(buf)?)
            }

            (queue::CLASS_ID, queue::DECLARE) => {
                Method::QueueDeclare(queue::Declare::decode_args(buf)?)
            }
            (queue::CLASS_ID, queue::DECLARE_OK) => {
                Method::QueueDeclareOk(queue::DeclareOk::decode_args(buf)?)
            }
            (queue::CLASS_ID, queue::BIND) => Method::QueueBind(queue::Bind::decode_args(buf)?),
            (queue::CLASS_ID, queue::BIND_OK) => {
                Method::QueueBindOk(queue::BindOk::decode_args(buf)?)
            }
            (queue::CLASS_ID, queue::PURGE) => Method::QueuePurge(queue::Purge::decode_args(buf)?),
            (queue::CLASS_ID, queue::PURGE_OK) => {
                Method::QueuePurgeOk(queue::PurgeOk::decode_args(buf)?)
            }
            (queue::CLASS_ID, queue::DELETE) => {
                Method::QueueDelete(queue::Delete::decode_args(buf)?)
            }
            (queue::CLASS_ID, queue::DELETE_OK) => {
                Method::QueueDeleteOk(queue::DeleteOk::decode_args(buf)?)
            }
            (queue::CLASS_ID, queue::UNBIND) => {
                Method::QueueUnbind(queue::Unbind::decode_args(buf)?)
            }
            (queue::CLASS_ID, queue::UNBIND_OK) => {
                Method::QueueUnbindOk(queue::UnbindOk::decode_args(buf)?)
            }

            (basic::CLASS_ID, basic::CONSUME) => {
                Method::BasicConsume(basic::Consume::decode_args(buf)?)
            }
            (basic::CLASS_ID, basic::CONSUME_OK) => {
                Method::BasicConsumeOk(basic::ConsumeOk::decode_args(buf)?)
            }
            (basic::CLASS_ID, basic::PUBLISH) => {
                Method::BasicPublish(basic::Publish::decode_args(buf)?)
            }
            (basic::CLASS_ID, basic::RETURN) => {
                Method::BasicReturn(basic::Return::decode_args(buf)?)
            }
            (basic::CLASS_ID, basic::DELIVER) => {
                Method::BasicDeliver(basic::Deliver::decode_args(buf)?)
            }
            (basic::CLASS_ID, basic::GET) => Method::BasicGet(basic::Get::decode_args(buf)?),
            (basic::CLASS_ID, basic::GET_OK) => {
                Method::BasicGetOk(basic::GetOk::decode_args(buf)?)
            }
            (basic::CLASS_ID, basic::GET_EMPTY) => {
                Method::BasicGetEmpty(basic::GetEmpty::decode_args(buf)?)
            }
            (basic::CLASS_ID, basic::ACK) => Method::BasicAck(basic::Ack::decode_args(buf)?),
            (basic::CLASS_ID, basic::NACK) => Method::BasicNack(basic::Nack::decode_args(buf)?),

            (confirm::CLASS_ID, confirm::SELECT) => {
                Method::ConfirmSelect(confirm::Select::decode_args(buf)?)
            }
            (confirm::CLASS_ID, confirm::SELECT_OK) => {
                Method::ConfirmSelectOk(confirm::SelectOk::decode_args(buf)?)
            }

            _ => return Err(Error::UnknownMethod(class_id, method_id)),
        };
        Ok(method)
    }
}
