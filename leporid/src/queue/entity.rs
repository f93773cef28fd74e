//! Queue protocol state machine

use leporid_types::method::{basic, queue, Method};
use leporid_types::FieldTable;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::assembly::DeliveryAssembler;
use super::{QueueControl, QueueEvent};
use crate::channel::ChannelLink;
use crate::entity::Entity;
use crate::frames::ContentHeader;
use crate::message::Message;
use crate::Payload;

/// The protocol state machine for one queue on one channel.
///
/// Normally owned and driven by an
/// [`EntityEngine`](crate::engine::EntityEngine); the methods are public
/// so the machine can also be exercised directly, without a runtime.
#[derive(Debug)]
pub struct QueueEntity {
    link: ChannelLink,
    name: String,
    options: queue::DeclareOptions,
    declared: bool,
    delayed_declare: bool,
    delayed_bindings: Vec<(String, String)>,
    consumer_tag: String,
    no_ack: bool,
    assembler: DeliveryAssembler,
    events: mpsc::UnboundedSender<QueueEvent>,
}

impl QueueEntity {
    /// Creates the state machine for the queue called `name`.
    ///
    /// An empty name is valid and asks the broker to generate one; the
    /// generated name replaces the local one when `DeclareOk` arrives.
    pub fn new(
        name: impl Into<String>,
        link: ChannelLink,
        events: mpsc::UnboundedSender<QueueEvent>,
    ) -> Self {
        Self {
            link,
            name: name.into(),
            options: queue::DeclareOptions::default(),
            declared: false,
            delayed_declare: false,
            delayed_bindings: Vec::new(),
            consumer_tag: String::new(),
            no_ack: true,
            assembler: DeliveryAssembler::default(),
            events,
        }
    }

    /// Queue name; may have been assigned by the broker
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options sent with the last declare request
    pub fn options(&self) -> queue::DeclareOptions {
        self.options
    }

    /// Whether the broker has confirmed the queue as declared
    pub fn is_declared(&self) -> bool {
        self.declared
    }

    /// Tag of the active subscription, empty when not consuming
    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    /// Presets the consumer tag sent with the next [`consume`](Self::consume)
    pub fn set_consumer_tag(&mut self, consumer_tag: impl Into<String>) {
        self.consumer_tag = consumer_tag.into();
    }

    /// Whether fetched messages are taken without acknowledgement
    pub fn no_ack(&self) -> bool {
        self.no_ack
    }

    /// Sets the no-ack flag used by [`get`](Self::get)
    pub fn set_no_ack(&mut self, no_ack: bool) {
        self.no_ack = no_ack;
    }

    /// Declares the queue as `name` with `options`.
    ///
    /// Deferred until the channel opens if it is currently closed; only
    /// the latest deferred declare survives.
    pub fn declare(&mut self, name: impl Into<String>, options: queue::DeclareOptions) {
        self.name = name.into();
        self.options = options;
        self.send_declare();
    }

    fn send_declare(&mut self) {
        if !self.link.is_open() {
            debug!(queue = %self.name, "channel closed, deferring declare");
            self.delayed_declare = true;
            return;
        }

        debug!(queue = %self.name, "declaring queue");
        self.link.send_method(Method::QueueDeclare(queue::Declare {
            queue: self.name.clone(),
            options: self.options,
            arguments: FieldTable::new(),
        }));
        self.delayed_declare = false;
    }

    /// Deletes the queue. Ignored unless the broker has confirmed the
    /// queue as declared.
    pub fn remove(&mut self, options: queue::DeleteOptions) {
        if !self.declared {
            debug!(queue = %self.name, "remove ignored, queue not declared");
            return;
        }

        debug!(queue = %self.name, "removing queue");
        self.link.send_method(Method::QueueDelete(queue::Delete {
            queue: self.name.clone(),
            options,
        }));
    }

    /// Drops all messages held by the queue. Ignored while the channel
    /// is closed.
    pub fn purge(&mut self) {
        if !self.link.is_open() {
            debug!(queue = %self.name, "purge dropped, channel closed");
            return;
        }

        self.link.send_method(Method::QueuePurge(queue::Purge {
            queue: self.name.clone(),
            no_wait: false,
        }));
    }

    /// Binds the queue to `exchange` under `routing_key`.
    ///
    /// Deferred until the channel opens if it is currently closed;
    /// deferred bindings replay in the order they were requested.
    pub fn bind(&mut self, exchange: impl Into<String>, routing_key: impl Into<String>) {
        let exchange = exchange.into();
        let routing_key = routing_key.into();
        if !self.link.is_open() {
            debug!(queue = %self.name, %exchange, "channel closed, deferring bind");
            self.delayed_bindings.push((exchange, routing_key));
            return;
        }
        self.send_bind(exchange, routing_key);
    }

    fn send_bind(&mut self, exchange: String, routing_key: String) {
        debug!(queue = %self.name, %exchange, %routing_key, "binding queue");
        self.link.send_method(Method::QueueBind(queue::Bind {
            queue: self.name.clone(),
            exchange,
            routing_key,
            no_wait: false,
            arguments: FieldTable::new(),
        }));
    }

    /// Unbinds the queue from `exchange`. Unlike [`bind`](Self::bind),
    /// dropped while the channel is closed rather than deferred.
    pub fn unbind(&mut self, exchange: impl Into<String>, routing_key: impl Into<String>) {
        if !self.link.is_open() {
            debug!(queue = %self.name, "unbind dropped, channel closed");
            return;
        }

        self.link.send_method(Method::QueueUnbind(queue::Unbind {
            queue: self.name.clone(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            arguments: FieldTable::new(),
        }));
    }

    /// Starts a subscription, sending the entity's consumer tag (empty
    /// asks the broker to assign one). Dropped while the channel is
    /// closed.
    pub fn consume(&mut self, options: basic::ConsumeOptions) {
        if !self.link.is_open() {
            debug!(queue = %self.name, "consume dropped, channel closed");
            return;
        }

        debug!(queue = %self.name, consumer_tag = %self.consumer_tag, "starting consumer");
        self.link.send_method(Method::BasicConsume(basic::Consume {
            queue: self.name.clone(),
            consumer_tag: self.consumer_tag.clone(),
            options,
            arguments: FieldTable::new(),
        }));
    }

    /// Fetches a single message, carrying the entity's no-ack flag.
    /// Dropped while the channel is closed.
    pub fn get(&mut self) {
        if !self.link.is_open() {
            debug!(queue = %self.name, "get dropped, channel closed");
            return;
        }

        self.link.send_method(Method::BasicGet(basic::Get {
            queue: self.name.clone(),
            no_ack: self.no_ack,
        }));
    }

    /// Acknowledges one delivery by tag.
    ///
    /// Dropped while the channel is closed; the broker will redeliver
    /// the unacknowledged message after the channel loss.
    pub fn ack(&mut self, delivery_tag: u64) {
        if !self.link.is_open() {
            debug!(queue = %self.name, delivery_tag, "ack dropped, channel closed");
            return;
        }

        self.link.send_method(Method::BasicAck(basic::Ack {
            delivery_tag,
            multiple: false,
        }));
    }

    /// Whether the oldest pending delivery has been fully received
    pub fn has_message(&self) -> bool {
        self.assembler.has_message()
    }

    /// Dequeues the oldest pending delivery, complete or not.
    ///
    /// Callers should check [`has_message`](Self::has_message) first
    /// unless a partially received message is acceptable.
    pub fn get_message(&mut self) -> Option<Message> {
        self.assembler.take_message()
    }

    fn notify(&self, event: QueueEvent) {
        if self.events.send(event).is_err() {
            trace!(queue = %self.name, "event stream dropped by the application");
        }
    }

    fn on_declare_ok(&mut self, ok: queue::DeclareOk) {
        self.declared = true;
        self.name = ok.queue;
        debug!(
            queue = %self.name,
            messages = ok.message_count,
            consumers = ok.consumer_count,
            "queue declared"
        );
        self.notify(QueueEvent::Declared);
    }

    // PurgeOk is routed here as well: both mean the broker emptied or
    // dropped the queue, and both reset the declared flag.
    fn on_delete_ok(&mut self, message_count: u32) {
        self.declared = false;
        debug!(queue = %self.name, messages = message_count, "queue deleted or purged");
        self.notify(QueueEvent::Removed);
    }

    fn on_consume_ok(&mut self, ok: basic::ConsumeOk) {
        self.consumer_tag = ok.consumer_tag;
        debug!(queue = %self.name, consumer_tag = %self.consumer_tag, "consumer started");
    }

    fn on_deliver(&mut self, deliver: basic::Deliver) {
        if deliver.consumer_tag != self.consumer_tag {
            debug!(
                queue = %self.name,
                consumer_tag = %deliver.consumer_tag,
                "ignoring delivery for an inactive consumer tag"
            );
            return;
        }

        self.assembler.begin(Message {
            delivery_tag: deliver.delivery_tag,
            redelivered: deliver.redelivered,
            exchange: deliver.exchange,
            routing_key: deliver.routing_key,
            ..Default::default()
        });
    }

    fn on_get_ok(&mut self, ok: basic::GetOk) {
        debug!(queue = %self.name, remaining = ok.message_count, "fetched message");
        self.assembler.begin(Message {
            delivery_tag: ok.delivery_tag,
            redelivered: ok.redelivered,
            exchange: ok.exchange,
            routing_key: ok.routing_key,
            ..Default::default()
        });
    }
}

impl Entity for QueueEntity {
    type Control = QueueControl;

    fn on_channel_opened(&mut self) {
        self.link.set_open(true);
        debug!(queue = %self.name, "channel opened");

        if self.delayed_declare {
            self.send_declare();
        }
        for (exchange, routing_key) in std::mem::take(&mut self.delayed_bindings) {
            self.send_bind(exchange, routing_key);
        }
    }

    fn on_channel_closed(&mut self) {
        self.link.set_open(false);
        self.declared = false;

        let discarded = self.assembler.discard_incomplete();
        if discarded > 0 {
            debug!(queue = %self.name, discarded, "discarding partial deliveries");
        }
        debug!(queue = %self.name, "channel closed");
    }

    fn on_method(&mut self, method: Method) {
        match method {
            Method::QueueDeclareOk(ok) => self.on_declare_ok(ok),
            Method::QueueDeleteOk(ok) => self.on_delete_ok(ok.message_count),
            Method::QueuePurgeOk(ok) => self.on_delete_ok(ok.message_count),
            Method::QueueBindOk(_) => {
                debug!(queue = %self.name, "queue bound");
                self.notify(QueueEvent::Bound(true));
            }
            Method::QueueUnbindOk(_) => {
                debug!(queue = %self.name, "queue unbound");
                self.notify(QueueEvent::Bound(false));
            }
            Method::BasicConsumeOk(ok) => self.on_consume_ok(ok),
            Method::BasicDeliver(deliver) => self.on_deliver(deliver),
            Method::BasicGetOk(ok) => self.on_get_ok(ok),
            Method::BasicGetEmpty(_) => {
                debug!(queue = %self.name, "queue is empty");
                self.notify(QueueEvent::Empty);
            }
            other => trace!(
                queue = %self.name,
                class_id = other.class_id(),
                method_id = other.method_id(),
                "ignoring method"
            ),
        }
    }

    fn on_header(&mut self, header: ContentHeader) {
        self.assembler.apply_header(header);
    }

    fn on_body(&mut self, body: Payload) {
        if self.assembler.apply_body(body) {
            self.notify(QueueEvent::MessageReceived);
        }
    }

    fn handle_control(&mut self, control: QueueControl) {
        match control {
            QueueControl::Declare { name, options } => self.declare(name, options),
            QueueControl::Remove { options } => self.remove(options),
            QueueControl::Purge => self.purge(),
            QueueControl::Bind {
                exchange,
                routing_key,
            } => self.bind(exchange, routing_key),
            QueueControl::Unbind {
                exchange,
                routing_key,
            } => self.unbind(exchange, routing_key),
            QueueControl::Consume { options } => self.consume(options),
            QueueControl::SetConsumerTag(consumer_tag) => self.set_consumer_tag(consumer_tag),
            QueueControl::SetNoAck(no_ack) => self.set_no_ack(no_ack),
            QueueControl::Get => self.get(),
            QueueControl::Ack { delivery_tag } => self.ack(delivery_tag),
            QueueControl::GetMessage { responder } => {
                let message = if self.has_message() {
                    self.get_message()
                } else {
                    None
                };
                if responder.send(message).is_err() {
                    warn!(queue = %self.name, "get_message caller went away");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelCommand;
    use crate::frames::FrameBody;

    fn test_queue(
        name: &str,
    ) -> (
        QueueEntity,
        mpsc::UnboundedReceiver<ChannelCommand>,
        mpsc::UnboundedReceiver<QueueEvent>,
    ) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let link = ChannelLink::new(2, 4096, commands_tx);
        let entity = QueueEntity::new(name, link, events_tx);
        (entity, commands_rx, events_rx)
    }

    fn next_method(commands: &mut mpsc::UnboundedReceiver<ChannelCommand>) -> Method {
        match commands.try_recv() {
            Ok(ChannelCommand::SendFrame(FrameBody::Method(method))) => method,
            other => panic!("expected a method frame, got {:?}", other),
        }
    }

    fn assert_no_command(commands: &mut mpsc::UnboundedReceiver<ChannelCommand>) {
        assert!(commands.try_recv().is_err());
    }

    fn declare_ok(name: &str) -> Method {
        Method::QueueDeclareOk(queue::DeclareOk {
            queue: String::from(name),
            message_count: 0,
            consumer_count: 0,
        })
    }

    #[test]
    fn test_declare_while_closed_is_deferred() {
        let (mut entity, mut commands, mut events) = test_queue("q1");

        entity.declare("q1", queue::DeclareOptions::default());
        assert_no_command(&mut commands);

        entity.on_channel_opened();
        match next_method(&mut commands) {
            Method::QueueDeclare(declare) => {
                assert_eq!(declare.queue, "q1");
                assert!(declare.arguments.is_empty());
            }
            other => panic!("unexpected method: {:?}", other),
        }
        // Exactly one declare frame for however long the channel was
        // closed.
        assert_no_command(&mut commands);

        entity.on_method(declare_ok("q1"));
        assert!(entity.is_declared());
        assert_eq!(events.try_recv(), Ok(QueueEvent::Declared));
    }

    #[test]
    fn test_declare_ok_overwrites_name_with_server_assigned() {
        let (mut entity, mut commands, _events) = test_queue("");
        entity.on_channel_opened();

        entity.declare("", queue::DeclareOptions::default());
        next_method(&mut commands);

        entity.on_method(declare_ok("amq.gen-pXBGQYKh"));
        assert_eq!(entity.name(), "amq.gen-pXBGQYKh");
    }

    #[test]
    fn test_deferred_bindings_flush_in_order_and_clear() {
        let (mut entity, mut commands, _events) = test_queue("q1");

        entity.bind("logs", "info");
        entity.bind("logs", "warning");
        assert_no_command(&mut commands);

        entity.on_channel_opened();
        for expected in ["info", "warning"] {
            match next_method(&mut commands) {
                Method::QueueBind(bind) => {
                    assert_eq!(bind.exchange, "logs");
                    assert_eq!(bind.routing_key, expected);
                }
                other => panic!("unexpected method: {:?}", other),
            }
        }

        // The deferred list is consumed, not replayed again.
        entity.on_channel_closed();
        entity.on_channel_opened();
        assert_no_command(&mut commands);
    }

    #[test]
    fn test_unbind_while_closed_is_dropped() {
        let (mut entity, mut commands, _events) = test_queue("q1");

        entity.unbind("logs", "info");
        assert_no_command(&mut commands);

        entity.on_channel_opened();
        assert_no_command(&mut commands);
    }

    #[test]
    fn test_remove_requires_declared() {
        let (mut entity, mut commands, _events) = test_queue("q1");
        entity.on_channel_opened();

        entity.remove(queue::DeleteOptions::default());
        assert_no_command(&mut commands);

        entity.declare("q1", queue::DeclareOptions::default());
        next_method(&mut commands);
        entity.on_method(declare_ok("q1"));

        entity.remove(queue::DeleteOptions {
            if_unused: true,
            if_empty: true,
            no_wait: false,
        });
        match next_method(&mut commands) {
            Method::QueueDelete(delete) => {
                assert!(delete.options.if_unused);
                assert!(delete.options.if_empty);
            }
            other => panic!("unexpected method: {:?}", other),
        }
    }

    #[test]
    fn test_remove_after_channel_close_requires_redeclare() {
        let (mut entity, mut commands, _events) = test_queue("q1");
        entity.on_channel_opened();
        entity.declare("q1", queue::DeclareOptions::default());
        next_method(&mut commands);
        entity.on_method(declare_ok("q1"));

        entity.on_channel_closed();
        entity.on_channel_opened();

        // The close reset the declared flag.
        entity.remove(queue::DeleteOptions::default());
        assert_no_command(&mut commands);
    }

    #[test]
    fn test_purge_requires_open_channel() {
        let (mut entity, mut commands, _events) = test_queue("q1");

        entity.purge();
        assert_no_command(&mut commands);

        entity.on_channel_opened();
        entity.purge();
        assert!(matches!(next_method(&mut commands), Method::QueuePurge(_)));
    }

    #[test]
    fn test_purge_ok_reports_removed() {
        let (mut entity, mut commands, mut events) = test_queue("q1");
        entity.on_channel_opened();
        entity.declare("q1", queue::DeclareOptions::default());
        next_method(&mut commands);
        entity.on_method(declare_ok("q1"));
        let _ = events.try_recv();

        entity.on_method(Method::QueuePurgeOk(queue::PurgeOk { message_count: 7 }));
        assert!(!entity.is_declared());
        assert_eq!(events.try_recv(), Ok(QueueEvent::Removed));
    }

    #[test]
    fn test_consume_sends_preset_tag_and_consume_ok_overwrites() {
        let (mut entity, mut commands, _events) = test_queue("q1");
        entity.on_channel_opened();
        entity.declare("q1", queue::DeclareOptions::default());
        next_method(&mut commands);
        entity.on_method(declare_ok("q1"));

        entity.set_consumer_tag("my-consumer");
        entity.consume(basic::ConsumeOptions::default());
        match next_method(&mut commands) {
            Method::BasicConsume(consume) => {
                assert_eq!(consume.queue, "q1");
                assert_eq!(consume.consumer_tag, "my-consumer");
            }
            other => panic!("unexpected method: {:?}", other),
        }

        entity.on_method(Method::BasicConsumeOk(basic::ConsumeOk {
            consumer_tag: String::from("amq.ctag-1"),
        }));
        assert_eq!(entity.consumer_tag(), "amq.ctag-1");
        // The subscription does not disturb the declared flag.
        assert!(entity.is_declared());
    }

    #[test]
    fn test_get_carries_no_ack_flag() {
        let (mut entity, mut commands, _events) = test_queue("q1");
        entity.on_channel_opened();

        entity.get();
        match next_method(&mut commands) {
            Method::BasicGet(get) => assert!(get.no_ack),
            other => panic!("unexpected method: {:?}", other),
        }

        entity.set_no_ack(false);
        entity.get();
        match next_method(&mut commands) {
            Method::BasicGet(get) => assert!(!get.no_ack),
            other => panic!("unexpected method: {:?}", other),
        }
    }

    #[test]
    fn test_ack_sends_single_tag() {
        let (mut entity, mut commands, _events) = test_queue("q1");
        entity.on_channel_opened();

        entity.ack(42);
        match next_method(&mut commands) {
            Method::BasicAck(ack) => {
                assert_eq!(ack.delivery_tag, 42);
                assert!(!ack.multiple);
            }
            other => panic!("unexpected method: {:?}", other),
        }
    }

    #[test]
    fn test_ack_while_closed_is_dropped() {
        let (mut entity, mut commands, _events) = test_queue("q1");
        entity.ack(42);
        assert_no_command(&mut commands);
    }

    fn deliver(tag: &str, delivery_tag: u64) -> Method {
        Method::BasicDeliver(basic::Deliver {
            consumer_tag: String::from(tag),
            delivery_tag,
            redelivered: false,
            exchange: String::from("logs"),
            routing_key: String::from("info"),
        })
    }

    fn header(body_size: u64) -> ContentHeader {
        ContentHeader::new(basic::CLASS_ID, body_size, Default::default())
    }

    #[test]
    fn test_delivery_reassembly_notifies_once() {
        let (mut entity, _commands, mut events) = test_queue("q1");
        entity.on_channel_opened();
        entity.set_consumer_tag("ctag");

        entity.on_method(deliver("ctag", 1));
        entity.on_header(header(5));
        entity.on_body(Payload::from_static(b"hel"));
        assert!(events.try_recv().is_err());
        entity.on_body(Payload::from_static(b"lo"));
        assert_eq!(events.try_recv(), Ok(QueueEvent::MessageReceived));
        assert!(events.try_recv().is_err());

        let message = entity.get_message().unwrap();
        assert_eq!(message.delivery_tag, 1);
        assert_eq!(&message.payload[..], b"hello");
        assert_eq!(message.exchange, "logs");
        assert_eq!(message.routing_key, "info");
    }

    #[test]
    fn test_deliver_with_stale_consumer_tag_is_ignored() {
        let (mut entity, _commands, mut events) = test_queue("q1");
        entity.on_channel_opened();
        entity.set_consumer_tag("current");

        entity.on_method(deliver("stale", 1));
        entity.on_header(header(1));
        entity.on_body(Payload::from_static(b"x"));

        assert!(events.try_recv().is_err());
        assert!(!entity.has_message());
    }

    #[test]
    fn test_pipelined_completion_is_not_notified() {
        let (mut entity, _commands, mut events) = test_queue("q1");
        entity.on_channel_opened();
        entity.set_consumer_tag("ctag");

        entity.on_method(deliver("ctag", 1));
        entity.on_header(header(1));
        entity.on_body(Payload::from_static(b"a"));
        assert_eq!(events.try_recv(), Ok(QueueEvent::MessageReceived));

        // Second delivery completes while the first is still queued:
        // no notification for it.
        entity.on_method(deliver("ctag", 2));
        entity.on_header(header(1));
        entity.on_body(Payload::from_static(b"b"));
        assert!(events.try_recv().is_err());

        assert_eq!(entity.get_message().unwrap().delivery_tag, 1);
        assert!(entity.has_message());
        assert_eq!(entity.get_message().unwrap().delivery_tag, 2);
    }

    #[test]
    fn test_get_ok_uses_the_same_reassembly_path() {
        let (mut entity, _commands, mut events) = test_queue("q1");
        entity.on_channel_opened();

        entity.on_method(Method::BasicGetOk(basic::GetOk {
            delivery_tag: 9,
            redelivered: true,
            exchange: String::from("logs"),
            routing_key: String::from(""),
            message_count: 3,
        }));
        entity.on_header(header(2));
        entity.on_body(Payload::from_static(b"ok"));

        assert_eq!(events.try_recv(), Ok(QueueEvent::MessageReceived));
        let message = entity.get_message().unwrap();
        assert_eq!(message.delivery_tag, 9);
        assert!(message.redelivered);
    }

    #[test]
    fn test_get_empty_notifies_empty() {
        let (mut entity, _commands, mut events) = test_queue("q1");
        entity.on_channel_opened();

        entity.on_method(Method::BasicGetEmpty(basic::GetEmpty));
        assert_eq!(events.try_recv(), Ok(QueueEvent::Empty));
    }

    #[test]
    fn test_channel_close_discards_partial_deliveries() {
        let (mut entity, _commands, mut events) = test_queue("q1");
        entity.on_channel_opened();
        entity.set_consumer_tag("ctag");

        entity.on_method(deliver("ctag", 1));
        entity.on_header(header(1));
        entity.on_body(Payload::from_static(b"a"));
        let _ = events.try_recv();

        entity.on_method(deliver("ctag", 2));
        entity.on_header(header(100));
        entity.on_body(Payload::from_static(b"partial"));

        entity.on_channel_closed();

        // The complete head survives, the partial tail does not.
        assert!(entity.has_message());
        assert_eq!(entity.get_message().unwrap().delivery_tag, 1);
        assert!(entity.get_message().is_none());
    }
}
