//! Exchange protocol state machine

use leporid_types::method::{basic, confirm, exchange, Method};
use leporid_types::{BasicProperties, FieldTable, ReplyCode};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use super::confirm::ConfirmLedger;
use super::{ExchangeControl, ExchangeEvent};
use crate::channel::ChannelLink;
use crate::entity::Entity;
use crate::frames::{ContentHeader, FrameBody};
use crate::Payload;

/// Lifecycle states of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// The underlying channel is closed
    Closed,

    /// The channel is open but the exchange has not been declared
    Undeclared,

    /// A declare request is in flight
    Declaring,

    /// The broker has confirmed the exchange as declared
    Declared,

    /// A delete request is outstanding
    Removing,
}

/// The protocol state machine for one exchange on one channel.
///
/// Normally owned and driven by an
/// [`EntityEngine`](crate::engine::EntityEngine); the methods are public
/// so the machine can also be exercised directly, without a runtime.
#[derive(Debug)]
pub struct ExchangeEntity {
    link: ChannelLink,
    name: String,
    kind: String,
    options: exchange::DeclareOptions,
    arguments: FieldTable,
    state: ExchangeState,
    delayed_declare: bool,
    delayed_remove: bool,
    remove_options: exchange::DeleteOptions,
    ledger: ConfirmLedger,
    error: Option<ReplyCode>,
    error_text: String,
    events: mpsc::UnboundedSender<ExchangeEvent>,
}

impl ExchangeEntity {
    /// Creates the state machine for the exchange called `name`.
    ///
    /// Also returns a watch mirroring the number of unconfirmed
    /// publishes, used by
    /// [`Exchange::wait_for_confirms`](crate::Exchange::wait_for_confirms).
    pub fn new(
        name: impl Into<String>,
        link: ChannelLink,
        events: mpsc::UnboundedSender<ExchangeEvent>,
    ) -> (Self, watch::Receiver<usize>) {
        let (ledger, confirm_watch) = ConfirmLedger::new();
        (
            Self {
                link,
                name: name.into(),
                kind: String::new(),
                options: exchange::DeclareOptions::default(),
                arguments: FieldTable::new(),
                state: ExchangeState::Closed,
                delayed_declare: false,
                delayed_remove: false,
                remove_options: exchange::DeleteOptions::default(),
                ledger,
                error: None,
                error_text: String::new(),
                events,
            },
            confirm_watch,
        )
    }

    /// Exchange name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exchange type sent with the last declare request
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Options sent with the last declare request
    pub fn options(&self) -> exchange::DeclareOptions {
        self.options
    }

    /// Current lifecycle state
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Whether the broker has confirmed the exchange as declared
    pub fn is_declared(&self) -> bool {
        self.state == ExchangeState::Declared
    }

    /// Reply code of the last broker error, if any
    pub fn last_error(&self) -> Option<ReplyCode> {
        self.error
    }

    /// Reply text accompanying [`last_error`](Self::last_error)
    pub fn error_text(&self) -> &str {
        &self.error_text
    }

    /// The default exchange and the `amq.*` family are owned by the
    /// broker and treated as declared the moment the channel opens.
    fn is_builtin(&self) -> bool {
        self.name.is_empty() || self.name.starts_with("amq.")
    }

    fn transition(&mut self, next: ExchangeState) {
        if self.state != next {
            debug!(
                exchange = %self.name,
                from = ?self.state,
                to = ?next,
                "exchange state change"
            );
            self.state = next;
        }
    }

    /// Declares the exchange as a `kind` exchange with `options` and
    /// `arguments`.
    ///
    /// Rejected outright for an unnamed exchange. If the channel is
    /// closed the declare is deferred and a reopen is requested; if a
    /// declare is already in flight the call is ignored; redeclaring a
    /// declared exchange resends the request.
    pub fn declare(
        &mut self,
        kind: impl Into<String>,
        options: exchange::DeclareOptions,
        arguments: FieldTable,
    ) {
        self.kind = kind.into();
        self.options = options;
        self.arguments = arguments;
        self.send_declare();
    }

    fn send_declare(&mut self) {
        if self.name.is_empty() {
            debug!("declare of an unnamed exchange ignored");
            return;
        }
        if !self.link.is_open() {
            debug!(exchange = %self.name, "channel closed, deferring declare and reopening");
            self.delayed_declare = true;
            self.delayed_remove = false;
            self.link.request_reopen();
            return;
        }
        match self.state {
            ExchangeState::Declared => {
                debug!(exchange = %self.name, "redeclaring exchange");
            }
            ExchangeState::Undeclared => {}
            ExchangeState::Declaring => {
                debug!(exchange = %self.name, "declare already in flight");
                return;
            }
            _ => {
                debug!(exchange = %self.name, state = ?self.state, "deferring declare");
                self.delayed_declare = true;
                return;
            }
        }

        debug!(exchange = %self.name, kind = %self.kind, "declaring exchange");
        self.transition(ExchangeState::Declaring);
        self.link
            .send_method(Method::ExchangeDeclare(exchange::Declare {
                exchange: self.name.clone(),
                kind: self.kind.clone(),
                options: self.options,
                arguments: self.arguments.clone(),
            }));
        self.delayed_declare = false;
    }

    /// Deletes the exchange.
    ///
    /// If the channel is closed the delete is deferred (with `options`
    /// cached) and a reopen is requested; a deferred declare is
    /// superseded.
    pub fn remove(&mut self, options: exchange::DeleteOptions) {
        if !self.link.is_open() {
            debug!(exchange = %self.name, "channel closed, deferring remove and reopening");
            self.delayed_declare = false;
            self.delayed_remove = true;
            self.remove_options = options;
            self.link.request_reopen();
            return;
        }

        debug!(exchange = %self.name, "removing exchange");
        self.link
            .send_method(Method::ExchangeDelete(exchange::Delete {
                exchange: self.name.clone(),
                options,
            }));
        self.delayed_remove = false;
    }

    /// Publishes a message to the exchange.
    ///
    /// When confirms are armed the next delivery tag is recorded before
    /// the frames go out, so client tag order matches the broker's.
    /// Emits one method frame, one content header (defaults overridden
    /// by `properties` where set) and one body frame per
    /// `frame_max - 7` bytes of payload; a zero-length payload emits
    /// the header and no body frames.
    pub fn publish(
        &mut self,
        payload: Payload,
        routing_key: impl Into<String>,
        mime_type: impl Into<String>,
        headers: FieldTable,
        properties: BasicProperties,
        options: basic::PublishOptions,
    ) {
        self.ledger.record_publish();

        self.link.send_method(Method::BasicPublish(basic::Publish {
            exchange: self.name.clone(),
            routing_key: routing_key.into(),
            options,
        }));

        let defaults = BasicProperties {
            content_type: Some(mime_type.into()),
            content_encoding: Some(String::from("utf-8")),
            headers: Some(headers),
            message_id: Some(String::from("0")),
            ..Default::default()
        };
        let header = ContentHeader::new(
            basic::CLASS_ID,
            payload.len() as u64,
            defaults.merge(properties),
        );
        self.link.send_frame(FrameBody::Header(header));

        let chunk_size = self.link.max_body_size();
        let mut sent = 0;
        while sent < payload.len() {
            let end = usize::min(sent + chunk_size, payload.len());
            self.link
                .send_frame(FrameBody::Body(payload.slice(sent..end)));
            sent = end;
        }
    }

    /// Asks the broker to enable publisher confirms and arms delivery
    /// tag tracking for every following publish.
    pub fn enable_confirms(&mut self, no_wait: bool) {
        self.link
            .send_method(Method::ConfirmSelect(confirm::Select { no_wait }));
        self.ledger.arm();
    }

    /// Delivery tags of publishes the broker has not confirmed yet.
    /// Empty until confirms are enabled.
    pub fn unconfirmed_tags(&self) -> &[u64] {
        self.ledger.unconfirmed()
    }

    fn notify(&self, event: ExchangeEvent) {
        if self.events.send(event).is_err() {
            trace!(exchange = %self.name, "event stream dropped by the application");
        }
    }

    fn on_declare_ok(&mut self) {
        debug!(exchange = %self.name, "exchange declared");
        self.transition(ExchangeState::Declared);
        self.notify(ExchangeEvent::Declared);
        if self.delayed_remove {
            let options = self.remove_options;
            self.remove(options);
        }
    }

    fn on_delete_ok(&mut self) {
        debug!(exchange = %self.name, "exchange removed");
        self.transition(ExchangeState::Undeclared);
        self.notify(ExchangeEvent::Removed);
        if self.delayed_declare {
            self.send_declare();
        }
    }

    fn on_ack(&mut self, ack: basic::Ack) {
        trace!(
            exchange = %self.name,
            delivery_tag = ack.delivery_tag,
            multiple = ack.multiple,
            "publish confirmed"
        );
        if self.ledger.apply_ack(ack.delivery_tag, ack.multiple) {
            self.notify(ExchangeEvent::AllMessagesDelivered);
        }
    }

    fn on_return(&mut self, ret: basic::Return) {
        debug!(
            exchange = %self.name,
            reply_code = ret.reply_code,
            reply_text = %ret.reply_text,
            routing_key = %ret.routing_key,
            "message returned by the broker"
        );
        let code = ReplyCode::from(ret.reply_code);
        if code.is_error() {
            self.error = Some(code);
            self.error_text = ret.reply_text;
            self.notify(ExchangeEvent::Error(code));
        }
    }
}

impl Entity for ExchangeEntity {
    type Control = ExchangeControl;

    fn on_channel_opened(&mut self) {
        self.link.set_open(true);
        debug!(exchange = %self.name, "channel opened");

        if !self.delayed_declare && self.is_builtin() {
            debug!(exchange = %self.name, "implicitly declaring built-in exchange");
            self.transition(ExchangeState::Declared);
            self.notify(ExchangeEvent::Declared);
            return;
        }
        self.transition(ExchangeState::Undeclared);

        if self.delayed_remove {
            let options = self.remove_options;
            self.remove(options);
        } else if self.delayed_declare {
            self.send_declare();
        }
    }

    fn on_channel_closed(&mut self) {
        self.link.set_open(false);
        // A declared (or declaring) exchange is redeclared on reopen;
        // the broker-owned built-ins never need that.
        if !self.is_builtin() {
            self.delayed_declare = matches!(
                self.state,
                ExchangeState::Declared | ExchangeState::Declaring
            );
        }
        self.transition(ExchangeState::Closed);
        debug!(exchange = %self.name, "channel closed");
    }

    fn on_method(&mut self, method: Method) {
        match method {
            Method::ExchangeDeclareOk(_) => self.on_declare_ok(),
            Method::ExchangeDeleteOk(_) => self.on_delete_ok(),
            Method::BasicAck(ack) => self.on_ack(ack),
            Method::BasicNack(nack) => self.ledger.apply_nack(nack.delivery_tag, nack.multiple),
            Method::BasicReturn(ret) => self.on_return(ret),
            Method::ConfirmSelectOk(_) => {
                debug!(exchange = %self.name, "publisher confirms enabled");
                self.notify(ExchangeEvent::ConfirmsEnabled);
            }
            other => trace!(
                exchange = %self.name,
                class_id = other.class_id(),
                method_id = other.method_id(),
                "ignoring method"
            ),
        }
    }

    // Content frames on an exchange channel belong to a returned
    // message; the returned body is not kept.

    fn on_header(&mut self, header: ContentHeader) {
        trace!(exchange = %self.name, body_size = header.body_size, "discarding returned content");
    }

    fn on_body(&mut self, body: Payload) {
        trace!(exchange = %self.name, len = body.len(), "discarding returned content");
    }

    fn handle_control(&mut self, control: ExchangeControl) {
        match control {
            ExchangeControl::Declare {
                kind,
                options,
                arguments,
            } => self.declare(kind, options, arguments),
            ExchangeControl::Remove { options } => self.remove(options),
            ExchangeControl::Publish {
                payload,
                routing_key,
                mime_type,
                headers,
                properties,
                options,
            } => self.publish(payload, routing_key, mime_type, headers, properties, options),
            ExchangeControl::EnableConfirms { no_wait } => self.enable_confirms(no_wait),
        }
    }
}
