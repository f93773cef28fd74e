//! Event loop driving an entity from its channel event stream

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace};

use crate::channel::ChannelEvent;
use crate::entity::Entity;
use crate::frames::FrameBody;

#[derive(Debug)]
enum Running {
    Continue,
    Stop,
}

/// Drives an [`Entity`] from two inputs: channel lifecycle events fed
/// by the transport layer and control requests fed by the entity's
/// handle.
///
/// The engine owns the entity, so every handler runs on the engine's
/// task and no entity state is ever touched concurrently. The loop
/// stops when either input channel is closed: the transport dropping
/// its sender means the channel is gone for good, and the handle
/// dropping means nobody is left to observe the entity.
#[derive(Debug)]
pub struct EntityEngine<E: Entity> {
    entity: E,
    channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
    control: mpsc::UnboundedReceiver<E::Control>,
}

impl<E> EntityEngine<E>
where
    E: Entity + Send + 'static,
    E::Control: Send + 'static,
{
    /// Creates an engine around `entity`
    pub fn new(
        entity: E,
        channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
        control: mpsc::UnboundedReceiver<E::Control>,
    ) -> Self {
        Self {
            entity,
            channel_events,
            control,
        }
    }

    /// Spawns the event loop onto the current runtime, consuming the
    /// engine
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.event_loop())
    }

    #[inline]
    fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened => self.entity.on_channel_opened(),
            ChannelEvent::Closed => self.entity.on_channel_closed(),
            ChannelEvent::Frame(FrameBody::Method(method)) => self.entity.on_method(method),
            ChannelEvent::Frame(FrameBody::Header(header)) => self.entity.on_header(header),
            ChannelEvent::Frame(FrameBody::Body(payload)) => self.entity.on_body(payload),
            // Heartbeats live on channel 0 and never reach an entity;
            // tolerate one anyway.
            ChannelEvent::Frame(FrameBody::Heartbeat) => trace!("ignoring heartbeat frame"),
        }
    }

    #[instrument(name = "EntityEngine::event_loop", skip(self))]
    async fn event_loop(mut self) {
        loop {
            let running = tokio::select! {
                event = self.channel_events.recv() => {
                    match event {
                        Some(event) => {
                            self.on_channel_event(event);
                            Running::Continue
                        }
                        None => Running::Stop,
                    }
                }
                control = self.control.recv() => {
                    match control {
                        Some(control) => {
                            self.entity.handle_control(control);
                            Running::Continue
                        }
                        None => Running::Stop,
                    }
                }
            };

            match running {
                Running::Continue => {}
                Running::Stop => break,
            }
        }

        debug!("Stopped");
    }
}

#[cfg(test)]
mod tests {
    use leporid_types::method::{basic, Method};

    use super::*;
    use crate::frames::ContentHeader;
    use crate::Payload;

    #[derive(Debug)]
    struct Probe {
        seen: mpsc::UnboundedSender<&'static str>,
    }

    impl Entity for Probe {
        type Control = &'static str;

        fn on_channel_opened(&mut self) {
            self.seen.send("opened").unwrap();
        }

        fn on_channel_closed(&mut self) {
            self.seen.send("closed").unwrap();
        }

        fn on_method(&mut self, _method: Method) {
            self.seen.send("method").unwrap();
        }

        fn on_header(&mut self, _header: ContentHeader) {
            self.seen.send("header").unwrap();
        }

        fn on_body(&mut self, _body: Payload) {
            self.seen.send("body").unwrap();
        }

        fn handle_control(&mut self, control: &'static str) {
            self.seen.send(control).unwrap();
        }
    }

    #[tokio::test]
    async fn test_events_dispatch_in_wire_order() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (_control_tx, control_rx) = mpsc::unbounded_channel::<&'static str>();

        let engine = EntityEngine::new(Probe { seen: seen_tx }, events_rx, control_rx);
        let handle = engine.spawn();

        events_tx.send(ChannelEvent::Opened).unwrap();
        events_tx
            .send(ChannelEvent::Frame(FrameBody::Method(Method::BasicAck(
                basic::Ack {
                    delivery_tag: 1,
                    multiple: false,
                },
            ))))
            .unwrap();
        events_tx
            .send(ChannelEvent::Frame(FrameBody::Header(ContentHeader::new(
                basic::CLASS_ID,
                0,
                Default::default(),
            ))))
            .unwrap();
        events_tx
            .send(ChannelEvent::Frame(FrameBody::Body(Payload::from_static(
                b"x",
            ))))
            .unwrap();
        events_tx.send(ChannelEvent::Closed).unwrap();

        for expected in ["opened", "method", "header", "body", "closed"] {
            assert_eq!(seen_rx.recv().await, Some(expected));
        }

        drop(events_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stops_when_handle_drops() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let engine = EntityEngine::new(Probe { seen: seen_tx }, events_rx, control_rx);
        let handle = engine.spawn();

        control_tx.send("ping").unwrap();
        assert_eq!(seen_rx.recv().await, Some("ping"));

        drop(control_tx);
        handle.await.unwrap();
        drop(events_tx);
    }
}
