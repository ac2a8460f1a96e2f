//! Broadcast bus for session, status and endpoint notifications
//!
//! Services publish through a [`SharedEventBus`]; a publish never blocks and
//! never fails, even with no subscriber attached. The node itself keeps one
//! subscriber running: [`start_event_log_task`] writes every event to the
//! log.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{Event, EventMessage};
use crate::support::shutdown::ShutdownSignal;

/// Events buffered per subscriber before the oldest are dropped.
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: Event) {
        let message = EventMessage::new(event);
        let event_type = message.event.event_type();
        // `send` only fails when nobody listens.
        let delivered_to = self.sender.send(message).unwrap_or(0);
        debug!(event_type, delivered_to, "Event published");
    }

    pub fn subscribe(&self) -> EventSubscriber {
        let subscriber = EventSubscriber {
            receiver: self.sender.subscribe(),
        };
        debug!(subscribers = self.subscriber_count(), "Event subscriber attached");
        subscriber
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscription. Slow subscribers skip what they missed.
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
}

impl EventSubscriber {
    /// Next event; `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Event subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

/// Log every event published on `bus` until `shutdown` fires.
///
/// The subscription is taken before the task is spawned, so nothing
/// published after this call returns is missed.
pub fn start_event_log_task(bus: &EventBus, shutdown: ShutdownSignal) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    let stopped = shutdown.notified();

    tokio::spawn(async move {
        info!("📣 Event log started");
        let stopped = stopped.wait();
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                message = events.recv() => match message {
                    Some(message) => log_event(&message),
                    None => break,
                },
                _ = &mut stopped => break,
            }
        }
        info!("📣 Event log stopped");
    })
}

fn log_event(message: &EventMessage) {
    let event = &message.event;
    info!(
        event_id = %message.id,
        event_type = event.event_type(),
        direct_id = ?event.direct_id().map(ToString::to_string),
        evse_id = ?event.evse_id().map(ToString::to_string),
        "Event"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::DiscrepancyReportedEvent;
    use crate::domain::EvseId;
    use chrono::Utc;
    use std::time::Duration;

    fn discrepancy() -> Event {
        Event::DiscrepancyReported(DiscrepancyReportedEvent {
            evse_id: EvseId::parse("DE*GEF*E1").unwrap(),
            report: "wrong plug".into(),
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(discrepancy());
        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.event.event_type(), "discrepancy_reported");

        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::with_capacity(4);
        bus.publish(discrepancy());
        let mut late = bus.subscribe();
        assert!(late.try_recv().is_none());
    }

    #[test]
    fn lagging_subscriber_skips_to_the_oldest_kept_event() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();
        for _ in 0..3 {
            bus.publish(discrepancy());
        }
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn event_log_subscribes_until_shutdown() {
        let bus = EventBus::new();
        let shutdown = ShutdownSignal::new();
        let task = start_event_log_task(&bus, shutdown.clone());
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(discrepancy());
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("event log did not stop")
            .unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }
}
