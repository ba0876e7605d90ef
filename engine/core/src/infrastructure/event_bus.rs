// Copyright (c) 2026 Caseflow Contributors
// SPDX-License-Identifier: AGPL-3.0

// Event Bus - Pub/Sub for Domain Events
//
// In-memory event streaming over tokio broadcast channels. Feeds the SSE
// endpoint and any in-process observers. Events are not persisted; the audit
// log is the durable record.

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::case::CaseId;
use crate::domain::events::{CaseEvent, DecisionEvent, TaskEvent};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Case(CaseEvent),
    Task(TaskEvent),
    Decision(DecisionEvent),
}

impl DomainEvent {
    pub fn case_id(&self) -> Option<CaseId> {
        match self {
            DomainEvent::Case(event) => Some(event.case_id()),
            DomainEvent::Task(event) => event.case_id(),
            DomainEvent::Decision(event) => Some(event.case_id()),
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Capacity is how many events are buffered before slow receivers lag
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_case_event(&self, event: CaseEvent) {
        self.publish(DomainEvent::Case(event));
    }

    pub fn publish_task_event(&self, event: TaskEvent) {
        self.publish(DomainEvent::Task(event));
    }

    pub fn publish_decision_event(&self, event: DecisionEvent) {
        self.publish(DomainEvent::Decision(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);
        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of a single case
    pub fn subscribe_case(&self, case_id: CaseId) -> CaseEventReceiver {
        CaseEventReceiver {
            receiver: self.sender.subscribe(),
            case_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Endless stream of events; lagged events are skipped
    pub fn into_stream(self) -> impl Stream<Item = DomainEvent> + Send + 'static {
        stream::unfold(self, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(EventBusError::Lagged(_)) => continue,
                    Err(EventBusError::Closed) => return None,
                }
            }
        })
    }
}

/// Receiver filtered to one case
pub struct CaseEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    case_id: CaseId,
}

impl CaseEventReceiver {
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.case_id() == Some(self.case_id) {
                return Ok(event);
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = DomainEvent> + Send + 'static {
        stream::unfold(self, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(EventBusError::Lagged(_)) => continue,
                    Err(EventBusError::Closed) => return None,
                }
            }
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::case::CaseStatus;
    use crate::domain::user::UserId;
    use chrono::Utc;

    fn status_changed(case_id: CaseId) -> CaseEvent {
        CaseEvent::CaseStatusChanged {
            case_id,
            from: CaseStatus::Draft,
            to: CaseStatus::PendingCaseCreationApproval,
            changed_by: UserId::parse("analyst1").unwrap(),
            changed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();
        let case_id = CaseId::new();

        bus.publish_case_event(status_changed(case_id));

        match receiver.recv().await.unwrap() {
            DomainEvent::Case(CaseEvent::CaseStatusChanged { case_id: id, to, .. }) => {
                assert_eq!(id, case_id);
                assert_eq!(to, CaseStatus::PendingCaseCreationApproval);
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_case_filtering() {
        let bus = EventBus::new(10);
        let wanted = CaseId::new();
        let mut receiver = bus.subscribe_case(wanted);

        bus.publish_case_event(status_changed(CaseId::new()));
        bus.publish_case_event(status_changed(wanted));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.case_id(), Some(wanted));
    }

    #[tokio::test]
    async fn test_case_stream_skips_other_cases() {
        use futures::StreamExt;

        let bus = EventBus::default();
        let wanted = CaseId::new();
        let stream = bus.subscribe_case(wanted).into_stream();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish_case_event(status_changed(CaseId::new()));
        bus.publish_case_event(status_changed(wanted));

        let mut stream = Box::pin(stream);
        let event = stream.next().await.unwrap();
        assert_eq!(event.case_id(), Some(wanted));
        drop(stream);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_ends_when_bus_is_dropped() {
        use futures::StreamExt;

        let bus = EventBus::new(4);
        let mut stream = Box::pin(bus.subscribe().into_stream());
        bus.publish_case_event(status_changed(CaseId::new()));
        drop(bus);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_wire_shape_is_flat_and_camel_case() {
        let case_id = CaseId::new();
        let value = serde_json::to_value(DomainEvent::Case(status_changed(case_id))).unwrap();

        assert_eq!(value["type"], "case");
        assert_eq!(value["event"], "CASE_STATUS_CHANGED");
        assert_eq!(value["caseId"], case_id.to_string());
        assert_eq!(value["to"], "PENDING_CASE_CREATION_APPROVAL");
        assert_eq!(value["changedBy"], "analyst1");
        assert!(value.get("case_id").is_none());

        let parsed: DomainEvent = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.case_id(), Some(case_id));
    }
}
