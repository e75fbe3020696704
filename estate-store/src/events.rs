use estate_shared::DomainEvent;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Fans domain events out to whoever listens (SSE clients, notifiers).
///
/// Publishing never fails: with no subscribers the event is logged and dropped.
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: DomainEvent) {
        let name = event.name();
        let job_id = event.job_id();
        match self.tx.send(event) {
            Ok(receivers) => info!(event = name, ?job_id, receivers, "Published domain event"),
            Err(_) => debug!(event = name, ?job_id, "No subscribers for domain event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let publisher = EventPublisher::new(8);
        let mut rx = publisher.subscribe();

        let job_id = Uuid::new_v4();
        publisher.publish(DomainEvent::JobCreated { job_id, client_id: None, timestamp: 0 });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.job_id(), Some(job_id));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let publisher = EventPublisher::new(8);
        publisher.publish(DomainEvent::JobCreated { job_id: Uuid::new_v4(), client_id: None, timestamp: 0 });
    }
}
