use crate::dispatch::{DispatchQueue, DispatchStatsSnapshot};
use crate::error::RegistryError;
use crate::events::{EventBus, LockerEvent};
use crate::registry::{Locker, LockerRegistry, LockerStatus};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry and dispatch queue guarded together.
///
/// A single mutex covers both so a locker marked open and its queue entry
/// are never observed separately by concurrent requests.
struct ServiceInner {
    registry: LockerRegistry,
    queue: DispatchQueue,
}

/// Service object owning the locker registry and the dispatch queue.
///
/// Constructed once per process and handed to request handlers behind an
/// `Arc`; there is no ambient global state. Critical sections are short
/// and synchronous and are never held across an await point.
pub struct LockerService {
    inner: Mutex<ServiceInner>,
    event_bus: Arc<EventBus>,
}

/// Point-in-time aggregate view of the service
#[derive(Debug, Clone)]
pub struct ServiceStatsSnapshot {
    pub total: usize,
    pub closed: usize,
    pub open: usize,
    pub maintenance: usize,
    pub dispatch: DispatchStatsSnapshot,
}

impl LockerService {
    /// Create a service over `locker_count` lockers, all starting closed
    pub fn new(locker_count: u32, event_bus: Arc<EventBus>) -> Self {
        info!("Creating locker service with {} lockers", locker_count);

        Self {
            inner: Mutex::new(ServiceInner {
                registry: LockerRegistry::new(locker_count),
                queue: DispatchQueue::new(),
            }),
            event_bus,
        }
    }

    /// Request that a locker be opened.
    ///
    /// Marks the locker open in the registry and appends its id to the
    /// dispatch queue as one atomic step, then returns the updated record.
    /// Fails with `NotFound` for ids outside the configured range, in which
    /// case nothing is mutated and nothing is enqueued.
    pub fn request_open(&self, id: u32) -> Result<Locker, RegistryError> {
        let opened = {
            let mut inner = self.inner.lock();
            let locker = inner.registry.mark_opened(id)?;
            inner.queue.enqueue(id);
            locker
        };

        info!("Locker {} queued for opening", id);
        self.event_bus.publish(LockerEvent::OpenRequested {
            id,
            timestamp: Utc::now(),
        });

        Ok(opened)
    }

    /// Remove and return the oldest pending locker id for the poller.
    ///
    /// Returns `None` immediately when the queue is empty; the poller is
    /// expected to re-poll on its own schedule rather than block here.
    /// Registry state is not touched.
    pub fn next_pending(&self) -> Option<u32> {
        let next = self.inner.lock().queue.pop_next();

        if let Some(id) = next {
            debug!("Dispatching locker {} to poller", id);
            self.event_bus.publish(LockerEvent::Dispatched {
                id,
                timestamp: Utc::now(),
            });
        }

        next
    }

    /// The record for `id`, or `NotFound` when the id is outside the range
    pub fn get_locker(&self, id: u32) -> Result<Locker, RegistryError> {
        self.inner.lock().registry.get(id)
    }

    /// All locker records, ordered by id
    pub fn list_lockers(&self) -> Vec<Locker> {
        self.inner.lock().registry.list_all()
    }

    /// Aggregate counts by status plus dispatch queue counters
    pub fn stats(&self) -> ServiceStatsSnapshot {
        let inner = self.inner.lock();

        let mut closed = 0;
        let mut open = 0;
        let mut maintenance = 0;
        for locker in inner.registry.iter() {
            match locker.status {
                LockerStatus::Closed => closed += 1,
                LockerStatus::Open => open += 1,
                LockerStatus::Maintenance => maintenance += 1,
            }
        }

        ServiceStatsSnapshot {
            total: inner.registry.len(),
            closed,
            open,
            maintenance,
            dispatch: inner.queue.stats(),
        }
    }

    /// The event bus this service publishes to
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> LockerService {
        LockerService::new(15, Arc::new(EventBus::new(16)))
    }

    #[test]
    fn test_request_open_then_drain_queue() {
        let service = test_service();

        // requestOpen(5) -> status open, queue=[5]
        let opened = service.request_open(5).unwrap();
        assert_eq!(opened.status, LockerStatus::Open);
        assert!(opened.last_opened.is_some());
        assert_eq!(service.stats().dispatch.pending, 1);

        // requestOpen(5) again -> queue=[5,5]
        service.request_open(5).unwrap();
        assert_eq!(service.stats().dispatch.pending, 2);

        // Duplicates dequeue as separate entries in original order
        assert_eq!(service.next_pending(), Some(5));
        assert_eq!(service.stats().dispatch.pending, 1);
        assert_eq!(service.next_pending(), Some(5));
        assert_eq!(service.next_pending(), None);
    }

    #[test]
    fn test_fifo_across_distinct_ids() {
        let service = test_service();

        service.request_open(9).unwrap();
        service.request_open(2).unwrap();
        service.request_open(14).unwrap();

        assert_eq!(service.next_pending(), Some(9));
        assert_eq!(service.next_pending(), Some(2));
        assert_eq!(service.next_pending(), Some(14));
        assert_eq!(service.next_pending(), None);
    }

    #[test]
    fn test_request_open_out_of_range() {
        let service = test_service();

        assert_eq!(
            service.request_open(16),
            Err(RegistryError::NotFound { id: 16 })
        );

        // No mutation and no enqueue happened
        assert_eq!(service.stats().dispatch.pending, 0);
        assert_eq!(service.stats().dispatch.enqueued_total, 0);
        assert!(service.get_locker(16).is_err());
        assert_eq!(service.list_lockers().len(), 15);
    }

    #[test]
    fn test_next_pending_empty_does_not_mutate() {
        let service = test_service();

        let before = service.list_lockers();
        assert_eq!(service.next_pending(), None);
        let after = service.list_lockers();

        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.status, b.status);
            assert_eq!(a.last_opened, b.last_opened);
        }
        assert_eq!(service.stats().dispatch.dispatched_total, 0);
    }

    #[test]
    fn test_reads_are_idempotent() {
        let service = test_service();
        service.request_open(4).unwrap();

        for _ in 0..3 {
            assert_eq!(service.list_lockers().len(), 15);
            let locker = service.get_locker(4).unwrap();
            assert_eq!(locker.status, LockerStatus::Open);
        }
        // Reads did not consume the queue entry
        assert_eq!(service.stats().dispatch.pending, 1);
    }

    #[test]
    fn test_reopen_restamps_timestamp() {
        let service = test_service();

        let first = service.request_open(7).unwrap();
        let second = service.request_open(7).unwrap();

        assert!(second.last_opened.unwrap() >= first.last_opened.unwrap());
    }

    #[test]
    fn test_stats_counts_by_status() {
        let service = test_service();

        service.request_open(1).unwrap();
        service.request_open(2).unwrap();
        service.request_open(2).unwrap();

        let stats = service.stats();
        assert_eq!(stats.total, 15);
        assert_eq!(stats.open, 2);
        assert_eq!(stats.closed, 13);
        assert_eq!(stats.maintenance, 0);
        assert_eq!(stats.dispatch.pending, 3);
        assert_eq!(stats.dispatch.enqueued_total, 3);
    }

    #[test]
    fn test_events_published_on_open_and_dispatch() {
        let service = test_service();
        let mut receiver = service.event_bus().subscribe();

        service.request_open(6).unwrap();
        match receiver.try_recv().unwrap() {
            LockerEvent::OpenRequested { id, .. } => assert_eq!(id, 6),
            other => panic!("Unexpected event: {:?}", other),
        }

        service.next_pending().unwrap();
        match receiver.try_recv().unwrap() {
            LockerEvent::Dispatched { id, .. } => assert_eq!(id, 6),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_failed_open_publishes_nothing() {
        let service = test_service();
        let mut receiver = service.event_bus().subscribe();

        let _ = service.request_open(99);

        assert!(receiver.try_recv().is_err());
    }
}
