//! Per-slug single-flight coordination.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Flights = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Tracks slugs that currently have a synchronization in progress.
///
/// Callers for the same slug queue behind one async mutex; the entry is
/// dropped from the map once the last holder or waiter is gone.
#[derive(Default, Clone)]
pub struct SingleFlight {
    flights: Flights,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other caller holds `slug`, then hold it.
    pub async fn acquire(&self, slug: &str) -> FlightGuard {
        let mutex = Arc::clone(self.flights.entry(slug.to_string()).or_default().value());
        let lock = mutex.lock_owned().await;

        FlightGuard { slug: slug.to_string(), flights: Arc::clone(&self.flights), lock: Some(lock) }
    }

    /// Number of slugs with a holder or waiters.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }
}

pub struct FlightGuard {
    slug: String,
    flights: Flights,
    lock: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // Release first so the guard's own handle is not counted.
        self.lock.take();
        self.flights
            .remove_if(&self.slug, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let flights = SingleFlight::new();
        {
            let _guard = flights.acquire("news").await;
            assert_eq!(flights.in_flight(), 1);
        }
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_slug_is_serialized() {
        let flights = SingleFlight::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let flights = flights.clone();
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let _guard = flights.acquire("club").await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_slugs_do_not_block() {
        let flights = SingleFlight::new();
        let _a = flights.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), flights.acquire("b")).await;
        assert!(b.is_ok());
        assert_eq!(flights.in_flight(), 2);
    }
}
