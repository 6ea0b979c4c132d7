//! Bounded, paced work queue.
//!
//! Items start in enqueue order. At most `concurrent` handlers are in
//! flight; free slots are filled in bursts, and bursts are at least
//! `interval` apart so a remote session quota is not exceeded. `run`
//! resolves once every item has settled, which is the drain signal.
//!
//! Handlers return values, not errors: whatever a handler produces is
//! handed to `on_settled`, and one handler's result never affects another.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Counts describing a drained queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub enqueued: usize,
    pub settled: usize,
    /// Number of dispatch bursts that started at least one item
    pub bursts: usize,
    /// Highest number of handlers in flight at once
    pub peak_in_flight: usize,
}

#[derive(Debug, Clone)]
pub struct WorkQueue {
    concurrent: usize,
    interval: Duration,
}

impl WorkQueue {
    /// `concurrent` is clamped to at least 1. A zero `interval` disables pacing.
    pub fn new(concurrent: usize, interval: Duration) -> Self {
        Self {
            concurrent: concurrent.max(1),
            interval,
        }
    }

    pub fn concurrent(&self) -> usize {
        self.concurrent
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Drive every item through `handler`, passing each output to `on_settled`
    /// as soon as it is ready.
    pub async fn run<I, F, Fut, T, S>(&self, items: Vec<I>, handler: F, mut on_settled: S) -> QueueSummary
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = T>,
        S: FnMut(T),
    {
        let mut summary = QueueSummary {
            enqueued: items.len(),
            ..Default::default()
        };
        let mut pending: VecDeque<I> = items.into();
        let mut in_flight = FuturesUnordered::new();

        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let paced = !self.interval.is_zero();

        while !pending.is_empty() || !in_flight.is_empty() {
            let slots = self.concurrent.saturating_sub(in_flight.len());
            let can_dispatch = !pending.is_empty() && slots > 0;

            tokio::select! {
                biased;

                Some(output) = in_flight.next(), if !in_flight.is_empty() => {
                    summary.settled += 1;
                    on_settled(output);
                }

                _ = ticker.tick(), if can_dispatch && paced => {
                    dispatch(&mut pending, &mut in_flight, slots, &handler, &mut summary);
                }

                _ = std::future::ready(()), if can_dispatch && !paced => {
                    dispatch(&mut pending, &mut in_flight, slots, &handler, &mut summary);
                }
            }
        }

        tracing::debug!(
            enqueued = summary.enqueued,
            settled = summary.settled,
            bursts = summary.bursts,
            "queue drained"
        );
        summary
    }
}

fn dispatch<I, F, Fut>(
    pending: &mut VecDeque<I>,
    in_flight: &mut FuturesUnordered<Fut>,
    slots: usize,
    handler: &F,
    summary: &mut QueueSummary,
) where
    F: Fn(I) -> Fut,
    Fut: Future,
{
    let take = slots.min(pending.len());
    for item in pending.drain(..take) {
        in_flight.push(handler(item));
    }
    summary.bursts += 1;
    summary.peak_in_flight = summary.peak_in_flight.max(in_flight.len());
    tracing::debug!(started = take, in_flight = in_flight.len(), waiting = pending.len(), "dispatch burst");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_every_item_settles_once() {
        let queue = WorkQueue::new(3, Duration::from_secs(1));
        let mut seen = Vec::new();
        let summary = queue
            .run(
                (0..10).collect(),
                |n: u32| async move {
                    tokio::time::sleep(Duration::from_millis(100 * u64::from(n % 3))).await;
                    n
                },
                |n| seen.push(n),
            )
            .await;

        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(summary.enqueued, 10);
        assert_eq!(summary.settled, 10);
        assert!(summary.peak_in_flight <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bursts_respect_interval() {
        let queue = WorkQueue::new(2, Duration::from_secs(20));
        let origin = Instant::now();
        let starts = RefCell::new(Vec::new());
        let summary = queue
            .run(
                (0..5).collect(),
                |_: u32| {
                    starts.borrow_mut().push(origin.elapsed());
                    async {}
                },
                |_| {},
            )
            .await;

        let starts = starts.into_inner();
        assert_eq!(starts.len(), 5);
        assert_eq!(summary.bursts, 3);
        // two at t=0, two at t=20s, one at t=40s
        assert_eq!(starts[0], Duration::ZERO);
        assert_eq!(starts[1], Duration::ZERO);
        assert!(starts[2] >= Duration::from_secs(20));
        assert!(starts[4] >= Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_unpaced() {
        let queue = WorkQueue::new(1, Duration::ZERO);
        let origin = Instant::now();
        let summary = queue
            .run((0..4).collect(), |_: u32| async {}, |_| {})
            .await;
        assert_eq!(summary.settled, 4);
        assert!(origin.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_empty_queue_drains_immediately() {
        let summary = WorkQueue::new(5, Duration::from_secs(20))
            .run(Vec::<u32>::new(), |n| async move { n }, |_| {})
            .await;
        assert_eq!(summary, QueueSummary::default());
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        assert_eq!(WorkQueue::new(0, Duration::ZERO).concurrent(), 1);
    }
}
