//! Bounded-concurrency fan-out over a list of async tasks.
//!
//! The vendor enforces per-model concurrency quotas, so a turn that
//! dispatches one decision call per company must cap how many are in
//! flight at once. [`run_bounded`] is a sliding window: tasks start in
//! input order, at most `limit` run at any instant, and results come
//! back in input order regardless of completion order.
//!
//! Tasks are infallible at this layer -- a caller that wants partial
//! failure tolerance substitutes its fallback value inside the task
//! rather than aborting the whole batch.

use futures::StreamExt;
use futures::stream;

/// Run one async task per item with at most `limit` in flight.
///
/// Results are returned in the order of the input items. A `limit` of
/// zero is treated as one (fully serial).
pub async fn run_bounded<I, T, F, Fut>(items: I, limit: usize, task: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items.into_iter().map(task))
        .buffered(limit.max(1))
        .collect()
        .await
}
