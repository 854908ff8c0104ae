use std::future::Future;

use futures::stream::{self, StreamExt};

pub const DEFAULT_POOL_SIZE: usize = 5;

/// Runs one task per item with at most `size` tasks in flight.
///
/// New tasks are only started as running ones complete. `run` returns once
/// every task has finished; each task produces its own output, and the
/// outputs are merged afterwards, so no state is shared between tasks.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Output order is completion order, not item order.
    pub async fn run<I, F, Fut, T>(&self, items: I, task: F) -> Vec<T>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = Vec<T>>,
    {
        let per_task: Vec<Vec<T>> = stream::iter(items)
            .map(task)
            .buffer_unordered(self.size)
            .collect()
            .await;

        per_task.into_iter().flatten().collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
