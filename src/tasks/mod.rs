//! Fire-and-forget task dispatch.
//!
//! Everything downstream of a watch event (interest update, metrics
//! recompute) runs through a [`TaskDispatcher`]. Production wiring spawns
//! onto the tokio runtime so the write path never waits on analytics;
//! tests use [`InlineDispatcher`] to run the same futures to completion
//! deterministically. Dispatched futures own their error handling: they
//! log failures and never propagate them.

use async_trait::async_trait;
use futures::future::BoxFuture;

#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn dispatch(&self, task: BoxFuture<'static, ()>);
}

/// Spawns tasks onto the tokio runtime and returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnDispatcher;

#[async_trait]
impl TaskDispatcher for SpawnDispatcher {
    async fn dispatch(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}

/// Awaits tasks in place. Test-only determinism: after `dispatch` returns,
/// the background work has completed.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

#[async_trait]
impl TaskDispatcher for InlineDispatcher {
    async fn dispatch(&self, task: BoxFuture<'static, ()>) {
        task.await;
    }
}
