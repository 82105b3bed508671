use crate::{
    merge, Config, Engine, Error, MissingMaterializationItem, ResolveRequest, ResolveResult,
    ResolveSuccess, Resolver,
};
use materializations::{MaterializationStore, ReadOp, WriteOp};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// StickyResolver wraps a resolution Engine with a MaterializationStore.
///
/// When the Engine reports missing materializations, StickyResolver reads
/// them from the store, merges them into the request, and retries until the
/// Engine succeeds. Materialization updates of a successful resolution are
/// written to the store by a background task, which the caller never awaits.
#[derive(Clone)]
pub struct StickyResolver {
    engine: Arc<dyn Engine>,
    store: Arc<dyn MaterializationStore>,
    config: Config,
    // Background writes which are in-flight.
    writes: TaskTracker,
    // False once shutdown begins. Held while spawning a write,
    // so that every spawned write is awaited by shutdown.
    accepting: Arc<Mutex<bool>>,
    // Cancelled if background writes outlive a shutdown.
    cancel: CancellationToken,
}

impl StickyResolver {
    pub fn new(
        engine: Arc<dyn Engine>,
        store: Arc<dyn MaterializationStore>,
        config: Config,
    ) -> Self {
        Self {
            engine,
            store,
            config,
            writes: TaskTracker::new(),
            accepting: Arc::new(Mutex::new(true)),
            cancel: CancellationToken::new(),
        }
    }

    /// Resolve `request`, consulting the store for any materializations
    /// which the Engine requires but `request` doesn't supply.
    pub async fn resolve_sticky(&self, request: ResolveRequest) -> Result<ResolveSuccess, Error> {
        let max_depth = self.config.max_depth.max(1);
        let mut request = request;

        for depth in 0..max_depth {
            let response = self.engine.resolve(&request).await?;

            match response.result {
                Some(ResolveResult::Success(success)) => {
                    if !success.updates.is_empty() {
                        self.spawn_write(success.updates.iter().cloned().map(WriteOp::from).collect());
                    }
                    return Ok(success);
                }
                // A retry wouldn't be attempted, so don't read for one.
                Some(ResolveResult::MissingMaterializations(_)) if depth + 1 == max_depth => break,
                Some(ResolveResult::MissingMaterializations(items)) => {
                    request = self.fill_missing(request, items, depth).await?;
                }
                None => {
                    return Err(Error::Protocol(
                        "response has neither a success nor missing materializations",
                    ))
                }
            }
        }

        Err(Error::MaxDepthExceeded(max_depth))
    }

    // Read missing `items` from the store, and return the next request to attempt.
    async fn fill_missing(
        &self,
        request: ResolveRequest,
        items: Vec<MissingMaterializationItem>,
        depth: usize,
    ) -> Result<ResolveRequest, Error> {
        let ops: Vec<ReadOp> = items
            .iter()
            .filter(|item| !merge::is_satisfied(&request.materializations, item))
            .map(ReadOp::from)
            .collect();

        // The engine is asking again for materializations it already has.
        if ops.is_empty() {
            return Err(Error::Unresolved(items));
        }
        tracing::debug!(depth, ?ops, "reading missing materializations");

        let results = self.store.read(ops).await?;

        let mut materializations = request.materializations.clone();
        if !merge::merge_read_results(&mut materializations, &results) {
            return Err(Error::Unresolved(items));
        }

        Ok(request.with_materializations(materializations))
    }

    fn spawn_write(&self, ops: Vec<WriteOp>) {
        let count = ops.len();

        let accepting = self.accepting.lock().unwrap();
        if !*accepting {
            tracing::debug!(count, "resolver is shut down; dropping materialization updates");
            return;
        }
        let (store, cancel, timeout) = (
            self.store.clone(),
            self.cancel.clone(),
            self.config.write_timeout,
        );

        self.writes.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::warn!(count, "cancelled materialization write at shutdown");
                }
                result = tokio::time::timeout(timeout, store.write(ops)) => match result {
                    Ok(Ok(())) => tracing::debug!(count, "wrote materialization updates"),
                    Ok(Err(err)) if err.is_not_supported() => {
                        tracing::debug!(count, "materialization store doesn't support writes")
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(?err, count, "failed to write materialization updates")
                    }
                    Err(_elapsed) => {
                        tracing::warn!(?timeout, count, "timed out writing materialization updates")
                    }
                },
            }
        });
    }

    /// Shut down the resolver: wait up to `grace` for background writes,
    /// cancel any which remain, and then close the store.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), Error> {
        *self.accepting.lock().unwrap() = false;
        self.writes.close();

        if tokio::time::timeout(grace, self.writes.wait()).await.is_err() {
            tracing::warn!(
                pending = self.writes.len(),
                ?grace,
                "materialization writes outlived the shutdown grace period"
            );
            self.cancel.cancel();
            self.writes.wait().await;
        }

        self.store.close().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Resolver for StickyResolver {
    async fn resolve_sticky(&self, request: ResolveRequest) -> Result<ResolveSuccess, Error> {
        StickyResolver::resolve_sticky(self, request).await
    }
}
