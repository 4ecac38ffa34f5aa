use crate::{AsyncWorkerGroup, SpawnProvider};
use tokio::task::JoinHandle;

/// An implementation of [`SpawnProvider`] using Tokio tasks.
///
/// Tasks are spawned with [`tokio::spawn`], so groups must be created from
/// within a Tokio runtime. Panics are caught by Tokio and surface as a failed
/// join.
pub struct TokioSpawn;
impl SpawnProvider for TokioSpawn {
    type Handle = JoinHandle<()>;

    fn spawn<F>(future: F) -> Self::Handle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future)
    }

    async fn join(handle: Self::Handle) -> bool {
        match handle.await {
            Ok(()) => true,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Worker task failed: {_e}");
                false
            }
        }
    }
}

/// A worker group running on the [`tokio`](https://docs.rs/tokio) runtime.
pub type TokioWorkerGroup = AsyncWorkerGroup<TokioSpawn>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, FireStatus, Result};
    use core::time::Duration;
    use futures::FutureExt;
    use portable_atomic::{AtomicUsize, Ordering};
    use std::{collections::HashSet, sync::Arc};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn two_workers_fired_immediately_after_spawn() -> Result<()> {
        let group = TokioWorkerGroup::spawn(2).await;
        assert_eq!(group.len(), 2);
        assert_eq!(group.fire_shutdown(), FireStatus::Fired);

        let report = group.await_all().await?;
        assert_eq!(report.spawned, 2);
        assert_eq!(report.completed, 2);
        assert!(report.drain.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn zero_workers_await_returns_immediately() -> Result<()> {
        let group = TokioWorkerGroup::spawn(0).await;
        assert!(group.is_empty());
        assert_eq!(group.await_all().await?.completed, 0);
        Ok(())
    }

    #[tokio::test]
    async fn current_thread_runtime_drains_every_worker() -> Result<()> {
        let group = TokioWorkerGroup::spawn(16).await;
        let _ = group.fire_shutdown();
        assert_eq!(group.await_all().await?.completed, 16);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn every_worker_reports_exactly_once() -> Result<()> {
        for n in [1, 7, 128] {
            let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
            let group = {
                let seen = Arc::clone(&seen);
                TokioWorkerGroup::spawn_with(n, move |ctx| {
                    let seen = Arc::clone(&seen);
                    async move {
                        ctx.shutdown().await;
                        seen.lock().push(ctx.id());
                    }
                })
                .await
            };

            let _ = group.fire_shutdown();
            assert_eq!(group.await_all().await?.completed, n);

            let ids: HashSet<_> = seen.lock().iter().copied().collect();
            assert_eq!(ids, (0..n).collect::<HashSet<_>>());
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn workers_stay_pending_until_fired() -> Result<()> {
        let exited = Arc::new(AtomicUsize::new(0));
        let group = {
            let exited = Arc::clone(&exited);
            TokioWorkerGroup::spawn_with(4, move |ctx| {
                let exited = Arc::clone(&exited);
                async move {
                    ctx.shutdown().await;
                    exited.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(exited.load(Ordering::SeqCst), 0);
        assert_eq!(group.completed(), 0);

        let _ = group.fire_shutdown();
        group.await_all().await?;
        assert_eq!(exited.load(Ordering::SeqCst), 4);
        Ok(())
    }

    fn counting_exits(
        n: usize,
        exited: &Arc<AtomicUsize>,
    ) -> impl Future<Output = TokioWorkerGroup> {
        let exited = Arc::clone(exited);
        TokioWorkerGroup::spawn_with(n, move |ctx| {
            let exited = Arc::clone(&exited);
            async move {
                ctx.shutdown().await;
                exited.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    async fn wait_for_exits(exited: &AtomicUsize, n: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while exited.load(Ordering::SeqCst) < n && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn abandoning_spawn_before_workers_start_releases_them() {
        let exited = Arc::new(AtomicUsize::new(0));

        // On a current-thread runtime the tasks cannot start until we yield,
        // so the first poll is still waiting on the startup latch.
        assert!(counting_exits(4, &exited).now_or_never().is_none());

        wait_for_exits(&exited, 4).await;
        assert_eq!(exited.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn dropping_an_unawaited_group_releases_its_workers() {
        let exited = Arc::new(AtomicUsize::new(0));
        let group = counting_exits(3, &exited).await;
        let gate = group.gate().clone();

        drop(group);
        assert!(gate.is_fired());

        wait_for_exits(&exited, 3).await;
        assert_eq!(exited.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn try_fire_shutdown_rejects_second_fire() -> Result<()> {
        let group = TokioWorkerGroup::spawn(2).await;
        group.try_fire_shutdown()?;
        assert!(matches!(group.try_fire_shutdown(), Err(Error::AlreadyFired)));
        group.await_all().await?;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panicking_worker_is_counted_and_reported() {
        let group = TokioWorkerGroup::spawn_with(3, |ctx| async move {
            ctx.shutdown().await;
            if ctx.id() == 0 {
                panic!("worker 0 failed");
            }
        })
        .await;

        let _ = group.fire_shutdown();
        match group.await_all().await {
            Err(Error::WorkersPanicked { workers }) => assert_eq!(workers, vec![0]),
            other => panic!("expected WorkersPanicked, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn race_returns_first_result_and_cancels_the_rest() -> Result<()> {
        let outcome = TokioWorkerGroup::race(3, |ctx| async move {
            if ctx.id() != 1 {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            (ctx.id() + 1) * 2
        })
        .await?;

        assert_eq!(outcome.winner, 1);
        assert_eq!(outcome.value, 4);
        assert_eq!(outcome.report.completed, 3);
        Ok(())
    }

    #[tokio::test]
    async fn race_with_no_workers_is_rejected() {
        let result = TokioWorkerGroup::race(0, |ctx| async move { ctx.id() }).await;
        assert!(matches!(result, Err(Error::NoWorkers)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn race_where_every_worker_panics_has_no_winner() {
        let result = TokioWorkerGroup::race(2, |ctx| async move {
            if ctx.id() < usize::MAX {
                panic!("no result");
            }
            ctx.id()
        })
        .await;
        assert!(matches!(result, Err(Error::NoWinner)));
    }
}
