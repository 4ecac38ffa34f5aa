use crate::{AsyncWorkerGroup, SpawnProvider};
use futures::FutureExt;
use smol::Task;
use std::{panic::AssertUnwindSafe, thread};

/// An implementation of [`SpawnProvider`] using Smol's global executor.
///
/// Smol does not catch panics on our behalf, so every worker future is
/// wrapped in [`catch_unwind`] and a panic surfaces as a failed join.
///
/// [`catch_unwind`]: futures::FutureExt::catch_unwind
pub struct SmolSpawn;
impl SpawnProvider for SmolSpawn {
    type Handle = Task<thread::Result<()>>;

    fn spawn<F>(future: F) -> Self::Handle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        smol::spawn(AssertUnwindSafe(future).catch_unwind())
    }

    async fn join(handle: Self::Handle) -> bool {
        handle.await.is_ok()
    }
}

/// A worker group running on the [`smol`](https://docs.rs/smol) runtime.
pub type SmolWorkerGroup = AsyncWorkerGroup<SmolSpawn>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, FireStatus, Result};
    use core::time::Duration;
    use smol::Timer;

    #[test]
    fn two_workers_fired_immediately_after_spawn() -> Result<()> {
        smol::block_on(async {
            let group = SmolWorkerGroup::spawn(2).await;
            assert_eq!(group.fire_shutdown(), FireStatus::Fired);

            let report = group.await_all().await?;
            assert_eq!(report.spawned, 2);
            assert_eq!(report.completed, 2);
            Ok(())
        })
    }

    #[test]
    fn zero_workers_await_returns_immediately() -> Result<()> {
        smol::block_on(async {
            let group = SmolWorkerGroup::spawn(0).await;
            assert_eq!(group.await_all().await?.completed, 0);
            Ok(())
        })
    }

    #[test]
    fn many_workers_drain_after_one_fire() -> Result<()> {
        smol::block_on(async {
            let group = SmolWorkerGroup::spawn(256).await;
            let _ = group.fire_shutdown();
            assert_eq!(group.await_all().await?.completed, 256);
            Ok(())
        })
    }

    #[test]
    fn panicking_worker_is_counted_and_reported() {
        smol::block_on(async {
            let group = SmolWorkerGroup::spawn_with(2, |ctx| async move {
                ctx.shutdown().await;
                if ctx.id() == 1 {
                    panic!("worker 1 failed");
                }
            })
            .await;

            let _ = group.fire_shutdown();
            match group.await_all().await {
                Err(Error::WorkersPanicked { workers }) => assert_eq!(workers, vec![1]),
                other => panic!("expected WorkersPanicked, got {other:?}"),
            }
        });
    }

    #[test]
    fn race_returns_first_result_and_cancels_the_rest() -> Result<()> {
        smol::block_on(async {
            let outcome = SmolWorkerGroup::race(4, |ctx| async move {
                if ctx.id() != 3 {
                    Timer::after(Duration::from_secs(60)).await;
                }
                ctx.id() * 10
            })
            .await?;

            assert_eq!(outcome.winner, 3);
            assert_eq!(outcome.value, 30);
            assert_eq!(outcome.report.completed, 4);
            Ok(())
        })
    }
}
