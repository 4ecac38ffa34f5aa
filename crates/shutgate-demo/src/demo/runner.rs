//! Drives one run of the demo: spawn, fire, drain.

use crate::demo::config::{DemoConfig, Mode, Trigger};
use anyhow::{Context, bail};
use core::time::Duration;
use shutgate::{RaceOutcome, ShutdownReport, ThreadWorkerGroup, TokioWorkerGroup};
use tokio::{signal, task, time};

// Per-rank delay for race workers; higher ids finish first.
const RACE_STEP: Duration = Duration::from_millis(10);

pub async fn run(config: DemoConfig) -> anyhow::Result<()> {
    if config.race {
        let outcome = match config.mode {
            Mode::Tasks => race_tasks(&config).await?,
            Mode::Threads => race_threads(&config).await?,
        };
        tracing::info!("Result: {} (from worker {})", outcome.value, outcome.winner);
        log_report(&outcome.report);
    } else {
        let report = match config.mode {
            Mode::Tasks => run_tasks(&config).await?,
            Mode::Threads => run_threads(&config).await?,
        };
        log_report(&report);
    }

    tracing::info!("all done!");
    Ok(())
}

async fn run_tasks(config: &DemoConfig) -> anyhow::Result<ShutdownReport> {
    let group = TokioWorkerGroup::spawn_with(config.workers, |ctx| async move {
        tracing::info!("[{}] is running", ctx.id());
        ctx.shutdown().await;
        tracing::info!("[{}] is done", ctx.id());
    })
    .await;
    tracing::info!("Started {} worker tasks", group.len());

    wait_for_trigger(config.trigger).await?;
    let _ = group.fire_shutdown();

    let report = time::timeout(config.shutdown_timeout, group.await_all())
        .await
        .with_context(|| {
            format!(
                "workers did not finish within {:?} of shutdown",
                config.shutdown_timeout
            )
        })??;
    Ok(report)
}

async fn run_threads(config: &DemoConfig) -> anyhow::Result<ShutdownReport> {
    let workers = config.workers;
    let group = task::spawn_blocking(move || {
        ThreadWorkerGroup::spawn_with(workers, |ctx| {
            tracing::info!("[{}] is running", ctx.id());
            ctx.wait_for_shutdown();
            tracing::info!("[{}] is done", ctx.id());
        })
    })
    .await??;
    tracing::info!("Started {} worker threads", group.len());

    wait_for_trigger(config.trigger).await?;
    let _ = group.fire_shutdown();

    let timeout = config.shutdown_timeout;
    let report = task::spawn_blocking(move || {
        if group.wait_timeout(timeout) {
            group.await_all().map(Some)
        } else {
            Ok(None)
        }
    })
    .await??;

    match report {
        Some(report) => Ok(report),
        None => bail!("workers did not finish within {timeout:?} of shutdown"),
    }
}

async fn race_tasks(config: &DemoConfig) -> anyhow::Result<RaceOutcome<usize>> {
    let workers = config.workers;
    let race = TokioWorkerGroup::race(workers, move |ctx| async move {
        tracing::info!("[{}] is running", ctx.id());
        time::sleep(race_delay(workers, ctx.id())).await;
        tracing::info!("[{}] is done", ctx.id());
        ctx.id() * ctx.id()
    });

    let outcome = time::timeout(config.shutdown_timeout, race)
        .await
        .with_context(|| {
            format!("race did not finish within {:?}", config.shutdown_timeout)
        })??;
    Ok(outcome)
}

async fn race_threads(config: &DemoConfig) -> anyhow::Result<RaceOutcome<usize>> {
    let workers = config.workers;
    let race = task::spawn_blocking(move || {
        ThreadWorkerGroup::race(workers, move |ctx| {
            tracing::info!("[{}] is running", ctx.id());
            // Losers give up as soon as the winner is known.
            if !ctx.wait_for_shutdown_timeout(race_delay(workers, ctx.id())) {
                tracing::info!("[{}] is done", ctx.id());
            }
            ctx.id() * ctx.id()
        })
    });

    // On timeout the blocking race is left running.
    let outcome = time::timeout(config.shutdown_timeout, race)
        .await
        .with_context(|| {
            format!("race did not finish within {:?}", config.shutdown_timeout)
        })???;
    Ok(outcome)
}

fn race_delay(workers: usize, id: usize) -> Duration {
    let rank = u32::try_from(workers - 1 - id).unwrap_or(u32::MAX);
    RACE_STEP.saturating_mul(rank)
}

async fn wait_for_trigger(trigger: Trigger) -> anyhow::Result<()> {
    match trigger {
        Trigger::Immediate => {
            tracing::info!("Firing shutdown immediately");
            Ok(())
        }
        Trigger::Signal => {
            tracing::info!("Waiting for Ctrl+C or SIGTERM to fire shutdown");
            shutdown_signal().await
        }
    }
}

async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install signal handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .context("failed to install Ctrl+C handler")
    };

    tokio::select! {
        res = ctrl_c => {
            res?;
            tracing::info!("Received Ctrl+C signal");
        },
        res = terminate => {
            res?;
            tracing::info!("Received SIGTERM signal");
        },
    }

    Ok(())
}

fn log_report(report: &ShutdownReport) {
    match report.drain {
        Some(drain) => tracing::info!(
            "{}/{} workers completed, drained in {:?}",
            report.completed,
            report.spawned,
            drain
        ),
        None => tracing::info!("{}/{} workers completed", report.completed, report.spawned),
    }
}
