use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;

/// Upper bound on the number of workers a single run may start.
pub const MAX_WORKERS: usize = 4096;

/// How workers are scheduled.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One OS thread per worker.
    Threads,
    /// One Tokio task per worker.
    Tasks,
}

/// What fires the shutdown signal.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Fire as soon as every worker has started.
    Immediate,
    /// Wait for Ctrl+C or SIGTERM.
    Signal,
}

/// Runtime configuration for the `shutgate-demo` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults that reproduce the classic
/// two-worker scenario.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "shutgate-demo",
    version,
    about = "Spawn a group of workers, broadcast shutdown, and wait for all of them"
)]
pub struct CliArgs {
    /// Number of workers to start.
    ///
    /// Zero is allowed, in which case the coordinator returns immediately.
    ///
    /// Environment variable: `WORKERS`
    #[arg(long, env = "WORKERS", default_value_t = 2)]
    pub workers: usize,

    /// Whether workers run as OS threads or as Tokio tasks.
    ///
    /// Environment variable: `MODE`
    #[arg(long, env = "MODE", value_enum, default_value_t = Mode::Tasks)]
    pub mode: Mode,

    /// When to fire the shutdown signal.
    ///
    /// Environment variable: `TRIGGER`
    #[arg(long, env = "TRIGGER", value_enum, default_value_t = Trigger::Immediate)]
    pub trigger: Trigger,

    /// Race the workers for a single result instead of waiting for shutdown.
    ///
    /// The first result fires shutdown, so this cannot be combined with
    /// `--trigger signal`.
    ///
    /// Environment variable: `RACE`
    #[arg(long, env = "RACE", default_value_t = false)]
    pub race: bool,

    /// Seconds to wait for every worker to finish once shutdown is fired.
    /// In race mode this bounds the whole race.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub workers: usize,
    pub mode: Mode,
    pub trigger: Trigger,
    pub race: bool,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.workers > MAX_WORKERS {
            bail!(
                "WORKERS ({}) exceeds the maximum of {}",
                args.workers,
                MAX_WORKERS
            );
        }

        if args.race && args.workers == 0 {
            bail!("RACE requires at least one worker");
        }

        if args.race && args.trigger == Trigger::Signal {
            bail!("RACE fires shutdown on the first result and cannot wait for a signal");
        }

        if args.shutdown_timeout == 0 {
            bail!("SHUTDOWN_TIMEOUT must be greater than 0");
        }

        Ok(Self {
            workers: args.workers,
            mode: args.mode,
            trigger: args.trigger,
            race: args.race,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<DemoConfig> {
        let argv = core::iter::once("shutgate-demo").chain(args.iter().copied());
        let args = CliArgs::try_parse_from(argv)?;
        DemoConfig::try_from(args)
    }

    #[test]
    fn defaults_run_two_tasks_fired_immediately() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.mode, Mode::Tasks);
        assert_eq!(config.trigger, Trigger::Immediate);
        assert!(!config.race);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--workers",
            "16",
            "--mode",
            "threads",
            "--trigger",
            "signal",
            "--shutdown-timeout",
            "10",
        ])
        .unwrap();
        assert_eq!(config.workers, 16);
        assert_eq!(config.mode, Mode::Threads);
        assert_eq!(config.trigger, Trigger::Signal);
        assert!(!config.race);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn zero_workers_is_allowed() {
        assert_eq!(parse(&["--workers", "0"]).unwrap().workers, 0);
    }

    #[test]
    fn too_many_workers_is_rejected() {
        let err = parse(&["--workers", "4097"]).unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"));
        assert!(parse(&["--workers", "4096"]).is_ok());
    }

    #[test]
    fn race_without_workers_is_rejected() {
        let err = parse(&["--race", "--workers", "0"]).unwrap_err();
        assert!(err.to_string().contains("at least one worker"));
    }

    #[test]
    fn race_with_signal_trigger_is_rejected() {
        let err = parse(&["--race", "--trigger", "signal"]).unwrap_err();
        assert!(err.to_string().contains("cannot wait for a signal"));
        assert!(parse(&["--race", "--shutdown-timeout", "10"]).is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(parse(&["--shutdown-timeout", "0"]).is_err());
    }

    #[test]
    fn unknown_mode_is_rejected_by_the_parser() {
        assert!(parse(&["--mode", "fibers"]).is_err());
    }
}
