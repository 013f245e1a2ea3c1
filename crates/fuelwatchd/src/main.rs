// # fuelwatchd - Fuel Availability Daemon
//
// Thin integration layer. All monitoring logic lives in fuelwatch-core.
//
// The fuelwatchd daemon is responsible for:
// 1. Reading configuration from arguments and environment variables
// 2. Initializing logging and the runtime
// 3. Registering feed sources and notifiers
// 4. Starting the watch engine and restarting it after failed cycles
//
// ## Usage
//
// ```bash
// fuelwatchd <fuel_type> [postal_code] [interval_secs]
// ```
//
// `fuel_type` is one of E10, SP98, SP95, E85, Gazole, GPLc (case-sensitive).
// Intervals below 60 seconds are raised to 60.
//
// ## Environment
//
// - `FUELWATCH_DATA_DIR`: Directory holding the change logs (default: data)
// - `FUELWATCH_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `FUELWATCH_FEED_URL`: Records search endpoint override
// - `FUELWATCH_NOTIFY_POSITIVE_CMD`: Program and arguments run when the fuel
//   becomes available, e.g. `aplay /usr/share/fuelwatch/yena.wav`
// - `FUELWATCH_NOTIFY_NEGATIVE_CMD`: Program and arguments run when the fuel
//   becomes unavailable
// - `FUELWATCH_RETRY_DELAY_SECS`: First delay after a failed cycle (default: 5)
// - `FUELWATCH_MAX_RETRY_DELAY_SECS`: Cap for the doubled delay (default: 300)
//
// The retry delay doubles on consecutive failures and drops back to
// `FUELWATCH_RETRY_DELAY_SECS` once a cycle completes.
//
// ## Example
//
// ```bash
// export FUELWATCH_DATA_DIR=/var/lib/fuelwatch
// export FUELWATCH_NOTIFY_POSITIVE_CMD="aplay /usr/share/fuelwatch/yena.wav"
//
// fuelwatchd Gazole 75001 120
// ```

use anyhow::Result;
use fuelwatch_core::changelog::FileChangeLog;
use fuelwatch_core::config::{FeedConfig, NotifierConfig, WatchConfig};
use fuelwatch_core::traits::SystemClock;
use fuelwatch_core::{EngineEvent, Registry, WatchEngine};
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const USAGE: &str = "Usage: fuelwatchd <fuel_type> [postal_code] [interval_secs]";

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum FuelwatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<FuelwatchExitCode> for ExitCode {
    fn from(code: FuelwatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration, as read from the command line and environment
#[derive(Debug)]
struct Config {
    fuel_type: String,
    postal_code: Option<String>,
    interval_secs: Option<u64>,
    data_dir: Option<String>,
    feed_url: Option<String>,
    positive_cmd: Vec<String>,
    negative_cmd: Vec<String>,
    retry_delay_secs: Option<u64>,
    max_retry_delay_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from process arguments and environment variables
    fn from_env() -> Result<Self> {
        let args: Vec<String> = env::args().skip(1).collect();
        Self::from_sources(&args, |key| env::var(key).ok())
    }

    fn from_sources(args: &[String], var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let Some(fuel_type) = args.first() else {
            anyhow::bail!("{}", USAGE);
        };
        if args.len() > 3 {
            anyhow::bail!("Too many arguments. {}", USAGE);
        }

        let interval_secs = args
            .get(2)
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    anyhow::anyhow!("Invalid interval '{}'. Please enter a number of seconds.", raw)
                })
            })
            .transpose()?;

        let command = |key: &str| {
            var(key)
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default()
        };

        Ok(Self {
            fuel_type: fuel_type.clone(),
            postal_code: args.get(1).cloned(),
            interval_secs,
            data_dir: var("FUELWATCH_DATA_DIR").filter(|s| !s.is_empty()),
            feed_url: var("FUELWATCH_FEED_URL").filter(|s| !s.is_empty()),
            positive_cmd: command("FUELWATCH_NOTIFY_POSITIVE_CMD"),
            negative_cmd: command("FUELWATCH_NOTIFY_NEGATIVE_CMD"),
            retry_delay_secs: parse_secs(&var, "FUELWATCH_RETRY_DELAY_SECS")?,
            max_retry_delay_secs: parse_secs(&var, "FUELWATCH_MAX_RETRY_DELAY_SECS")?,
            log_level: var("FUELWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration and build the engine configuration
    fn into_watch_config(self) -> Result<WatchConfig> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "FUELWATCH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        let mut config = WatchConfig::parse(
            &self.fuel_type,
            self.postal_code.as_deref(),
            self.interval_secs,
        )?;

        if let Some(data_dir) = self.data_dir {
            config = config.with_data_dir(data_dir);
        }

        if let Some(feed_url) = self.feed_url
            && let FeedConfig::Economie { url, .. } = &mut config.feed
        {
            *url = feed_url;
        }

        if !self.positive_cmd.is_empty() || !self.negative_cmd.is_empty() {
            config.notifier = NotifierConfig::Command {
                positive: self.positive_cmd,
                negative: self.negative_cmd,
            };
        }

        if let Some(delay) = self.retry_delay_secs {
            config.engine.retry_delay_secs = delay;
        }
        if let Some(max_delay) = self.max_retry_delay_secs {
            config.engine.max_retry_delay_secs = max_delay;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_secs(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    var(key)
        .map(|raw| {
            raw.parse::<u64>()
                .map_err(|_| anyhow::anyhow!("{} must be a number of seconds. Got: {}", key, raw))
        })
        .transpose()
}

fn main() -> ExitCode {
    // Load configuration from arguments and environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FuelwatchExitCode::ConfigError.into();
        }
    };

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Validate configuration
    let watch_config = match config.into_watch_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return FuelwatchExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FuelwatchExitCode::ConfigError.into();
    }

    info!("Starting fuelwatchd daemon");
    info!("Change log: {}", watch_config.log_path().display());

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FuelwatchExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(watch_config).await {
            Ok(()) => FuelwatchExitCode::CleanShutdown,
            Err(e) if is_config_error(&e) => {
                error!("Startup error: {}", e);
                FuelwatchExitCode::ConfigError
            }
            Err(e) => {
                error!("Daemon error: {}", e);
                FuelwatchExitCode::RuntimeError
            }
        }
    });

    result.into()
}

fn is_config_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<fuelwatch_core::Error>()
        .is_some_and(fuelwatch_core::Error::is_config)
}

/// Run the daemon
async fn run_daemon(config: WatchConfig) -> Result<()> {
    let registry = Registry::with_builtin_notifiers();

    #[cfg(feature = "economie")]
    {
        debug!("Registering economie feed source");
        fuelwatch_feed_economie::register(&registry);
    }

    let feed = registry.create_feed(&config.feed)?;
    let notifier = registry.create_notifier(&config.notifier)?;
    let change_log = FileChangeLog::new(config.log_path()).await?;

    info!("Feed source: {}", feed.source_name());
    info!("Notifier: {}", notifier.notifier_name());

    let mut backoff = Backoff::new(
        Duration::from_secs(config.engine.retry_delay_secs),
        Duration::from_secs(config.engine.max_retry_delay_secs),
    );

    let (mut engine, mut events) = WatchEngine::new(
        feed,
        Box::new(change_log),
        notifier,
        Box::new(SystemClock),
        config,
    )?;

    let cycle_completed = Arc::new(AtomicBool::new(false));
    let completed = cycle_completed.clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if matches!(event, EngineEvent::CycleCompleted { .. }) {
                completed.store(true, Ordering::Relaxed);
            }
            debug!("Engine event: {:?}", event);
        }
    });

    loop {
        match engine.run().await {
            Ok(()) => {
                info!("Shutting down daemon");
                return Ok(());
            }
            Err(e) if e.is_config() => return Err(e.into()),
            Err(e) => {
                if cycle_completed.swap(false, Ordering::Relaxed) {
                    backoff.reset();
                }
                let delay = backoff.next_delay();
                warn!("Engine stopped: {}. Restarting in {}s", e, delay.as_secs());
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown signal received during backoff");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Doubling retry delay, capped
#[derive(Debug)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the following one is doubled
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Start over after a healthy cycle
    fn reset(&mut self) {
        self.current = self.initial;
    }
}
