// # dnssyncd - DNS change-request worker
//
// Thin integration layer around dnssync-core. It:
// 1. Reads configuration from environment variables
// 2. Builds the record store and the Cloudflare provider
// 3. Resolves the zone once
// 4. Runs one reconciliation pass, or one pass per interval until signalled
//
// No DNS or retry logic lives here; it belongs in dnssync-core.
//
// ## Configuration
//
// ### Record Store
// - `DNSSYNC_STORE_TYPE`: `supabase` (default) or `file`
// - `SUPABASE_URL`, `SUPABASE_KEY`: project URL and key (supabase store)
// - `DNSSYNC_STORE_TABLE`: table name, default `records`
// - `DNSSYNC_STORE_PATH`: JSON file path (file store)
//
// ### DNS Provider
// - `CLOUDFLARE_API_TOKEN` (or `CLOUDFLARE_TOKEN`, `API_TOKEN`): API token
// - `ZONE_NAME` (or `CLOUDFLARE_ZONE_NAME`): zone, e.g. example.com
// - `CLOUDFLARE_ZONE_ID`: skip zone lookup
//
// ### Reconciliation
// - `DNSSYNC_DEFAULT_TTL`: TTL for rows without one (default 3600)
// - `DNSSYNC_DEFAULT_PROXIED`: proxy flag for rows without one (default false)
// - `DNSSYNC_DELETE_MISSING`: `pending` (default) or `applied`
// - `DNSSYNC_MODE`: `live` (default) or `dry-run`
// - `DNSSYNC_INTERVAL_SECS`: unset runs one pass and exits; set loops
// - `DNSSYNC_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export SUPABASE_URL=https://xyz.supabase.co
// export SUPABASE_KEY=service_key
// export CLOUDFLARE_API_TOKEN=your_token
// export ZONE_NAME=example.com
// export DNSSYNC_INTERVAL_SECS=300
//
// dnssyncd
// ```

use anyhow::{Context, Result};
use dnssync_core::config::DEFAULT_TABLE;
use dnssync_core::{
    FileRecordStore, MissingDeletePolicy, PassReport, ProviderAdapter, ProviderConfig,
    ReconcileEvent, Reconciler, RecordDefaults, RecordStore, StoreConfig, SyncConfig,
};
use dnssync_provider_cloudflare::CloudflareProvider;
use dnssync_store_supabase::SupabaseRecordStore;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (a pass could not run)
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    sync: SyncConfig,
    /// Loop period; `None` runs a single pass
    interval: Option<Duration>,
    log_level: String,
}

/// First non-empty value among `keys`
fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, value),
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    ///
    /// Required values that are missing are left empty here and reported by
    /// [`Config::validate`] with the variable name to set.
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_type =
            first_set(&lookup, &["DNSSYNC_STORE_TYPE"]).unwrap_or_else(|| "supabase".to_string());

        let store = match store_type.to_ascii_lowercase().as_str() {
            "supabase" => StoreConfig::Supabase {
                url: first_set(&lookup, &["SUPABASE_URL"]).unwrap_or_default(),
                api_key: first_set(&lookup, &["SUPABASE_KEY"]).unwrap_or_default(),
                table: first_set(&lookup, &["DNSSYNC_STORE_TABLE"])
                    .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            },
            "file" => StoreConfig::File {
                path: first_set(&lookup, &["DNSSYNC_STORE_PATH"]).unwrap_or_default(),
            },
            other => anyhow::bail!(
                "DNSSYNC_STORE_TYPE '{}' is not supported. \
                Supported types: supabase, file",
                other
            ),
        };

        let provider = ProviderConfig::Cloudflare {
            api_token: first_set(
                &lookup,
                &["CLOUDFLARE_API_TOKEN", "CLOUDFLARE_TOKEN", "API_TOKEN"],
            )
            .unwrap_or_default(),
            zone_name: first_set(&lookup, &["ZONE_NAME", "CLOUDFLARE_ZONE_NAME"])
                .unwrap_or_default(),
            zone_id: first_set(&lookup, &["CLOUDFLARE_ZONE_ID"]),
            api_base: None,
        };

        let mut sync = SyncConfig::new(store, provider);

        if let Some(ttl) = first_set(&lookup, &["DNSSYNC_DEFAULT_TTL"]) {
            sync.defaults.ttl = ttl.parse().with_context(|| {
                format!("DNSSYNC_DEFAULT_TTL must be a positive integer. Got: {}", ttl)
            })?;
        }
        if let Some(proxied) = first_set(&lookup, &["DNSSYNC_DEFAULT_PROXIED"]) {
            sync.defaults.proxied = parse_bool("DNSSYNC_DEFAULT_PROXIED", &proxied)?;
        }
        if let Some(policy) = first_set(&lookup, &["DNSSYNC_DELETE_MISSING"]) {
            sync.policy.missing_delete = policy
                .parse::<MissingDeletePolicy>()
                .context("Invalid DNSSYNC_DELETE_MISSING")?;
        }

        sync.dry_run = match first_set(&lookup, &["DNSSYNC_MODE"])
            .unwrap_or_else(|| "live".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "live" => false,
            "dry-run" | "dry_run" | "dryrun" => true,
            other => anyhow::bail!(
                "DNSSYNC_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        let interval = match first_set(&lookup, &["DNSSYNC_INTERVAL_SECS"]) {
            Some(secs) => {
                let secs: u64 = secs.parse().with_context(|| {
                    format!("DNSSYNC_INTERVAL_SECS must be an integer. Got: {}", secs)
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            sync,
            interval,
            log_level: first_set(&lookup, &["DNSSYNC_LOG_LEVEL"])
                .unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Names the environment variable to set for each missing value, then
    /// defers to the library's own validation.
    fn validate(&self) -> Result<()> {
        match &self.sync.store {
            StoreConfig::Supabase { url, api_key, .. } => {
                if url.is_empty() {
                    anyhow::bail!(
                        "SUPABASE_URL is required. \
                        Set it via: export SUPABASE_URL=https://your-project.supabase.co"
                    );
                }
                if api_key.is_empty() {
                    anyhow::bail!(
                        "SUPABASE_KEY is required. \
                        Set it via: export SUPABASE_KEY=your_key"
                    );
                }
            }
            StoreConfig::File { path } => {
                if path.is_empty() {
                    anyhow::bail!(
                        "DNSSYNC_STORE_PATH is required when DNSSYNC_STORE_TYPE=file. \
                        Set it via: export DNSSYNC_STORE_PATH=/var/lib/dnssync/requests.json"
                    );
                }
            }
            StoreConfig::Memory => {}
        }

        let ProviderConfig::Cloudflare {
            api_token,
            zone_name,
            ..
        } = &self.sync.provider;

        if api_token.is_empty() {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN is required. \
                Set it via: export CLOUDFLARE_API_TOKEN=your_token"
            );
        }
        if zone_name.is_empty() {
            anyhow::bail!(
                "ZONE_NAME is required. \
                Set it via: export ZONE_NAME=example.com"
            );
        }

        if let Some(interval) = self.interval
            && !(1..=86_400).contains(&interval.as_secs())
        {
            anyhow::bail!(
                "DNSSYNC_INTERVAL_SECS must be between 1 and 86400 seconds. Got: {}",
                interval.as_secs()
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.sync.validate()?;
        Ok(())
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!("Starting dnssyncd");
    info!(
        store = config.sync.store.type_name(),
        provider = config.sync.provider.type_name(),
        zone = config.sync.provider.zone_name(),
        mode = if config.sync.dry_run { "dry-run" } else { "live" },
        "Configuration loaded"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Build the record store named by the configuration
async fn build_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config {
        StoreConfig::Supabase { .. } => Arc::new(SupabaseRecordStore::from_config(config)?),
        StoreConfig::File { path } => Arc::new(FileRecordStore::new(path).await?),
        StoreConfig::Memory => Arc::new(dnssync_core::MemoryRecordStore::new()),
    };
    Ok(store)
}

/// Wire up components, resolving the zone once
async fn build_reconciler(
    config: &SyncConfig,
) -> Result<(Reconciler, mpsc::Receiver<ReconcileEvent>)> {
    let store = build_store(&config.store)
        .await
        .context("Failed to open record store")?;

    let provider = Arc::new(
        CloudflareProvider::from_config(&config.provider)
            .context("Failed to build Cloudflare provider")?,
    );

    let adapter = ProviderAdapter::connect(provider, config)
        .await
        .with_context(|| format!("Failed to resolve zone {}", config.provider.zone_name()))?;

    if adapter.is_dry_run() {
        warn!(
            "Running in DRY-RUN mode - no DNS changes will be made \
             and no row will be marked processed"
        );
    }

    Ok(Reconciler::new(store, adapter, &config.policy))
}

/// Run the daemon to completion
async fn run_daemon(config: Config) -> SyncExitCode {
    let (reconciler, events) = match build_reconciler(&config.sync).await {
        Ok(parts) => parts,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            return SyncExitCode::ConfigError;
        }
    };

    tokio::spawn(log_events(events));

    match config.interval {
        None => match reconciler.run_once().await {
            Ok(report) => {
                log_report(&report);
                SyncExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Pass failed: {}", e);
                SyncExitCode::RuntimeError
            }
        },
        Some(period) => run_loop(&reconciler, period).await,
    }
}

/// Run a pass every `period` until SIGTERM or SIGINT
///
/// A signal that arrives mid-pass takes effect once the pass finishes.
async fn run_loop(reconciler: &Reconciler, period: Duration) -> SyncExitCode {
    info!("Running a pass every {:?}", period);

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            received = &mut shutdown => {
                return match received {
                    Ok(name) => {
                        info!("Received shutdown signal: {}", name);
                        info!("Shutting down dnssyncd");
                        SyncExitCode::CleanShutdown
                    }
                    Err(e) => {
                        error!("Shutdown error: {}", e);
                        SyncExitCode::RuntimeError
                    }
                };
            }
            _ = ticker.tick() => {
                match reconciler.run_once().await {
                    Ok(report) => log_report(&report),
                    // The next tick retries; nothing was marked processed.
                    Err(e) => error!("Pass failed, retrying next interval: {}", e),
                }
            }
        }
    }
}

fn log_report(report: &PassReport) {
    let elapsed = report.finished_at - report.started_at;
    if report.failed() > 0 {
        warn!(
            applied = report.applied(),
            failed = report.failed(),
            rejected = report.rejected(),
            elapsed_ms = elapsed.num_milliseconds(),
            "Pass finished with failures; failed requests stay pending"
        );
    } else {
        info!(
            applied = report.applied(),
            planned = report.planned(),
            elapsed_ms = elapsed.num_milliseconds(),
            "Pass finished"
        );
    }
}

/// Drain reconcile events into the debug log
async fn log_events(mut events: mpsc::Receiver<ReconcileEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "Reconcile event");
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
