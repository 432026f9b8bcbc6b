pub mod api;
pub mod models;
pub mod services;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

use api::AppState;
use models::AuthUser;
use services::{
    AppConfig, ConfigStore, GeminiAnalyzer, IdentityProvider, InFlightReports, MemoryStore,
    ProviderClient, ReportStore, StaticTokenAuth, SupabaseAuth, SupabaseStore,
};

static PROCESS_START: OnceLock<Instant> = OnceLock::new();
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn startup_elapsed_ms() -> u128 {
    PROCESS_START
        .get()
        .map(|t| t.elapsed().as_millis())
        .unwrap_or(0)
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

/// Initialize logging system with timestamped log files
pub fn init_logging() {
    let disable_file_log = env_flag("HUMYZE_DISABLE_FILE_LOG");
    let disable_cleanup = env_flag("HUMYZE_DISABLE_LOG_CLEANUP");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if disable_file_log {
        init_console_only_logging(env_filter);
        info!("File logging disabled via HUMYZE_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("HUMYZE_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("humyze_{}.log", timestamp);

    // One file per process; writes go through a background worker.
    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    info!("=== Humyze Started ===");
    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if !disable_cleanup {
        std::thread::spawn(move || {
            cleanup_old_logs(&logs_dir, 30);
        });
    }
}

fn get_logs_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(data_dir) => data_dir.join("humyze").join("logs"),
        None => PathBuf::from("logs"),
    }
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with("humyze_") && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

/// Console-only subscriber; also used by the CLI tools.
pub fn init_console_only_logging(env_filter: EnvFilter) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

/// Provider client for the configured Gemini model.
pub fn gemini_client(config: &AppConfig) -> ProviderClient {
    ProviderClient::new(
        config.gemini.base_url(),
        &config.gemini.model,
        config.secret("gemini"),
        config.gemini.timeout_secs,
    )
}

/// Wire store, identity and analyzer from configuration.
pub fn build_state(config: &AppConfig) -> AppState {
    let timeout = config.gemini.timeout_secs;

    let (store, auth): (Arc<dyn ReportStore>, Arc<dyn IdentityProvider>) = match (
        config.supabase.url.as_deref(),
        config.secret("supabase_anon"),
        config.secret("supabase_service_role"),
    ) {
        (Some(url), Some(anon), Some(service)) => {
            info!(url, "backend.supabase");
            (
                Arc::new(SupabaseStore::new(url, &service, timeout)),
                Arc::new(SupabaseAuth::new(url, &anon, timeout)),
            )
        }
        (url, _, _) => {
            if url.is_some() {
                warn!("Supabase URL set but anon/service keys missing; using in-memory store");
            }
            let mut auth = StaticTokenAuth::new();
            match config.secret("dev_token") {
                Some(token) => {
                    auth = auth.with_user(
                        &token,
                        AuthUser {
                            id: "dev-user".to_string(),
                            email: None,
                            name: Some("Developer".to_string()),
                        },
                    );
                    info!("backend.memory (HUMYZE_DEV_TOKEN accepted)");
                }
                None => warn!("backend.memory with no HUMYZE_DEV_TOKEN; every request will be rejected"),
            }
            (Arc::new(MemoryStore::new()), Arc::new(auth))
        }
    };

    if config.secret("gemini").is_none() {
        warn!("No Gemini API key configured; detection and humanization will fail");
    }

    AppState {
        store,
        auth,
        analyzer: Arc::new(GeminiAnalyzer::new(gemini_client(config))),
        in_flight: config
            .humanize
            .single_flight
            .then(|| Arc::new(InFlightReports::new())),
    }
}

pub async fn run() -> anyhow::Result<()> {
    PROCESS_START.get_or_init(Instant::now);

    let logging_t0 = Instant::now();
    init_logging();
    info!(
        startup_ms = startup_elapsed_ms(),
        logging_ms = logging_t0.elapsed().as_millis(),
        "logging.initialized"
    );

    let config_dir = ConfigStore::default_config_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;
    let config_store = ConfigStore::new(config_dir);
    let config = config_store.load_or_init().map_err(anyhow::Error::msg)?;
    info!(
        config = %config_store.config_file().display(),
        model = %config.gemini.model,
        single_flight = config.humanize.single_flight,
        "config.loaded"
    );

    let state = build_state(&config);
    let app = api::router(state, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!(
        startup_ms = startup_elapsed_ms(),
        "Listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;

    info!("=== Humyze Exited ===");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_newest_logs_only() {
        let dir = std::env::temp_dir().join(format!("humyze-logs-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        for i in 0..5 {
            fs::write(dir.join(format!("humyze_2026010{}_000000.log", i)), "x").unwrap();
        }
        fs::write(dir.join("other.log"), "x").unwrap();

        cleanup_old_logs(&dir, 2);

        let remaining = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("humyze_"))
            .count();
        assert_eq!(remaining, 2);
        assert!(dir.join("other.log").exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_state_without_supabase_uses_memory_backend() {
        let mut config = AppConfig::default();
        config.humanize.single_flight = true;
        config.api_keys.insert("dev_token".into(), "dev-token-from-file".into());

        let state = build_state(&config);
        assert!(state.in_flight.is_some());
        // HUMYZE_DEV_TOKEN in the environment would take precedence over the file value.
        if std::env::var("HUMYZE_DEV_TOKEN").is_err() {
            let user = state.auth.authenticate("dev-token-from-file").await.unwrap();
            assert_eq!(user.id, "dev-user");
        }
        assert!(state.store.list("dev-user").await.unwrap().is_empty());
    }
}
