use dotenvy::dotenv;
use tracing::{error, info, warn};
use uuid::Uuid;

use service::Marketplace;

fn init_logging() {
    // load .env first so RUST_LOG and SERVLINK_* take effect
    dotenv().ok();
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => common::utils::logging::init_logging_json(),
        _ => common::utils::logging::init_logging_default(),
    }
    info!(service = "servlink", event = "logger_init", "tracing subscriber initialized");
}

async fn run(cfg: configs::AppConfig) -> anyhow::Result<()> {
    service::runtime::ensure_env(&cfg).await?;
    let market = Marketplace::open(&cfg).await?;

    let stats = market.get_stats().await?;
    let dark_mode = market.dark_mode().await;
    info!(
        service = "servlink",
        event = "store_ready",
        users = stats.total_users,
        services = stats.total_services,
        appointments = stats.total_appointments,
        avg_rating = stats.avg_rating,
        dark_mode,
        "store loaded"
    );

    match market.current_user().await {
        Some(user) => {
            info!(service = "servlink", event = "session_restored", user_id = user.id, role = user.role.as_str(), "resuming session");
            let mut pending = market.start_notifications().await;
            let watcher = tokio::spawn(async move {
                while pending.changed().await.is_ok() {
                    let count = *pending.borrow_and_update();
                    info!(service = "servlink", event = "pending_appointments", count, "pending appointments");
                }
            });
            tokio::signal::ctrl_c().await?;
            market.stop_notifications().await;
            if let Err(e) = watcher.await {
                warn!(service = "servlink", event = "watcher_join_error", error = %e, "watcher task join error");
            }
        }
        None => {
            info!(service = "servlink", event = "no_session", "no persisted session; waiting for Ctrl+C");
            tokio::signal::ctrl_c().await?;
        }
    }
    Ok(())
}

fn main() -> std::process::ExitCode {
    init_logging();

    let instance_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(
            service = "servlink",
            event = "panic",
            %instance_id,
            pid,
            message = %info,
            "unhandled panic occurred"
        );
    }));

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "servlink", event = "config_invalid", error = %e, "failed to load config");
            return std::process::ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "servlink", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "servlink",
        event = "start",
        %instance_id,
        pid,
        version,
        data_dir = %cfg.storage.data_dir,
        latency_ms = cfg.runtime.latency_ms,
        "servlink starting"
    );

    rt.block_on(async move {
        match run(cfg).await {
            Ok(()) => {
                info!(service = "servlink", event = "stop", %instance_id, pid, "servlink stopped");
                std::process::ExitCode::SUCCESS
            }
            Err(e) => {
                error!(service = "servlink", event = "run_failed", error = %e, "servlink exited with error");
                std::process::ExitCode::FAILURE
            }
        }
    })
}
