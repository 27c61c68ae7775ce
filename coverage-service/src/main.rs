use crate::api::v1::Api;
use crate::config::get_service_config;
use crate::context::ServiceContext;
use crate::launcher::{LauncherCommand, QueueTaskSink, TaskLauncher};
use coverage_db::Store;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod api;
mod config;
mod context;
mod launcher;
mod metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional at runtime
    dotenv()
        .inspect_err(|err| println!("[WARN] reading .env files is failed with err {err}"))
        .ok();

    let config = get_service_config()?;

    // logs
    let log_path = config.log_path();
    std::fs::create_dir_all(&log_path)?;
    let (non_blocking_appender, _guard_stdout) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_filter(config.rust_log);
    let (file_appender, _guard_file) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_path, "coverage.log"));
    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(config.rust_log);
    tracing_subscriber::registry()
        .with(stdout_subscriber)
        .with(file_subscriber)
        .init();

    let store = Store::open(config.coverage_db_root.join("db"))?;

    let (launcher_tx, launcher_rx) = flume::bounded(255);
    let launcher_handle = tokio::spawn(TaskLauncher::new(launcher_rx).process());

    let bind_address = config.bind_address.clone();
    let context = ServiceContext::new(config, store, QueueTaskSink::new(launcher_tx.clone()));

    let (shutdown_api_tx, shutdown_api_rx) = tokio::sync::oneshot::channel();
    let api = Api::new(context.clone());
    let api_handle = tokio::spawn(async move {
        api
            .serve(&bind_address, shutdown_api_rx)
            .await
            .inspect_err(|err| error!("api server stopped with error: {err}"))
    });

    tokio::signal::ctrl_c().await?;
    info!("Termination signal received. Shutting down...");

    _ = shutdown_api_tx
        .send(())
        .inspect_err(|_err| error!("failed to shutdown api"));
    info!("waiting for api finish");
    _ = api_handle.await?.inspect(|_| info!("api has stopped"));

    _ = launcher_tx
        .send_async(LauncherCommand::Shutdown)
        .await
        .inspect_err(|err| error!("failed to shutdown task launcher: {err}"));
    info!("waiting for task launcher finish");
    _ = launcher_handle
        .await?
        .inspect(|_| info!("task launcher has stopped"));

    info!("{}", context.metrics().snapshot());
    info!("All tasks shut down.");
    Ok(())
}
