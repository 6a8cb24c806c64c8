use crate::cli::ServeArgs;
use crate::infra::{build_processor, jurisdiction_catalog, AppState};
use crate::routes::with_status_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lead_qualifier::config::AppConfig;
use lead_qualifier::error::AppError;
use lead_qualifier::telemetry;
use lead_qualifier::workflows::intake::{
    JurisdictionCatalog, PollingWorker, ProcessingHistory, ShutdownSignal,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let history = Arc::new(ProcessingHistory::default());
    let catalog = Arc::new(jurisdiction_catalog(&config.pipeline));

    let app = with_status_routes(history.clone(), catalog.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = Arc::new(ShutdownSignal::new());
    let (stopped_tx, stopped_rx) = oneshot::channel();
    let worker = spawn_worker(config.clone(), history, catalog, shutdown.clone(), stopped_tx)?;

    readiness_flag.store(true, Ordering::Release);
    info!(
        ?config.environment,
        mode = config.pipeline.mode.label(),
        %addr,
        "lead qualifier ready"
    );

    let signal = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = stop_requested() => {}
                _ = stopped_rx => warn!("lead worker stopped, shutting down"),
            }
            signal.trigger();
        })
        .await;

    // The worker finishes its current record before exiting.
    shutdown.trigger();
    let worker_result = worker.join().unwrap_or_else(|_| {
        error!("lead worker panicked");
        Err(AppError::Io(std::io::Error::other("lead worker panicked")))
    });

    served?;
    worker_result
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
pub(crate) async fn stop_requested() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "could not listen for interrupts");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("interrupt received, shutting down"),
        _ = terminate => info!("terminate signal received, shutting down"),
    }
}

fn spawn_worker(
    config: AppConfig,
    history: Arc<ProcessingHistory>,
    catalog: Arc<JurisdictionCatalog>,
    shutdown: Arc<ShutdownSignal>,
    stopped: oneshot::Sender<()>,
) -> Result<JoinHandle<Result<(), AppError>>, AppError> {
    let handle = std::thread::Builder::new()
        .name("lead-worker".to_string())
        .spawn(move || {
            let result = build_processor(&config, catalog, history).map(|processor| {
                PollingWorker::new(Arc::new(processor), config.pipeline.poll_interval, shutdown)
                    .run();
            });
            if let Err(err) = &result {
                error!(error = %err, "lead worker could not start");
            }
            let _ = stopped.send(());
            result
        })?;
    Ok(handle)
}
