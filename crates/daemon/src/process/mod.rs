//! Daemon lifecycle: logging, state, the API task and shutdown.
//!
//! Exit codes: 3 when the graph store cannot be opened, 4 when the API
//! address cannot be bound, 5 when tasks outlive the shutdown deadline.

pub mod utils;

use std::net::SocketAddr;
use std::time::Duration;

use futures::future::join_all;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::http_server;
use crate::{ServiceConfig, ServiceState};

const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);
const LOG_FILE_PREFIX: &str = "secretgraph.log";

const EXIT_STORE_UNAVAILABLE: i32 = 3;
const EXIT_BIND_FAILED: i32 = 4;
const EXIT_SHUTDOWN_TIMEOUT: i32 = 5;

/// A running daemon. Dropping it leaves the service running.
pub struct ShutdownHandle {
    signal_task: JoinHandle<()>,
    tasks: Vec<JoinHandle<()>>,
    trigger: watch::Sender<()>,
    api_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Address the API server actually listens on.
    pub fn api_addr(&self) -> SocketAddr {
        self.api_addr
    }

    /// Stop accepting requests and let in-flight ones drain.
    pub fn shutdown(&self) {
        let _ = self.trigger.send(());
    }

    /// Resolve once a signal or [`shutdown`](Self::shutdown) stopped every task.
    pub async fn wait(self) {
        let _ = self.signal_task.await;

        if timeout(SHUTDOWN_DEADLINE, join_all(self.tasks)).await.is_err() {
            tracing::error!(
                deadline_secs = SHUTDOWN_DEADLINE.as_secs(),
                "tasks still running after shutdown deadline"
            );
            std::process::exit(EXIT_SHUTDOWN_TIMEOUT);
        }
    }
}

fn level_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber: compact stdout, plus a daily rolling file
/// when `log_dir` is set. The guards flush the writers on drop.
fn init_logging(config: &ServiceConfig) -> Vec<WorkerGuard> {
    let (stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let mut guards = vec![stdout_guard];

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout)
        .with_filter(level_filter(config.log_level));

    let file_layer = config.log_dir.as_ref().map(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: cannot create log directory {:?}: {}", dir, e);
        }
        let (file, file_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
        guards.push(file_guard);

        tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(level_filter(config.log_level))
    });

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

/// Open the graph store and bind the API listener, then serve in the
/// background.
///
/// Binding happens before this returns, so `api_port = 0` picks a free port
/// that [`ShutdownHandle::api_addr`] reports.
pub async fn start_service(config: &ServiceConfig) -> (ServiceState, ShutdownHandle) {
    let (signal_task, trigger, shutdown_rx) = utils::graceful_shutdown_blocker();

    let state = match ServiceState::from_config(config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "failed to open graph store");
            std::process::exit(EXIT_STORE_UNAVAILABLE);
        }
    };

    let requested = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let listener = match TcpListener::bind(requested).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %requested, error = %e, "failed to bind API address");
            std::process::exit(EXIT_BIND_FAILED);
        }
    };
    let api_addr = listener.local_addr().unwrap_or(requested);

    let mut api_config = http_server::Config::new(api_addr);
    api_config.log_level = config.log_level;
    let api_state = state.clone();
    let api_task = tokio::spawn(async move {
        if let Err(e) = http_server::serve(listener, api_config, api_state, shutdown_rx).await {
            tracing::error!(error = %e, "API server stopped");
        }
    });
    tracing::info!(%api_addr, "API server running");

    let handle = ShutdownHandle {
        signal_task,
        tasks: vec![api_task],
        trigger,
        api_addr,
    };
    (state, handle)
}

/// Run the daemon in the foreground until it is signalled to stop.
pub async fn spawn_service(config: &ServiceConfig) {
    let _guards = init_logging(config);
    let (_, handle) = start_service(config).await;
    handle.wait().await;
}
