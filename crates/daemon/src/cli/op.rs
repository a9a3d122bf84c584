use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use tokio::sync::watch;
use url::Url;

use common::retry::{RetryBudget, RetryDriver, DEFAULT_MAX_RETRIES};
use secretgraph_daemon::http_server::api::client::{ApiClient, ApiError};
use secretgraph_daemon::state::AppState;

const DEFAULT_REMOTE: &str = "http://localhost:5001";

/// Resolve the remote URL for the API client.
///
/// Priority: explicit `--remote` flag > config file `api_port` > hardcoded 5001.
pub fn resolve_remote(
    explicit: Option<Url>,
    config_path: Option<PathBuf>,
) -> Result<Url, url::ParseError> {
    if let Some(url) = explicit {
        return Ok(url);
    }
    if let Ok(state) = AppState::load(config_path) {
        if let Ok(url) = Url::parse(&format!("http://localhost:{}", state.config.api_port)) {
            return Ok(url);
        }
    }
    Url::parse(DEFAULT_REMOTE)
}

#[derive(Clone)]
pub struct OpContext {
    /// API client (always initialized with default or custom URL)
    pub client: ApiClient,
    /// Optional custom state directory (defaults to ~/.secretgraph)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    /// Create context with custom remote URL and optional config path
    pub fn new(remote: Url, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(&remote)?,
            config_path,
        })
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

/// Error of an op that forwards one API request and prints the response.
#[derive(Debug, thiserror::Error)]
pub enum ApiOpError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("failed to render response: {0}")]
    Render(#[from] serde_json::Error),
}

/// Retry flags shared by mutating commands.
#[derive(Args, Debug, Clone)]
pub struct RetryArgs {
    /// Retries after the first attempt
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, conflicts_with = "unbounded")]
    pub max_retries: u32,

    /// Keep retrying until the write is accepted or Ctrl-C is pressed
    #[arg(long)]
    pub unbounded: bool,
}

impl RetryArgs {
    pub fn budget(&self) -> RetryBudget {
        if self.unbounded {
            RetryBudget::Unbounded
        } else {
            RetryBudget::Limited(self.max_retries)
        }
    }

    /// Build a driver that stops between attempts once Ctrl-C is pressed.
    ///
    /// Abort the returned task when the run is over.
    pub fn driver(&self) -> (RetryDriver, tokio::task::JoinHandle<()>) {
        let (cancel_tx, cancel_rx) = watch::channel(());
        let watcher = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    let _ = cancel_tx.send(());
                }
                Err(e) => {
                    // Dropping the sender would read as a cancel
                    tracing::warn!("failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        });

        (RetryDriver::new(self.budget()).with_cancel(cancel_rx), watcher)
    }
}

/// Implement [`Op`] for API request types that are sent as-is, printing the
/// response as pretty JSON.
#[macro_export]
macro_rules! api_op {
    ($($request:ty),* $(,)?) => {
        $(
            #[async_trait::async_trait]
            impl $crate::cli::op::Op for $request {
                type Error = $crate::cli::op::ApiOpError;
                type Output = String;

                async fn execute(
                    &self,
                    ctx: &$crate::cli::op::OpContext,
                ) -> Result<Self::Output, Self::Error> {
                    let response = ctx.client.call(self.clone()).await?;
                    Ok(serde_json::to_string_pretty(&response)?)
                }
            }
        )*
    };
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
