use std::net::SocketAddr;
use std::sync::Arc;

use kube::Client;
use tokio::{task::JoinHandle, try_join};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aws::{InMemoryLambda, LambdaApi};
use crate::config::{Backend, ControllerConfig};
use crate::controller::references::KubeReferenceReader;
use crate::controller::{Engine, run_controllers};
use crate::web::run_http_server;

/// Compute the HTTP bind address based on config.
pub fn compute_http_addr(cfg: &ControllerConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

/// The Lambda control plane selected by `LAMBDA_CTRL_BACKEND`.
pub async fn build_backend(cfg: &ControllerConfig) -> anyhow::Result<Arc<dyn LambdaApi>> {
    match cfg.backend {
        Backend::Memory => {
            warn!("using the in-memory Lambda backend; nothing reaches AWS");
            Ok(Arc::new(InMemoryLambda::new(
                cfg.aws.account_id.clone(),
                cfg.aws.region.clone(),
            )))
        }
        #[cfg(feature = "aws-sdk")]
        Backend::Aws => Ok(Arc::new(
            crate::aws::sdk::SdkLambda::from_settings(&cfg.aws).await,
        )),
        #[cfg(not(feature = "aws-sdk"))]
        Backend::Aws => anyhow::bail!(
            "LAMBDA_CTRL_BACKEND=aws requires building with the `aws-sdk` feature"
        ),
    }
}

/// Spawn one controller per kind.
pub fn spawn_controllers(client: Client, engine: Arc<Engine>) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_controllers(client, engine).await })
}

pub fn spawn_http(addr: SocketAddr, shutdown: CancellationToken) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_http_server(addr, shutdown).await })
}

/// Cancel `shutdown` on Ctrl-C.
pub fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });
}

/// Start the controllers and the HTTP server and wait until both finish.
pub async fn run_all(client: Client, cfg: ControllerConfig) -> anyhow::Result<()> {
    let http_addr = compute_http_addr(&cfg);
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let api = build_backend(&cfg).await?;
    let reader = Arc::new(KubeReferenceReader::new(client.clone()));
    let engine = Arc::new(Engine::new(api, reader, cfg, shutdown.clone()));

    let controllers = spawn_controllers(client, engine);
    let http = spawn_http(http_addr, shutdown.clone());

    let (c_res, h_res) = try_join!(controllers, http)?;
    // Either side ending stops the other.
    shutdown.cancel();
    c_res?;
    h_res?;
    Ok(())
}
