//! TCP accept loop and shared server state.
//!
//! Graceful shutdown: on SIGINT the listener stops accepting, then
//! waits for in-flight connections to drain before returning.

use std::net::SocketAddr;
use std::sync::Arc;

use cinder_core::Instance;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::connection;
use crate::pubsub::PubSubBroker;

/// Everything a connection handler shares with its peers.
pub struct ServerContext {
    pub instance: Arc<Instance>,
    pub pubsub: Arc<PubSubBroker>,
}

impl ServerContext {
    pub fn new(instance: Arc<Instance>) -> Self {
        Self {
            instance,
            pubsub: Arc::new(PubSubBroker::new()),
        }
    }
}

/// Plain accept loop over an already-bound listener. Runs until the
/// task is dropped — integration tests use this directly so they keep
/// a handle on the instance (and its clock).
pub async fn serve(listener: TcpListener, ctx: Arc<ServerContext>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(e) = connection::handle(stream, ctx).await {
                error!("connection error from {peer}: {e}");
            }
        });
    }
}

/// Binds, serves, and shuts down cleanly on ctrl-c. Connections past
/// `max_clients` are dropped at accept time.
pub async fn run(
    addr: SocketAddr,
    instance: Arc<Instance>,
    max_clients: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    let ctx = Arc::new(ServerContext::new(instance));
    let semaphore = Arc::new(Semaphore::new(max_clients));

    info!("listening on {addr} (max {max_clients} connections)");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutdown signal received, draining connections...");
                break;
            }

            result = listener.accept() => {
                let (stream, peer) = result?;

                let permit = match Arc::clone(&semaphore).try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("connection limit reached, dropping {peer}");
                        drop(stream);
                        continue;
                    }
                };

                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    if let Err(e) = connection::handle(stream, ctx).await {
                        error!("connection error from {peer}: {e}");
                    }
                    drop(permit);
                });
            }
        }
    }

    // drain: every live handler holds a permit
    let _ = semaphore.acquire_many(max_clients as u32).await;
    info!("all connections drained, shutting down");
    Ok(())
}
