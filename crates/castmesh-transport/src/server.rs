//! Propagation listener

use std::future::Future;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

use castmesh_core::{MeshError, MeshResult};
use castmesh_wire::{Propagate, PropagateServer};

use crate::{Security, TokenGuard};

/// Serve `service` on `listener` until `shutdown` resolves.
///
/// Secure mode terminates TLS and checks every call's bearer token before
/// it reaches the service.
pub async fn serve<S, F>(listener: TcpListener, service: S, security: &Security, shutdown: F) -> MeshResult<()>
where
    S: Propagate,
    F: Future<Output = ()> + Send,
{
    let local_addr = listener
        .local_addr()
        .map_err(|e| MeshError::Transport(e.to_string()))?;

    let (mut builder, guard) = match security {
        Security::Insecure => (Server::builder(), TokenGuard::disabled()),
        Security::Secure(link) => {
            let builder = Server::builder()
                .tls_config(link.tls.server_config())
                .map_err(|e| MeshError::Config(format!("server TLS settings: {e}")))?;
            (builder, TokenGuard::new(link.authority.clone()))
        }
    };

    info!(addr = %local_addr, secure = security.is_secure(), "propagation listener started");

    builder
        .add_service(PropagateServer::with_interceptor(service, guard))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
        .map_err(|e| MeshError::Transport(format!("propagation listener on {local_addr}: {e}")))?;

    info!(addr = %local_addr, "propagation listener stopped");
    Ok(())
}
