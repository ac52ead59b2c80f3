//! Loopback vaultd stand-in for tests

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use vaultctl_core::protocol::{VaultRequest, VaultResponse};

/// Spawn a loopback server that answers every request through the
/// given handler, mirroring how vaultd answers one request per
/// connection.
pub(crate) async fn spawn_server<F>(handler: F) -> SocketAddr
where
    F: Fn(&VaultRequest) -> VaultResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = handler.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if socket.read_to_end(&mut buf).await.is_err() {
                    return;
                }
                let Ok(request) = serde_json::from_slice::<VaultRequest>(&buf) else {
                    return;
                };
                let response = handler(&request);
                let bytes = serde_json::to_vec(&response).unwrap();
                let _ = socket.write_all(&bytes).await;
            });
        }
    });

    addr
}

/// An address nothing is listening on
pub(crate) async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
