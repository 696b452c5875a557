use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tracing::info;

use crate::access_log::AccessLog;
use crate::config::Config;
use crate::docroot::DocumentRoot;
use crate::http::connection::Connection;
use crate::http::handler::Handler;

/// Binds a listener with `SO_REUSEADDR` set and the given backlog.
pub fn bind(addr: SocketAddr, backlog: i32) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let addr = tokio::net::lookup_host(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("Cannot resolve {}", cfg.server.listen_addr))?
        .next()
        .with_context(|| format!("No address for {}", cfg.server.listen_addr))?;

    let listener = bind(addr, cfg.server.backlog)?;
    info!("Listening on {}", addr);

    let access_log = Arc::new(AccessLog::open(&cfg.logging.access_log).await.with_context(
        || format!("Cannot open access log {}", cfg.logging.access_log.display()),
    )?);
    let handler = Arc::new(Handler::new(
        DocumentRoot::new(cfg.static_files.root.clone()),
        cfg.idle_timeout(),
    ));

    serve(listener, handler, access_log, cfg.idle_timeout()).await
}

/// Accept loop: one task per connection, running until the listener fails.
pub async fn serve(
    listener: TcpListener,
    handler: Arc<Handler>,
    access_log: Arc<AccessLog>,
    idle_timeout: std::time::Duration,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let handler = handler.clone();
        let access_log = access_log.clone();
        tokio::spawn(async move {
            let conn = Connection::new(
                socket,
                peer.ip().to_string(),
                handler,
                access_log,
                idle_timeout,
            );
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
