//! Canvas TCP Server
//!
//! Accepts telnet clients, registers each one as a session on the shared
//! hub and pumps bytes between the socket and the hub. Each connection
//! gets a reader loop (negotiation, input, inactivity timeout) and a
//! writer task draining the session's outbound channel.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::Instant;

use crate::config::Config;
use crate::core::Canvas;
use crate::error::ServerError;
use crate::hub::{Hub, RenderDue, SharedHub};
use crate::input;
use crate::renderer::disconnect_sequence;
use crate::session::{Outbound, SessionId, OUTPUT_QUEUE_CAPACITY};
use crate::telnet::{self, TelnetDecoder};

/// Farewell for connections refused at capacity
pub const TOO_MANY_USERS_MESSAGE: &str = "Too many users, please try again later.";

/// Farewell for sessions closed by the inactivity timeout
pub const TIMEOUT_MESSAGE: &str = "Disconnected due to inactivity.";

/// How long a closing connection may take to flush its queued output
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The canvas server
pub struct Server {
    config: Config,
    hub: SharedHub,
    render_rx: mpsc::UnboundedReceiver<RenderDue>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let (render_tx, render_rx) = mpsc::unbounded_channel();
        let hub = Hub::new(Canvas::new(), config.max_users, config.frame_interval(), render_tx);
        Self {
            config,
            hub: Arc::new(Mutex::new(hub)),
            render_rx,
        }
    }

    /// Bind the configured address and serve forever
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
        info!("Canvas server listening on {}", addr);
        self.serve(listener).await
    }

    /// Serve clients from an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let Server { config, hub, render_rx } = self;
        info!(
            "Idle timeout {}ms, max {} users, frame interval {}ms",
            config.timeout_ms, config.max_users, config.frame_interval_ms
        );

        tokio::spawn(render_loop(hub.clone(), render_rx));
        let idle_timeout = config.idle_timeout();

        loop {
            match listener.accept().await {
                Ok((socket, addr)) => {
                    info!("Client connected from {}", addr);
                    tokio::spawn(handle_client_connection(socket, addr.to_string(), hub.clone(), idle_timeout));
                }
                Err(e) => {
                    error!("Client accept error: {}", e);
                }
            }
        }
    }
}

/// Perform deferred renders as their timers run out
async fn render_loop(hub: SharedHub, mut render_rx: mpsc::UnboundedReceiver<RenderDue>) {
    while let Some(due) = render_rx.recv().await {
        hub.lock().await.fire_render(due);
    }
}

/// Handle a client connection (telnet user)
async fn handle_client_connection(socket: TcpStream, addr: String, hub: SharedHub, idle_timeout: Duration) {
    let (mut reader, mut writer) = socket.into_split();

    let (output_tx, mut output_rx) = mpsc::channel::<Outbound>(OUTPUT_QUEUE_CAPACITY);
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let registered = hub.lock().await.register(addr.clone(), output_tx, shutdown_tx);
    let Some(session_id) = registered else {
        warn!("Refusing {}: too many users", addr);
        let _ = writer.write_all(disconnect_sequence(TOO_MANY_USERS_MESSAGE).as_bytes()).await;
        let _ = writer.shutdown().await;
        return;
    };

    // Negotiate before reading anything
    if let Err(e) = writer.write_all(&telnet::handshake()).await {
        error!("Failed to send telnet negotiation to {}: {}", addr, e);
        hub.lock().await.disconnect(session_id, None);
        return;
    }

    let write_handle = tokio::spawn(async move {
        while let Some(message) = output_rx.recv().await {
            match message {
                Outbound::Data(bytes) => {
                    if let Err(e) = writer.write_all(&bytes).await {
                        error!("Client write error: {}", e);
                        break;
                    }
                }
                Outbound::Close => break,
            }
        }
        let _ = writer.shutdown().await;
    });

    hub.lock().await.schedule_render(session_id);

    read_loop(session_id, &mut reader, &hub, &mut shutdown_rx, idle_timeout).await;

    hub.lock().await.disconnect(session_id, None);
    // Let the farewell drain before the socket goes away
    let writer_abort = write_handle.abort_handle();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, write_handle).await.is_err() {
        warn!("Client {} stopped reading, dropping its pending output", addr);
        writer_abort.abort();
    }
}

async fn read_loop(
    session_id: SessionId,
    reader: &mut tokio::net::tcp::OwnedReadHalf,
    hub: &SharedHub,
    shutdown_rx: &mut oneshot::Receiver<()>,
    idle_timeout: Duration,
) {
    let mut decoder = TelnetDecoder::new();
    let mut buf = [0u8; 1024];

    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => {
                debug!("Session {} shutdown requested", session_id);
                break;
            }
            _ = &mut idle => {
                info!("Session {} timed out after {:?} of inactivity", session_id, idle_timeout);
                hub.lock().await.disconnect(session_id, Some(TIMEOUT_MESSAGE));
                break;
            }
            result = reader.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        info!("Session {} closed by peer", session_id);
                        break;
                    }
                    Ok(n) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);

                        let decoded = decoder.feed(&buf[..n]);
                        let events = input::decode_all(&decoded.data);

                        let mut hub = hub.lock().await;
                        hub.handle_negotiation(session_id, &decoded.commands);
                        hub.handle_input(session_id, &events);
                    }
                    Err(e) => {
                        error!("Client read error: {}", e);
                        break;
                    }
                }
            }
        }
    }
}
