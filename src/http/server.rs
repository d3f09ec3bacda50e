//! HTTP server: accept loop, admission and per-connection serving.
//!
//! # Responsibilities
//! - Accept TCP connections sequentially on a single task
//! - Apply the admission gate before any byte is read
//! - Hand admitted connections to the fixed-size worker pool
//! - Parse one request per connection, dispatch it, write the response, close
//! - Stop accepting on [`HttpServer::stop`] and drain in-flight work
//!
//! # Design Decisions
//! - Rejected connections get their 503 from a detached task so a slow
//!   client cannot stall the accept loop
//! - The connection guard travels with the socket and is dropped as soon as
//!   the response is written, whatever the outcome
//! - Closing sockets linger in background tasks, at most `MAX_LINGERING` at
//!   once; past that they are closed immediately
//! - One request per connection; every response carries `Connection: close`

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::http::dispatcher::Dispatcher;
use crate::http::parser::RequestParser;
use crate::http::response::Response;
use crate::lifecycle::Shutdown;
use crate::net::{AdmissionGate, ConnectionGuard, Listener, ListenerError, WorkerPool};
use crate::observability::metrics;

/// How long a closing connection waits for the peer to finish sending.
const LINGER: Duration = Duration::from_secs(1);

/// Upper bound on sockets lingering in the background at once.
const MAX_LINGERING: usize = 1024;

/// Errors that end [`HttpServer::run`].
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// State shared by the accept loop and every worker.
pub struct ServerState {
    config: ServerConfig,
    gate: Arc<AdmissionGate>,
    running: AtomicBool,
    lingering: Arc<Semaphore>,
    parser: RequestParser,
    dispatcher: Dispatcher,
}

impl ServerState {
    fn new(config: ServerConfig) -> Self {
        Self {
            gate: Arc::new(AdmissionGate::new(config.listener.max_connections)),
            running: AtomicBool::new(true),
            lingering: Arc::new(Semaphore::new(MAX_LINGERING)),
            parser: RequestParser::new(&config.limits),
            dispatcher: Dispatcher::new(config.storage.web_root.clone()),
            config,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// An admitted connection waiting for a worker.
struct Admitted {
    stream: TcpStream,
    peer: SocketAddr,
    guard: ConnectionGuard,
}

/// Minimal origin HTTP server.
pub struct HttpServer {
    state: Arc<ServerState>,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a server from a validated configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: Arc::new(ServerState::new(config)),
            shutdown: Shutdown::new(),
        }
    }

    /// Run the accept loop until [`HttpServer::stop`] is called.
    ///
    /// Returns once the listener is closed and every admitted connection has
    /// been served.
    pub async fn run(&self, listener: Listener) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let workers = &self.state.config.workers;
        tracing::info!(
            address = %addr,
            pool_size = workers.pool_size,
            max_connections = self.state.gate.max_connections(),
            web_root = %self.state.config.storage.web_root.display(),
            "HTTP server starting"
        );

        let state = Arc::clone(&self.state);
        let pool = WorkerPool::spawn(workers.pool_size, workers.queue_capacity, move |conn| {
            serve_connection(Arc::clone(&state), conn)
        });

        let mut signal = self.shutdown.subscribe();
        loop {
            let accepted = tokio::select! {
                _ = signal.recv() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => self.admit(&pool, stream, peer).await,
                Err(e) => {
                    if !self.state.is_running() {
                        break;
                    }
                    tracing::error!(error = %e, "Accept failed");
                }
            }
        }

        drop(listener);
        tracing::info!(
            in_flight = self.state.gate.in_flight(),
            "Listener closed, draining connections"
        );
        pool.shutdown().await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    async fn admit(&self, pool: &WorkerPool<Admitted>, stream: TcpStream, peer: SocketAddr) {
        let Some(guard) = self.state.gate.try_admit() else {
            metrics::record_rejected();
            tracing::warn!(
                peer = %peer,
                max_connections = self.state.gate.max_connections(),
                "Connection rejected: server at capacity"
            );
            match Arc::clone(&self.state.lingering).try_acquire_owned() {
                Ok(permit) => {
                    tokio::spawn(reject(stream, peer, permit));
                }
                Err(_) => reject_now(&stream, peer),
            }
            return;
        };

        metrics::set_active_connections(self.state.gate.in_flight());
        let conn = Admitted {
            stream,
            peer,
            guard,
        };
        if pool.submit(conn).await.is_err() {
            // The returned connection is dropped here, releasing its slot.
            tracing::warn!(peer = %peer, "Worker pool closed, dropping connection");
        }
    }

    /// Stop accepting connections. Already admitted connections still finish.
    pub fn stop(&self) {
        self.state.running.store(false, Ordering::Release);
        self.shutdown.trigger();
        tracing::info!("HTTP server stop requested");
    }

    /// Connections currently admitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.state.gate.in_flight()
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }
}

async fn reject(mut stream: TcpStream, peer: SocketAddr, _permit: OwnedSemaphorePermit) {
    if let Err(e) = Response::service_unavailable().write_to(&mut stream).await {
        tracing::debug!(peer = %peer, error = %e, "Failed to write 503");
    }
    let _ = stream.shutdown().await;
    drain(&mut stream).await;
}

/// Best-effort 503 without a task: a fresh socket's send buffer takes the
/// whole response in one non-blocking write.
fn reject_now(stream: &TcpStream, peer: SocketAddr) {
    if let Err(e) = stream.try_write(&Response::service_unavailable().to_bytes()) {
        tracing::debug!(peer = %peer, error = %e, "Failed to write 503");
    }
}

/// Let the peer finish sending in the background, if there is room.
fn linger(state: &ServerState, mut stream: TcpStream) {
    if let Ok(permit) = Arc::clone(&state.lingering).try_acquire_owned() {
        tokio::spawn(async move {
            drain(&mut stream).await;
            drop(permit);
        });
    }
}

/// Discard unread input until the peer closes, so dropping the socket does
/// not reset it before the response is read.
async fn drain<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut sink = [0u8; 1024];
    let _ = tokio::time::timeout(LINGER, async {
        while matches!(reader.read(&mut sink).await, Ok(n) if n > 0) {}
    })
    .await;
}

async fn serve_connection(state: Arc<ServerState>, conn: Admitted) {
    let Admitted {
        mut stream,
        peer,
        guard,
    } = conn;
    let span = tracing::info_span!("connection", id = %guard.id(), peer = %peer);

    async {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let start = Instant::now();

        let outcome = match state.parser.parse(&mut reader).await {
            Ok(None) => {
                tracing::debug!("Empty request, closing connection");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse request");
                Some(("-".to_string(), e.into_response()))
            }
            Ok(Some(request)) => {
                let span = tracing::info_span!(
                    "request",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = request.uri()
                );
                let method = request.method().to_string();
                state
                    .dispatcher
                    .dispatch(&request)
                    .instrument(span)
                    .await
                    .map(|response| (method, response))
            }
        };

        if let Some((method, response)) = outcome {
            if let Err(e) = response.write_to(&mut writer).await {
                tracing::warn!(error = %e, "Failed to write response");
            }
            metrics::record_request(&method, response.status().as_u16(), start);
        }

        if let Err(e) = writer.shutdown().await {
            tracing::debug!(error = %e, "Failed to close connection");
        }
    }
    .instrument(span)
    .await;

    drop(guard);
    metrics::set_active_connections(state.gate.in_flight());
    linger(&state, stream);
}
