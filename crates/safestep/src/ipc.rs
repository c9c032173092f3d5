//! Unix socket transport for the boundary.
//!
//! The daemon reads newline-delimited JSON [`ApiRequest`]s and answers each
//! with one [`ApiResponse`] line. A connection may carry any number of
//! requests. Dispatch runs on the blocking pool because storage calls are
//! synchronous.

use std::future::Future;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader as AsyncBufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use crate::api::{ApiRequest, ApiResponse, Dispatcher};
use crate::error::{Error, Result};

/// Bind the daemon socket, clearing a stale socket file left by a dead daemon.
///
/// # Errors
///
/// Returns an error if another daemon is listening on the path or the socket
/// cannot be bound.
pub async fn bind(socket_path: &Path) -> Result<UnixListener> {
    if tokio::fs::metadata(socket_path).await.is_ok() {
        if UnixStream::connect(socket_path).await.is_ok() {
            return Err(Error::ipc(format!(
                "socket {} is already in use; is the daemon already running?",
                socket_path.display()
            )));
        }
        debug!("Removing stale socket {}", socket_path.display());
        tokio::fs::remove_file(socket_path).await?;
    }

    if let Some(parent) = socket_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
    }

    let listener = UnixListener::bind(socket_path)?;
    info!("IPC server listening on {}", socket_path.display());
    Ok(listener)
}

/// Accept connections until `shutdown` resolves.
///
/// # Errors
///
/// Currently always returns `Ok`; accept failures are logged and skipped.
pub async fn serve(
    listener: UnixListener,
    dispatcher: Dispatcher,
    max_request_bytes: usize,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("IPC server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, dispatcher, max_request_bytes).await
                        {
                            error!("Error handling connection: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(
    stream: UnixStream,
    dispatcher: Dispatcher,
    max_request_bytes: usize,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = AsyncBufReader::new(read_half);
    let limit = u64::try_from(max_request_bytes)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = (&mut reader).take(limit).read_until(b'\n', &mut line).await?;
        if n == 0 {
            return Ok(());
        }

        if line.last() != Some(&b'\n') && line.len() > max_request_bytes {
            warn!("Request exceeds {} bytes; closing connection", max_request_bytes);
            let response = ApiResponse::from_error(&Error::validation(format!(
                "request exceeds {max_request_bytes} bytes"
            )));
            write_response(&mut write_half, &response).await?;
            return Ok(());
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ApiRequest>(text) {
            Ok(request) => {
                debug!("Received request: {} {}", request.method, request.path);
                let dispatcher = dispatcher.clone();
                tokio::task::spawn_blocking(move || dispatcher.handle(&request))
                    .await
                    .unwrap_or_else(|e| {
                        ApiResponse::from_error(&Error::internal(format!("dispatch failed: {e}")))
                    })
            }
            Err(e) => {
                ApiResponse::from_error(&Error::validation(format!("malformed request: {e}")))
            }
        };

        write_response(&mut write_half, &response).await?;
    }
}

async fn write_response(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    response: &ApiResponse,
) -> Result<()> {
    let mut bytes = serde_json::to_vec(response)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    Ok(())
}

/// Send one request to a running daemon and wait for its response.
///
/// # Errors
///
/// Returns a daemon-connect error if nothing is listening on the socket, or
/// an IPC error if the exchange fails.
pub fn send(socket_path: &Path, request: &ApiRequest) -> Result<ApiResponse> {
    let mut stream = StdUnixStream::connect(socket_path).map_err(|e| {
        let message = match e.kind() {
            std::io::ErrorKind::NotFound => "daemon is not running (socket not found)".to_string(),
            std::io::ErrorKind::ConnectionRefused => {
                "daemon is not running (connection refused)".to_string()
            }
            _ => e.to_string(),
        };
        Error::DaemonConnect {
            path: socket_path.to_path_buf(),
            message,
        }
    })?;

    let mut bytes = serde_json::to_vec(request)?;
    bytes.push(b'\n');
    stream.write_all(&bytes)?;

    let mut line = String::new();
    BufReader::new(&stream).read_line(&mut line)?;
    if line.trim().is_empty() {
        return Err(Error::ipc("daemon closed the connection without responding"));
    }

    Ok(serde_json::from_str(line.trim())?)
}
