//! Roster daemon entrypoint.
//!
//! The one long-lived process on the machine: it serves store snapshots and
//! dashboard actions (pin, delete, change long-poll) over a Unix socket.
//! Mutations still go through the store's file lock like every hook
//! process, so the daemon needs no special standing as a writer.

use fs_err as fs;
use std::env;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use roster_core::{config, StoreConfig};
use roster_daemon_protocol::{
    parse_session_query, parse_session_target, parse_wait_timeout_ms, ErrorInfo, Method, Request,
    Response, MAX_REQUEST_BYTES, PROTOCOL_VERSION,
};

mod service;

use service::Service;

const SOCKET_NAME: &str = "daemon.sock";
const READ_TIMEOUT_SECS: u64 = 2;
const READ_CHUNK_SIZE: usize = 4096;

fn main() {
    init_logging();

    let store_config = match StoreConfig::resolve() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to resolve store configuration");
            std::process::exit(1);
        }
    };

    let socket_path = match daemon_socket_path() {
        Ok(path) => path,
        Err(err) => {
            error!(error = %err, "Failed to resolve daemon socket path");
            std::process::exit(1);
        }
    };

    if let Err(err) = prepare_socket_dir(&socket_path) {
        error!(error = %err, "Failed to prepare daemon socket directory");
        std::process::exit(1);
    }

    if let Err(err) = remove_existing_socket(&socket_path) {
        error!(error = %err, path = %socket_path.display(), "Failed to remove existing socket");
        std::process::exit(1);
    }

    let listener = match UnixListener::bind(&socket_path) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, path = %socket_path.display(), "Failed to bind daemon socket");
            std::process::exit(1);
        }
    };

    info!(
        socket = %socket_path.display(),
        store = %store_config.store_path.display(),
        "Roster daemon started"
    );

    let service = Arc::new(Service::new(store_config));

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let service = Arc::clone(&service);
                thread::spawn(|| handle_connection(stream, service));
            }
            Err(err) => {
                warn!(error = %err, "Failed to accept daemon connection");
            }
        }
    }
}

fn init_logging() {
    let debug_enabled = env::var("ROSTER_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn daemon_socket_path() -> roster_core::Result<PathBuf> {
    Ok(config::data_dir()?.join(SOCKET_NAME))
}

fn prepare_socket_dir(socket_path: &Path) -> std::io::Result<()> {
    let parent = socket_path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "socket path has no parent")
    })?;
    fs::create_dir_all(parent)
}

fn remove_existing_socket(socket_path: &Path) -> std::io::Result<()> {
    if socket_path.exists() {
        fs::remove_file(socket_path)?;
    }
    Ok(())
}

fn handle_connection(mut stream: UnixStream, service: Arc<Service>) {
    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            warn!(code = %err.code, message = %err.message, "Failed to read request");
            let response = Response::error_with_info(None, err);
            let _ = write_response(&mut stream, response);
            return;
        }
    };

    tracing::debug!(method = ?request.method, id = ?request.id, "Daemon request received");
    let response = handle_request(request, service);
    let _ = write_response(&mut stream, response);
}

fn read_request(stream: &mut UnixStream) -> Result<Request, ErrorInfo> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(READ_TIMEOUT_SECS)));

    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err(ErrorInfo::new(
                        "request_too_large",
                        "request exceeded maximum size",
                    ));
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(ErrorInfo::new("read_timeout", "request timed out"));
            }
            Err(err) => {
                return Err(ErrorInfo::new(
                    "read_error",
                    format!("failed to read request: {}", err),
                ));
            }
        }
    }

    if buffer.is_empty() {
        return Err(ErrorInfo::new("empty_request", "request body was empty"));
    }

    let newline_index = buffer.iter().position(|b| *b == b'\n');
    let request_bytes = match newline_index {
        Some(index) => &buffer[..index],
        None => buffer.as_slice(),
    };

    if request_bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ErrorInfo::new("empty_request", "request body was empty"));
    }

    serde_json::from_slice(request_bytes).map_err(|err| {
        ErrorInfo::new(
            "invalid_json",
            format!("request was not valid JSON: {}", err),
        )
    })
}

fn handle_request(request: Request, service: Arc<Service>) -> Response {
    if request.protocol_version != PROTOCOL_VERSION {
        return Response::error(
            request.id,
            "protocol_mismatch",
            "unsupported protocol version",
        );
    }

    match request.method {
        Method::GetHealth => Response::ok(
            request.id,
            serde_json::json!({
                "status": "ok",
                "pid": std::process::id(),
                "version": env!("CARGO_PKG_VERSION"),
                "protocol_version": PROTOCOL_VERSION,
            }),
        ),
        Method::GetSessions => {
            let query = match parse_session_query(request.params) {
                Ok(query) => query,
                Err(err) => return Response::error_with_info(request.id, err),
            };
            let sessions = service.sessions_snapshot(&query);
            let count = sessions.len();
            match serde_json::to_value(&sessions) {
                Ok(value) => {
                    tracing::debug!(sessions = count, "Sessions snapshot");
                    Response::ok(request.id, value)
                }
                Err(err) => Response::error(
                    request.id,
                    "serialization_error",
                    format!("Failed to serialize sessions: {}", err),
                ),
            }
        }
        Method::TogglePin => {
            let target = match parse_session_target(request.params) {
                Ok(target) => target,
                Err(err) => return Response::error_with_info(request.id, err),
            };
            match service.toggle_pin(&target.session_id) {
                Ok(Some(pinned)) => Response::ok(
                    request.id,
                    serde_json::json!({ "found": true, "pinned": pinned }),
                ),
                Ok(None) => Response::ok(request.id, serde_json::json!({ "found": false })),
                Err(err) => Response::error(
                    request.id,
                    "store_error",
                    format!("Failed to toggle pin: {}", err),
                ),
            }
        }
        Method::DeleteSession => {
            let target = match parse_session_target(request.params) {
                Ok(target) => target,
                Err(err) => return Response::error_with_info(request.id, err),
            };
            match service.delete_session(&target.session_id) {
                Ok(deleted) => {
                    Response::ok(request.id, serde_json::json!({ "deleted": deleted }))
                }
                Err(err) => Response::error(
                    request.id,
                    "store_error",
                    format!("Failed to delete session: {}", err),
                ),
            }
        }
        Method::WaitForChange => {
            let timeout_ms = match parse_wait_timeout_ms(request.params) {
                Ok(timeout_ms) => timeout_ms,
                Err(err) => return Response::error_with_info(request.id, err),
            };
            let changed = service.wait_for_change(Duration::from_millis(timeout_ms));
            Response::ok(request.id, serde_json::json!({ "changed": changed }))
        }
    }
}

fn write_response(stream: &mut UnixStream, response: Response) -> std::io::Result<()> {
    serde_json::to_writer(&mut *stream, &response)?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    Ok(())
}
