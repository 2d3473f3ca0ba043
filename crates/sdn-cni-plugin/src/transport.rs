//! Request delivery to the per-host network server.
//!
//! The server listens on a root-owned Unix socket that only exists in the
//! host network namespace, so every call is made from inside it. Calls are
//! single-shot: a failed attach must surface immediately so the runtime can
//! tear the sandbox down instead of waiting on retries.

use std::path::PathBuf;

use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Request, StatusCode};
use hyperlocal::UnixConnector;

use sdn_cni_common::constants::SERVER_URL_PATH;
use sdn_cni_common::error::{CniError, Result};
use sdn_cni_common::types::CniRequest;
use sdn_cni_core::namespace::{self, NetNamespace};

/// HTTP-over-Unix-socket client for the network server.
#[derive(Debug, Clone)]
pub struct Transport {
    socket_path: PathBuf,
}

impl Transport {
    /// Creates a transport talking to the socket at `socket_path`.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Sends `request` from inside `host_ns` and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be serialized, the server is
    /// unreachable, or it answers with a non-success status. The status
    /// error carries the response body.
    pub fn post(&self, host_ns: &dyn NetNamespace, request: &CniRequest) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(request)?;
        let (status, body) = namespace::within(host_ns, || self.send(payload))?;

        if status != StatusCode::OK {
            return Err(CniError::ServerStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        tracing::debug!(response = %String::from_utf8_lossy(&body), "received response");
        Ok(body.to_vec())
    }

    /// Performs the HTTP exchange on a runtime bound to the calling thread,
    /// so the socket is opened in whatever namespace the thread is in.
    fn send(&self, payload: Vec<u8>) -> Result<(StatusCode, Bytes)> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CniError::Transport {
                message: format!("failed to start I/O runtime: {e}"),
            })?;

        runtime.block_on(async {
            let client = Client::builder().build::<_, Body>(UnixConnector);
            let uri: hyper::Uri = hyperlocal::Uri::new(&self.socket_path, SERVER_URL_PATH).into();
            let request = Request::post(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(payload))
                .map_err(|e| CniError::Transport {
                    message: e.to_string(),
                })?;

            tracing::debug!(socket = %self.socket_path.display(), "sending request");
            let response = client.request(request).await.map_err(|e| CniError::Transport {
                message: format!("{}: {e}", self.socket_path.display()),
            })?;
            let status = response.status();
            let body = hyper::body::to_bytes(response.into_body())
                .await
                .map_err(|e| CniError::Transport {
                    message: format!("failed to read CNI result: {e}"),
                })?;
            Ok((status, body))
        })
    }
}
