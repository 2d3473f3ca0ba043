//! Shared fixtures: a stand-in network server on a Unix socket and a
//! plugin wired to recording namespace and link doubles.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use hyperlocal::UnixServerExt;
use serde_json::Value;
use tokio::sync::oneshot;

use sdn_cni_core::namespace::NetNamespace;
use sdn_cni_core::testing::{EventLog, RecordingLinks, RecordingNamespace, record};
use sdn_cni_plugin::{CmdArgs, SdnCniPlugin, Transport};

/// Legacy IPv4-only result as the network server returns it.
pub const IPV4_RESULT: &str = r#"{
    "cniVersion": "0.2.0",
    "ip4": {
        "ip": "10.128.0.5/23",
        "gateway": "10.128.0.1",
        "routes": [{"dst": "10.128.0.0/14"}, {"dst": "224.0.0.0/4"}]
    },
    "dns": {}
}"#;

/// Legacy result carrying both families.
pub const DUAL_STACK_RESULT: &str = r#"{
    "cniVersion": "0.2.0",
    "ip4": {"ip": "10.128.0.5/23", "gateway": "10.128.0.1"},
    "ip6": {"ip": "fd01::5/64", "gateway": "fd01::1"}
}"#;

/// Network server double answering every request with a fixed response.
pub struct TestServer {
    pub socket: PathBuf,
    requests: Arc<Mutex<Vec<Value>>>,
    tx_stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    // TempDir's drop() deletes the directory.
    _tmpdir: tempfile::TempDir,
}

impl TestServer {
    /// Starts a server that logs `rpc` into `log` for every request.
    pub fn start(status: u16, body: &'static str, log: EventLog) -> Self {
        let tmpdir = tempfile::tempdir().unwrap();
        let socket = tmpdir.path().join("cni-server.sock");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (tx_stop, rx_stop) = oneshot::channel::<()>();
        let (tx_ready, rx_ready) = std::sync::mpsc::channel::<()>();

        let thread = {
            let socket = socket.clone();
            let requests = Arc::clone(&requests);
            std::thread::spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                runtime.block_on(async move {
                    let make_svc = make_service_fn(move |_stream: &tokio::net::UnixStream| {
                        let requests = Arc::clone(&requests);
                        let log = Arc::clone(&log);
                        async move {
                            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                                let requests = Arc::clone(&requests);
                                let log = Arc::clone(&log);
                                async move {
                                    assert_eq!(
                                        req.headers().get(CONTENT_TYPE).unwrap(),
                                        "application/json"
                                    );
                                    let bytes = hyper::body::to_bytes(req.into_body()).await.unwrap();
                                    record(&log, "rpc");
                                    requests
                                        .lock()
                                        .unwrap()
                                        .push(serde_json::from_slice(&bytes).unwrap());

                                    let mut resp = Response::new(Body::from(body));
                                    *resp.status_mut() = StatusCode::from_u16(status).unwrap();
                                    Ok::<_, Infallible>(resp)
                                }
                            }))
                        }
                    });

                    let server = Server::bind_unix(&socket)
                        .unwrap()
                        .serve(make_svc)
                        .with_graceful_shutdown(async {
                            let _ = rx_stop.await;
                        });
                    tx_ready.send(()).unwrap();
                    server.await.unwrap();
                });
            })
        };
        rx_ready.recv().unwrap();

        Self {
            socket,
            requests,
            tx_stop: Some(tx_stop),
            thread: Some(thread),
            _tmpdir: tmpdir,
        }
    }

    /// Returns the decoded JSON bodies received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // send() may fail if the server thread already panicked.
        if let Some(tx) = self.tx_stop.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Writes a server config file into a fresh directory.
pub fn server_config() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"mtu":1450,"serviceNetworkCIDR":"172.30.0.0/16","dnsIP":"172.30.0.10"}"#,
    )
    .unwrap();
    (dir, path)
}

/// Builds a plugin whose namespaces and links record into `links`' log.
pub fn plugin(socket: &Path, config_path: &Path, links: RecordingLinks) -> SdnCniPlugin {
    let log = links.log();
    let host = RecordingNamespace::at("host", "/proc/1/ns/net", links.log());
    SdnCniPlugin::new(
        Transport::new(socket),
        Box::new(host),
        Box::new(links),
        Box::new(move |path: &Path| {
            let ns: Box<dyn NetNamespace> =
                Box::new(RecordingNamespace::at("pod", path, Arc::clone(&log)));
            Ok(ns)
        }),
        config_path,
    )
}

/// Invocation arguments for a pod, with `config` on stdin.
pub fn cmd_args(command: &str, config: &str) -> CmdArgs {
    CmdArgs {
        container_id: "3f2a9c".into(),
        netns: PathBuf::from("/var/run/netns/pod-3f2a9c"),
        ifname: "eth0".into(),
        args: "K8S_POD_NAMESPACE=default;K8S_POD_NAME=web".into(),
        path: "/opt/cni/bin".into(),
        stdin_data: config.as_bytes().to_vec(),
        environment: vec![
            format!("CNI_COMMAND={command}"),
            "CNI_CONTAINERID=3f2a9c".into(),
            "CNI_NETNS=/var/run/netns/pod-3f2a9c".into(),
            "CNI_IFNAME=eth0".into(),
            "CNI_ARGS=K8S_POD_NAMESPACE=default;K8S_POD_NAME=web".into(),
            "CNI_PATH=/opt/cni/bin".into(),
        ],
    }
}

/// Network configuration requesting `version`.
pub fn net_config(version: &str) -> String {
    format!(r#"{{"cniVersion":"{version}","name":"sdn-cni","type":"sdn-cni"}}"#)
}

/// Position of the first event equal to `event`.
pub fn position(events: &[String], event: &str) -> Option<usize> {
    events.iter().position(|e| e == event)
}
