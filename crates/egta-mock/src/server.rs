use std::io::{self, Read};
use std::net::{SocketAddr, ToSocketAddrs};
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{error, info, warn};

use crate::request::{MockMethod, MockRequest, MockResponse};
use crate::service::MockService;

/// A [`MockService`] served over HTTP from a background thread.
///
/// Dereferences to the service for seeding and failure injection. Dropping
/// the server stops the thread.
pub struct MockServer {
    service: Arc<MockService>,
    server: Arc<Server>,
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Serves a fresh service on an ephemeral loopback port.
    pub fn start() -> io::Result<Self> {
        Self::start_with(MockService::new())
    }

    pub fn start_with(service: MockService) -> io::Result<Self> {
        Self::bind("127.0.0.1:0", service)
    }

    pub fn bind(listen: impl ToSocketAddrs, service: MockService) -> io::Result<Self> {
        let server = Server::http(listen)
            .map_err(|err| io::Error::new(io::ErrorKind::AddrNotAvailable, err.to_string()))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "mock server is not on an ip socket"))?;
        let server = Arc::new(server);
        let service = Arc::new(service);
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = {
            let server = Arc::clone(&server);
            let service = Arc::clone(&service);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("egta-mock".to_string())
                .spawn(move || serve(&server, &service, &shutdown))?
        };
        info!(%addr, "mock egta service listening");
        Ok(Self {
            service,
            server,
            addr,
            shutdown,
            worker: Some(worker),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Site root to hand to the client, e.g. `http://127.0.0.1:40123/`.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn service(&self) -> &Arc<MockService> {
        &self.service
    }

    /// Blocks until the serving thread exits.
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("mock server thread panicked");
            }
        }
    }
}

impl Deref for MockServer {
    type Target = MockService;

    fn deref(&self) -> &MockService {
        &self.service
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shutdown.store(true, Ordering::SeqCst);
        self.server.unblock();
        if worker.join().is_err() {
            warn!("mock server thread panicked");
        }
    }
}

fn serve(server: &Server, service: &MockService, shutdown: &AtomicBool) {
    loop {
        let request = match server.recv() {
            Ok(request) => request,
            Err(_) if shutdown.load(Ordering::SeqCst) => break,
            Err(err) => {
                warn!(error = %err, "mock server recv failed");
                continue;
            }
        };
        respond(service, request);
    }
}

fn respond(service: &MockService, mut request: tiny_http::Request) {
    let method = match request.method() {
        Method::Get => MockMethod::Get,
        Method::Post => MockMethod::Post,
        Method::Put => MockMethod::Put,
        Method::Delete => MockMethod::Delete,
        other => {
            let reply = Response::from_string(format!("method {other} not allowed"))
                .with_status_code(StatusCode(405));
            let _ = request.respond(reply);
            return;
        }
    };
    let mut body = Vec::new();
    if let Err(err) = request.as_reader().read_to_end(&mut body) {
        warn!(error = %err, "failed to read mock request body");
    }
    let answer = isolated(|| service.handle(&MockRequest::new(method, request.url(), &body)));

    let mut reply = Response::from_string(answer.body).with_status_code(StatusCode(answer.status));
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], answer.content_type.as_bytes()) {
        reply = reply.with_header(header);
    }
    if let Err(err) = request.respond(reply) {
        warn!(error = %err, "failed to send mock response");
    }
}

/// Runs one request handler, turning a panic into a 500 so the serving
/// thread keeps going.
fn isolated(handler: impl FnOnce() -> MockResponse) -> MockResponse {
    panic::catch_unwind(AssertUnwindSafe(handler)).unwrap_or_else(|_| {
        error!("mock request handler panicked");
        MockResponse {
            status: 500,
            content_type: "text/plain",
            body: "internal server error".to_string(),
        }
    })
}
