//! HTTP server for mounted resource sets.
//!
//! tiny_http accepts connections; each request is handed to a small rayon
//! pool, which drives [`ResourceMiddleware::respond`] on the tokio runtime.

mod lifecycle;
mod response;

pub use lifecycle::{is_shutdown, setup_shutdown_handler};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tiny_http::{Request, Server};
use tokio::runtime::Handle;

use crate::config::ServeConfig;
use crate::middleware::{Reply, ResourceMiddleware};
use crate::resource::panic_message;
use crate::{debug, log};

/// Requests handled concurrently.
const WORKER_THREADS: usize = 4;

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
}

/// Bind the HTTP server and register it for Ctrl+C shutdown.
pub fn bind_server(config: &ServeConfig) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.interface, config.port)?;
    let server = Arc::new(server);
    lifecycle::register_server(Arc::clone(&server));

    log!("serve"; "http://{}{}", addr, config.context_path);
    Ok(BoundServer { server, addr })
}

impl BoundServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve requests until the server is unblocked (blocking).
    ///
    /// `runtime` must belong to a multi-threaded runtime that outlives the
    /// loop; it must not be the runtime of the calling thread.
    pub fn run(self, middleware: ResourceMiddleware, runtime: Handle) -> Result<()> {
        run_request_loop(&self.server, &middleware, &runtime)
    }
}

fn run_request_loop(server: &Server, middleware: &ResourceMiddleware, runtime: &Handle) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(WORKER_THREADS)
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let middleware = middleware.clone();
        let runtime = runtime.clone();
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &middleware, &runtime) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

fn handle_request(mut request: Request, middleware: &ResourceMiddleware, runtime: &Handle) -> Result<()> {
    if is_shutdown() {
        return response::respond_unavailable(request);
    }

    let resource_request = response::to_resource_request(&mut request)?;
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        runtime.block_on(middleware.respond(&resource_request))
    }));
    let reply = outcome.unwrap_or_else(|panic| {
        let message = panic_message(panic.as_ref());
        log!("error"; "{} {} panicked: {}", resource_request.method, resource_request.url, message);
        Some(Reply::error(500, "PANIC", &message))
    });

    match reply {
        Some(reply) => {
            debug!("serve"; "{} {} {}", reply.status, resource_request.method, resource_request.url);
            response::send_reply(request, reply)
        }
        None => response::respond_not_found(request),
    }
}
