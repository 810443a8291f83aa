//! Pecan demo host.
//!
//! Serves a few sample routes, a counter controller and the in-memory log
//! page until Ctrl+C.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use http::Method;

use pecan::config::{load_config, ServerConfig};
use pecan::lifecycle::trigger_on_ctrl_c;
use pecan::logging::page::DEFAULT_LOG_ROUTE;
use pecan::observability::init_tracing;
use pecan::{Controller, ControllerRoutes, RequestContext, WebServerBuilder};

const IN_MEMORY_LOG_CAPACITY: usize = 100;

#[derive(Parser)]
#[command(name = "pecan")]
#[command(about = "Demo host for the Pecan web server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (`ip` or `ip:port`). May be repeated.
    #[arg(short, long)]
    listen: Vec<String>,

    /// Directory whose files are served under `/static`.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

/// Shared counter exposed as `/Increment`, `/Decrement`, `/Read` and
/// `/ReadAsync`.
#[derive(Default)]
struct CounterController {
    value: AtomicI64,
}

impl Controller for CounterController {
    fn routes(routes: &mut ControllerRoutes<Self>) {
        routes
            .action("Increment", &[Method::GET, Method::POST], |c, _ctx| {
                c.value.fetch_add(1, Ordering::SeqCst);
            })
            .task("Decrement", &[Method::GET, Method::POST], |c, ctx| {
                Box::pin(async move {
                    let quantity = ctx
                        .query_param("quantity")
                        .and_then(|q| q.parse::<i64>().ok())
                        .unwrap_or(1);
                    c.value.fetch_sub(quantity, Ordering::SeqCst);
                })
            })
            .func("Read", &[Method::GET], |c, _ctx| {
                c.value.load(Ordering::SeqCst).to_string()
            })
            .async_func("ReadAsync", &[Method::GET], |c, _ctx| {
                Box::pin(async move {
                    tokio::task::yield_now().await;
                    c.value.load(Ordering::SeqCst).to_string()
                })
            });
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    init_tracing(&config.observability.log_level)?;

    tracing::info!("pecan v{} starting", env!("CARGO_PKG_VERSION"));

    let mut builder = WebServerBuilder::from_config(&config);
    for address in &cli.listen {
        builder = builder.listen(address, config.listener.default_port);
    }
    if config.listener.bind_addresses.is_empty() && cli.listen.is_empty() {
        builder = builder.listen("0.0.0.0", config.listener.default_port);
    }
    if config.logging.in_memory.is_none() {
        builder = builder.with_in_memory_logger(IN_MEMORY_LOG_CAPACITY, DEFAULT_LOG_ROUTE);
    }
    if let Some(dir) = &cli.static_dir {
        builder = builder.map_static_files(dir, "*", "/static", None);
    }

    let server = builder
        .map_get_action("/test", |ctx: &mut RequestContext| {
            tracing::info!(path = ctx.path(), "test action invoked");
        })
        .map_get_task("/test-async", |_ctx: &mut RequestContext| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
            })
        })
        .map_get_func("/hi", |_ctx: &mut RequestContext| "Hello, Pecan!")
        .map_controller(Arc::new(CounterController::default()))
        .build()?;

    let _ctrl_c = trigger_on_ctrl_c(server.shutdown().clone());
    server.run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
