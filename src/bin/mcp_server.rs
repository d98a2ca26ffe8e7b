//! Mail-assist MCP Server
//!
//! This binary exposes the email assistant on a driven browser tab as a
//! Model Context Protocol (MCP) server, so agents can extract the open email,
//! draft a reply and insert it into the compose box.

use clap::{Parser, ValueEnum};
use mail_assist::assistant::HttpReplyGenerator;
use mail_assist::browser::{BrowserSession, ConnectionOptions, LaunchOptions, TabDriver};
use mail_assist::config::AssistConfig;
use mail_assist::mcp::AssistServer;
use rmcp::{ServiceExt, transport::stdio};
use rmcp::transport::streamable_http_server::{StreamableHttpService, session::local::LocalSessionManager};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Transport {
    /// Standard input/output transport (default)
    Stdio,
    /// HTTP streamable transport
    Http,
}

#[derive(Parser)]
#[command(name = "mcp-server")]
#[command(version)]
#[command(about = "Email reply assistant MCP server", long_about = None)]
struct Cli {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<PathBuf>,

    /// WebSocket endpoint URL for remote browser connection
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Assistant configuration file (JSON)
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Webmail URL to open on start
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Transport type to use
    #[arg(long, short = 't', value_enum, default_value = "stdio")]
    transport: Transport,

    /// Port for HTTP transport (default: 3000)
    #[arg(long, short = 'p', default_value = "3000")]
    port: u16,

    /// HTTP streamable endpoint path (default: /mcp)
    #[arg(long, default_value = "/mcp")]
    http_path: String,
}

fn build_server(cli: &Cli) -> Result<AssistServer, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => AssistConfig::from_json_file(path)?,
        None => AssistConfig::default(),
    }
    .into_shared();

    let session = match &cli.ws_endpoint {
        Some(endpoint) => BrowserSession::connect(ConnectionOptions::new(endpoint.clone()))?,
        None => {
            let mut options = LaunchOptions::new().headless(!cli.headed);
            if let Some(path) = &cli.executable_path {
                options = options.chrome_path(path.clone());
            }
            if let Some(dir) = &cli.user_data_dir {
                options = options.user_data_dir(dir.clone());
            }
            BrowserSession::launch(options)?
        }
    };

    let mut driver = TabDriver::attach(session, config.clone())?;
    if let Some(url) = &cli.url {
        driver.navigate(url)?;
    }

    let generator = HttpReplyGenerator::new(&config.backend)?;
    eprintln!("Reply backend: {}", generator.endpoint());
    Ok(AssistServer::new(driver, Arc::new(generator)))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    eprintln!("Mail-assist MCP Server v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Browser mode: {}", if cli.headed { "headed" } else { "headless" });
    if let Some(ref endpoint) = cli.ws_endpoint {
        eprintln!("WebSocket endpoint: {}", endpoint);
    }

    let server = build_server(&cli)?;

    // Handle user clicks and host re-renders between tool calls
    let cancel = CancellationToken::new();
    let pump = server.spawn_page_pump(cancel.clone());
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match cli.transport {
        Transport::Stdio => {
            eprintln!("Transport: stdio");
            eprintln!("Ready to accept MCP connections via stdio");
            let running = server.serve(stdio()).await?;
            let quit_reason = running.waiting().await?;
            eprintln!("Server quit with reason: {:?}", quit_reason);
        }
        Transport::Http => {
            eprintln!("Transport: HTTP streamable");
            let bind_addr = format!("127.0.0.1:{}", cli.port);

            // Every MCP session shares the one driven tab
            let service_factory = move || Ok::<_, std::io::Error>(server.clone());
            let http_service =
                StreamableHttpService::new(service_factory, LocalSessionManager::default().into(), Default::default());

            let router = axum::Router::new().nest_service(&cli.http_path, http_service);

            eprintln!("Ready to accept MCP connections at http://{}{}", bind_addr, cli.http_path);

            let listener = tokio::net::TcpListener::bind(bind_addr).await?;
            let shutdown = cancel.clone();
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await?;
        }
    }

    cancel.cancel();
    pump.await?;
    Ok(())
}
