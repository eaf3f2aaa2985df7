use clap::Parser;
use client::connection::TcpConnection;
use client::ingestor::IngestorConfig;
use client::reconciler::Step;
use client::renderer::Renderer;
use client::rendering::HexRenderer;
use client::session::Session;
use log::{error, info};
use macroquad::prelude::*;
use macroquad::window::Conf;
use protocol::DEFAULT_PORT;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// netorcai server hostname
    #[arg(short = 'H', long, default_value = "localhost")]
    hostname: String,

    /// netorcai server port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Nickname announced at login
    #[arg(long, default_value = "rust-visu")]
    nickname: String,

    /// How long each receive waits before checking for shutdown
    #[arg(long, default_value = "50")]
    receive_timeout_ms: u64,

    /// How long to wait for the game to start
    #[arg(long, default_value = "600")]
    start_timeout_secs: u64,

    /// Window width
    #[arg(short = 'w', long, default_value = "1024")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "768")]
    height: usize,
}

static ARGS: OnceLock<Args> = OnceLock::new();

fn args() -> &'static Args {
    ARGS.get_or_init(Args::parse)
}

fn window_conf() -> Conf {
    let args = args();
    HexRenderer::conf(args.width, args.height)
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = args();

    info!("Starting hexabomb visualization...");
    info!("Server: {}:{}", args.hostname, args.port);
    info!("Press Escape or close the window to quit");

    let config = IngestorConfig {
        host: args.hostname.clone(),
        port: args.port,
        nickname: args.nickname.clone(),
        receive_timeout: Duration::from_millis(args.receive_timeout_ms),
        game_start_timeout: Duration::from_secs(args.start_timeout_secs),
    };

    let mut renderer = HexRenderer::new(args.width, args.height);
    let mut session = Session::spawn(TcpConnection::new()?, config)?;

    while !renderer.request_shutdown() {
        if session.tick(&mut renderer) == Step::Close {
            break;
        }
        renderer.draw();
        next_frame().await;
    }

    let report = session.shutdown();
    info!(
        "Received {} turns, displayed {}, dropped {}",
        report.stats.turns_received, report.stats.turns_forwarded, report.stats.turns_dropped
    );

    Ok(())
}
