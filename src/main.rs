use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ram::{api, db};

const DEFAULT_FRONTEND_DIR: &str = "./public_html";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3333";
const DEFAULT_DB_PATH: &str = "ram.db";

#[derive(Parser)]
#[command(name = "ram")]
#[command(about = "r.a.m. - a small note taking web service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Directory with the frontend assets and templates
    #[arg(short, long, default_value = DEFAULT_FRONTEND_DIR)]
    frontend_dir: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_LISTEN_ADDR)]
    listen: String,

    /// SQLite database file
    #[arg(short, long, default_value = DEFAULT_DB_PATH)]
    db: PathBuf,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            frontend_dir: DEFAULT_FRONTEND_DIR.into(),
            listen: DEFAULT_LISTEN_ADDR.into(),
            db: DEFAULT_DB_PATH.into(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "ram=debug,ram_core=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve(args)) => serve(args).await,
        // Default: start server
        None => serve(ServeArgs::default()).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    // The schema has to be current before the first request is accepted.
    let db = db::Database::open(&args.db)
        .with_context(|| format!("cannot open database {}", args.db.display()))?;
    db.migrate().context("database migration failed")?;

    let server = api::start(
        db,
        api::ServerConfig {
            static_dir: args.frontend_dir,
            listen_addr: args.listen,
        },
    )
    .await?;

    server.run_until(shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
