//! RSS → Telegram relay — binary entrypoint.
//! Polls the feed in a background worker and serves the status endpoints.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rss_telegram_relay::{
    api::{self, AppState},
    backoff_for, build_dispatcher, build_worker_context,
    metrics::Metrics,
    BotConfig, WorkerActor,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "rss-telegram-relay", version, about = "Forward new RSS posts to a Telegram chat")]
struct Cli {
    /// Overrides PORT / the config file.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Worker plus HTTP status server (default).
    Serve,
    /// Worker only, no HTTP.
    Worker,
    /// Run one check, print the report, exit.
    Check,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut cfg = BotConfig::from_env().context("loading configuration")?;
    if let Some(port) = cli.port {
        cfg.port = port;
    }

    tracing::info!(
        rss_url = %cfg.rss_url,
        chat_id = %cfg.chat_id,
        thread_id = ?cfg.thread_id,
        token_set = cfg.has_token(),
        interval_secs = cfg.check_interval_secs,
        "starting relay"
    );
    if !cfg.has_token() || cfg.chat_id.trim().is_empty() {
        tracing::warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID missing; posts will not be delivered");
    }

    let mode = cli.command.unwrap_or(Mode::Serve);

    // recorder first: anything recorded before it is installed is dropped
    let metrics = match mode {
        Mode::Serve => match Metrics::install() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = %e, "metrics disabled");
                None
            }
        },
        _ => None,
    };

    let dispatcher = build_dispatcher(&cfg);
    let mut ctx = build_worker_context(&cfg, dispatcher.clone()).await?;

    match mode {
        Mode::Check => {
            let report = ctx.run_cycle().await.context("check failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Mode::Worker => {
            let (actor, _handle) = WorkerActor::new(ctx, backoff_for(&cfg));
            actor.run().await;
        }
        Mode::Serve => {
            let cursor = ctx.subscribe();
            let (actor, handle) = WorkerActor::new(ctx, backoff_for(&cfg));
            tokio::spawn(actor.run());

            let state = AppState {
                cursor,
                dispatcher,
                worker: Some(handle),
                root_triggers_check: cfg.root_triggers_check,
            };
            let app = api::router(state, metrics.as_ref());

            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            tracing::info!(%addr, "status server listening");
            axum::serve(listener, app).await.context("status server")?;
        }
    }

    Ok(())
}
