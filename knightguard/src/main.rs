use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use knightguard::config::KnightConfig;
use knightguard::db::pool::{create_pool, run_migrations};
use knightguard::db::queries::saved_entries;
use knightguard::engine::knight_engine::KnightEngine;
use knightguard::engine::saved::SavedSet;
use knightguard::host::prompt::parse_line;
use knightguard::host::sim::SimulatedServer;
use knightguard::host::{HostInput, run};

#[derive(Debug, Parser)]
#[command(name = "knightguard", version, about = "Track who is in your channel")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "knightguard.toml")]
    config: String,

    /// Realm name the simulated server appends to channel names
    #[arg(long, default_value = "Realm1")]
    realm: String,

    /// Keep saved players in memory only
    #[arg(long)]
    no_db: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = KnightConfig::load(&args.config)?;

    // Saved players are read once at startup; a fresh database starts empty
    let pool = if args.no_db {
        None
    } else {
        let pool = create_pool(&config.database.url)
            .await
            .context("failed to connect to database")?;
        run_migrations(&pool)
            .await
            .context("failed to run database migrations")?;
        Some(pool)
    };
    let saved = match &pool {
        Some(pool) => SavedSet::from_persisted(
            saved_entries::load_all(pool)
                .await
                .context("failed to load saved players")?,
        ),
        None => SavedSet::new(),
    };

    let bus = SimulatedServer::demo(&args.realm, &config.channel.name);
    let mut engine = KnightEngine::new(bus, &config, saved);
    engine.login();

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_line(&line) {
                Ok(Some(input)) => {
                    let quit = matches!(input, HostInput::Quit);
                    if tx.send(input).await.is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{e}"),
            }
        }
    });

    info!(
        "KnightGuard ready on channel {}, type `join`, `window` or `help`",
        config.channel.name
    );

    run(engine, pool, config.host.tick_rate_hz, rx, |line| println!("{line}")).await;
    Ok(())
}
