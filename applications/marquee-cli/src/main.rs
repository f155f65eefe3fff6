//! Marquee - headless player for protected playlists and slideshows
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use marquee_core::{Catalog, ContentId};
use marquee_playback::{
    AccessState, Collaborators, EngineEvent, EngineRuntime, RuntimeEvent, SimulatedChannel,
};
use marquee_cli::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Headless player for protected playlists and slideshows", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Catalog JSON file (overrides the configured one)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount a player on one content item and print its events
    Play(PlayArgs),
    /// List the catalog contents
    Inspect,
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct PlayArgs {
    /// Content id to mount
    content: String,

    /// Activation code for protected content
    #[arg(long, conflicts_with = "preview")]
    code: Option<String>,

    /// Start an anonymous preview instead of unlocking
    #[arg(long)]
    preview: bool,

    /// Preview length in seconds (defaults to the configured length)
    #[arg(long, requires = "preview")]
    preview_seconds: Option<u32>,

    /// Start playlist playback as soon as the first track has loaded
    #[arg(long)]
    autoplay: bool,

    /// Stop after this many seconds
    #[arg(long, default_value_t = 30)]
    seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_cli=info,marquee_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(catalog) = cli.catalog {
        settings.catalog = catalog;
    }

    match cli.command {
        Commands::Play(args) => play(settings, args).await?,
        Commands::Inspect => inspect(&settings)?,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

fn load_catalog(settings: &Settings) -> anyhow::Result<Catalog> {
    Catalog::load(&settings.catalog)
        .with_context(|| format!("Failed to load catalog {}", settings.catalog.display()))
}

async fn play(mut settings: Settings, args: PlayArgs) -> anyhow::Result<()> {
    if args.autoplay {
        settings.engine.playlist_autoplay = true;
    }

    let catalog = Arc::new(load_catalog(&settings)?);
    let (engine, task) = EngineRuntime::start(
        settings.engine.clone(),
        Box::new(SimulatedChannel::new()),
        Collaborators::shared(catalog),
    );
    let mut events = engine.subscribe();

    let view = engine.mount(&ContentId::new(args.content.as_str())).await?;
    let state = engine.evaluate(view).await?;
    tracing::info!(%view, content = %args.content, ?state, "Player mounted");

    if state == AccessState::Locked {
        if let Some(code) = &args.code {
            engine.submit_code(view, code).await?;
        } else if args.preview {
            engine.start_preview(view, args.preview_seconds).await?;
        } else {
            tracing::warn!("Content is protected; pass --code or --preview");
        }
    }

    let deadline = tokio::time::sleep(Duration::from_secs(args.seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            received = events.recv() => match received {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if is_terminal(&event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    let snapshot = engine.snapshot(view).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    engine.unmount(view).await?;
    engine.shutdown().await?;
    task.await?;

    Ok(())
}

/// Events after which nothing more happens without user input
fn is_terminal(event: &RuntimeEvent) -> bool {
    matches!(
        event.event,
        EngineEvent::PreviewExpired { .. }
            | EngineEvent::AccessStateChanged {
                state: AccessState::Denied,
                ..
            }
    )
}

fn inspect(settings: &Settings) -> anyhow::Result<()> {
    let catalog = load_catalog(settings)?;

    println!("Catalog: {}", settings.catalog.display());
    for item in &catalog.items {
        let codes = catalog
            .activation_codes
            .get(&item.id)
            .map_or(0, Vec::len);
        println!(
            "  {} - {} ({:?}, {} entries, {})",
            item.id,
            item.title,
            item.kind(),
            item.len(),
            if item.is_protected {
                format!("protected, {codes} codes")
            } else {
                "public".to_string()
            }
        );
    }

    Ok(())
}
