use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use warbleconf::WarbleConfig;

use warbled::{model_from_config, telemetry, Dispatcher, OscServer, Session, UdpNoteSink};

#[derive(Parser, Debug)]
#[command(version, about = "Adaptive Markov sequence generator over OSC", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file, loaded after the system and user configs
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// UDP address to receive OSC on
    #[arg(long, global = true)]
    listen: Option<String>,

    /// UDP address generated and echoed notes are sent to
    #[arg(long, global = true)]
    peer: Option<String>,

    /// Seed the model for a reproducible run
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log filter, RUST_LOG syntax
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the OSC server (default)
    Serve,
    /// Print the effective configuration as TOML
    Config,
}

impl Cli {
    fn apply_overrides(&self, config: &mut WarbleConfig) {
        if let Some(listen) = &self.listen {
            config.infra.bind.listen = listen.clone();
        }
        if let Some(peer) = &self.peer {
            config.infra.bind.peer = peer.clone();
        }
        if let Some(level) = &self.log_level {
            config.infra.telemetry.log_level = level.clone();
        }
        if let Some(seed) = self.seed {
            config.bootstrap.model.seed = Some(seed);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = WarbleConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Config => {
            print!("{}", config.to_toml());
            Ok(())
        }
        Commands::Serve => {
            telemetry::init(&config.infra.telemetry.log_level)?;
            serve(config).await
        }
    }
}

async fn serve(config: WarbleConfig) -> Result<()> {
    let model = model_from_config(&config.bootstrap.model).context("Invalid model configuration")?;

    tracing::info!("🎶 warbled starting");
    tracing::info!("   Listen: {}", config.infra.bind.listen);
    tracing::info!("   Peer: {}", config.infra.bind.peer);
    tracing::info!(
        "   Orders: note {} / time {}, {} divisions over {}s",
        model.notes().order(),
        model.times().order(),
        model.divisions(),
        model.max_duration()
    );

    let sink = UdpNoteSink::connect(&config.infra.bind.peer)
        .await
        .with_context(|| format!("Failed to resolve peer {}", config.infra.bind.peer))?;
    let session = Session::new(model, Arc::new(sink));
    let dispatcher = Dispatcher::new(Arc::clone(&session));

    let server = OscServer::bind(&config.infra.bind.listen, dispatcher)
        .await
        .with_context(|| format!("Failed to bind {}", config.infra.bind.listen))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    server.run(shutdown).await.context("OSC server failed")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = sigterm() => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
    shutdown.cancel();
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
