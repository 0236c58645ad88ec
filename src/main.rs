use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use screenrec::{config::DEFAULT_CONFIG_PATH, create_router, system_recorder, AppState, Config};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "screenrec", version, about = "Record the screen, optionally with microphone audio")]
struct Cli {
    /// Config file (without extension)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the start/stop controls over HTTP
    Serve,
    /// Control recording from stdin (default)
    Console,
    /// Record for a fixed time, then finalize and exit
    Record {
        /// Also record the microphone and mux to .mp4
        #[arg(long)]
        audio: bool,
        /// Recording length in seconds
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("screenrec v{}", env!("CARGO_PKG_VERSION"));
    info!("Output directory: {}", cfg.recorder.output_dir.display());

    let recorder = system_recorder(&cfg);

    match cli.command.unwrap_or(Commands::Console) {
        Commands::Serve => {
            let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("HTTP control surface listening on http://{}", addr);

            let app = create_router(AppState::new(recorder.clone()));
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("HTTP server failed")?;

            if let Some(report) = recorder.stop().await? {
                info!("Finalized session on shutdown: {:?}", report.output);
            }
        }
        Commands::Console => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            screenrec::console::run(&recorder, stdin, tokio::io::stdout()).await?;
        }
        Commands::Record { audio, seconds } => {
            let session = recorder.start(audio).await?;
            info!(
                "Recording {}s to {}",
                seconds,
                session.paths.final_output.display()
            );

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                _ = shutdown_signal() => warn!("Interrupted, stopping early"),
            }

            match recorder.stop().await? {
                Some(report) if report.is_success() => {
                    info!("Saved {}", report.output.as_ref().map(|p| p.display().to_string()).unwrap_or_default());
                }
                Some(report) => anyhow::bail!("Recording failed: {}", report.errors.join("; ")),
                None => warn!("Recording already stopped"),
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
