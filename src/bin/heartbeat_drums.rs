use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use heartbeat_drums::analysis::DeviationBand;
use heartbeat_drums::composer::{select_pattern, PatternEvent};
use heartbeat_drums::config::AppConfig;
use heartbeat_drums::engine::{run_session, shutdown_channel, SessionReport, Shutdown, ShutdownTrigger};
use heartbeat_drums::error::{log_ingest_error, IngestError};
use heartbeat_drums::ingest::IngestOutcome;
use heartbeat_drums::player::{JsonLinesOutput, MidiPlayer, NoteSink};
use heartbeat_drums::simulator::Simulator;
use heartbeat_drums::telemetry::TelemetryCollector;
use serde::Serialize;
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::EnvFilter;

type SampleReader = Box<dyn AsyncBufRead + Unpin + Send>;

#[derive(Parser, Debug)]
#[command(
    name = "heartbeat_drums",
    about = "Play drum patterns that follow a live heart-rate stream"
)]
struct Cli {
    /// JSON config file (defaults to assets/heartbeat_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long, global = true, value_parser = parse_duration_secs)]
    duration_secs: Option<Duration>,
    /// Echo telemetry events to stderr as JSON lines
    #[arg(long, global = true)]
    events: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read samples from a TCP sensor bridge
    Connect {
        /// host:port, defaults to the configured input address
        addr: Option<String>,
    },
    /// Read samples from a Unix domain socket
    #[cfg(unix)]
    Unix { path: PathBuf },
    /// Read samples from standard input
    Stdin,
    /// Generate samples with the built-in random-walk simulator
    Simulate,
    /// Print the pattern table as JSON and exit
    Patterns,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    if let Commands::Patterns = cli.command {
        return run_patterns();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let result = runtime.block_on(run_async(cli, config));
    // Stdin reads park a blocking thread that would otherwise hold the exit
    runtime.shutdown_background();
    result
}

async fn run_async(cli: Cli, config: AppConfig) -> Result<ExitCode> {
    let (trigger, shutdown) = shutdown_channel();
    let telemetry = Arc::new(TelemetryCollector::from_config(&config.telemetry));

    let reader: SampleReader = match cli.command {
        Commands::Connect { addr } => {
            let address = addr.unwrap_or_else(|| config.input.address.clone());
            let stream = tokio::net::TcpStream::connect(&address)
                .await
                .map_err(|err| connect_failed(&address, err))?;
            tracing::info!("[Input] Connected to {}", address);
            Box::new(BufReader::new(stream))
        }
        #[cfg(unix)]
        Commands::Unix { path } => {
            let address = path.display().to_string();
            let stream = tokio::net::UnixStream::connect(&path)
                .await
                .map_err(|err| connect_failed(&address, err))?;
            tracing::info!("[Input] Connected to {}", address);
            Box::new(BufReader::new(stream))
        }
        Commands::Stdin => Box::new(BufReader::new(tokio::io::stdin())),
        Commands::Simulate => {
            let (reader, _task) =
                Simulator::new(&config.simulator, now_nanos()).into_reader(trigger.subscribe());
            Box::new(reader)
        }
        Commands::Patterns => return run_patterns(),
    };

    let (player_trigger, player_shutdown) = shutdown_channel();
    let player = Arc::new(MidiPlayer::new(&config.player));
    let clock = player.spawn_clock(
        Box::new(JsonLinesOutput::new(std::io::stdout())),
        player_shutdown,
    );

    if cli.events {
        spawn_event_printer(Arc::clone(&telemetry), trigger.subscribe());
    }
    spawn_stop_signal(trigger, cli.duration_secs);

    let sink: Arc<dyn NoteSink> = player;
    let report = run_session(reader, sink, &config, shutdown, Some(Arc::clone(&telemetry))).await?;

    // The composer's last beat is queued by now; let the player flush it
    player_trigger.trigger();
    clock.await.context("player clock task panicked")?;

    emit_summary(&report, &telemetry)?;
    Ok(ExitCode::from(0))
}

fn connect_failed(address: &str, err: std::io::Error) -> anyhow::Error {
    let err = IngestError::ConnectFailed {
        address: address.to_string(),
        reason: err.to_string(),
    };
    log_ingest_error(&err, "connect");
    err.into()
}

/// Trigger shutdown on Ctrl-C, or after `duration_secs` when given.
fn spawn_stop_signal(trigger: ShutdownTrigger, duration: Option<Duration>) {
    tokio::spawn(async move {
        let reason = match duration {
            Some(duration) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "Ctrl-C",
                _ = tokio::time::sleep(duration) => "duration elapsed",
            },
            None => {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!("[Session] Ctrl-C handler unavailable: {}", err);
                }
                "Ctrl-C"
            }
        };
        tracing::info!("[Session] Stopping: {}", reason);
        trigger.trigger();
    });
}

fn spawn_event_printer(telemetry: Arc<TelemetryCollector>, mut shutdown: Shutdown) {
    tokio::spawn(async move {
        let mut events = Box::pin(telemetry.stream());
        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(event) => match serde_json::to_string(&event) {
                        Ok(json) => eprintln!("{json}"),
                        Err(err) => tracing::warn!("[Telemetry] Failed to encode event: {}", err),
                    },
                    None => break,
                },
                _ = shutdown.wait() => break,
            }
        }
    });
}

/// Finite, non-negative seconds; rejected at argument parsing otherwise
fn parse_duration_secs(value: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|err| format!("invalid seconds {value:?}: {err}"))?;
    Duration::try_from_secs_f64(secs).map_err(|err| format!("invalid seconds {value:?}: {err}"))
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as i64)
        .unwrap_or_default()
}

fn run_patterns() -> Result<ExitCode> {
    let table: Vec<PatternPayload> = DeviationBand::ALL
        .into_iter()
        .map(|band| PatternPayload {
            band,
            events: select_pattern(band),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(ExitCode::from(0))
}

fn emit_summary(report: &SessionReport, telemetry: &TelemetryCollector) -> Result<()> {
    let snapshot = telemetry.snapshot();
    let summary = SummaryPayload {
        samples: report.ingest.samples(),
        ingest_error: match &report.ingest {
            IngestOutcome::Failed { error, .. } => Some(error.to_string()),
            _ => None,
        },
        beats: report.composer.beats,
        skipped_beats: report.composer.skipped,
        telemetry_events: snapshot.total_events,
    };
    eprintln!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

#[derive(Serialize)]
struct PatternPayload {
    band: DeviationBand,
    events: &'static [PatternEvent],
}

#[derive(Serialize)]
struct SummaryPayload {
    samples: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    ingest_error: Option<String>,
    beats: u64,
    skipped_beats: u64,
    telemetry_events: u64,
}
