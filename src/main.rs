//! Floodcast CLI: flood-risk for today and the coming days at your location.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use floodcast_core::{AppError, Config, ConfigError};
use floodcast_services::{Forecast, ForecastOrchestrator, SessionProgress};
use floodcast_weather::{ConfiguredLocation, Coordinate, DistrictNormalizer, PredictionResult};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(
    name = "floodcast",
    version,
    about = "Multi-day flood-risk forecast for the current location"
)]
struct Cli {
    /// Latitude to use if automatic positioning fails
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude to use if automatic positioning fails
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Config file (defaults to <config dir>/floodcast/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = floodcast_core::init(&cli.log_level) {
        eprintln!("{:#}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (config, _) = Config::load_validated(cli.config.as_deref()).map_err(|e| {
        tracing::error!("Configuration failed: {:#}", e);
        let error = match e.downcast::<ConfigError>() {
            Ok(config_error) => AppError::Config(config_error),
            Err(other) => AppError::Other(other),
        };
        anyhow!("{} ({:#})", error.user_message(), error)
    })?;

    let manual = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon).map_err(|e| {
            let message = e.user_message();
            anyhow::Error::new(e).context(message)
        })?),
        _ => None,
    };

    let location = ConfiguredLocation::from_config(&config.location);
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let orchestrator =
        ForecastOrchestrator::from_config(&config, location, DistrictNormalizer::builtin())?
            .with_progress(tx)
            .with_cancellation(cancel.clone());

    let progress = tokio::spawn(report_progress(rx, std::io::stderr()));
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, cancel).await == Interrupt::Forced {
            std::process::exit(130);
        }
    });

    let result = orchestrator.run_session(manual).await;

    // Closes the progress channel so the reporter drains and finishes.
    drop(orchestrator);
    if let Err(e) = progress.await {
        tracing::warn!("Progress reporter failed: {}", e);
    }

    match result {
        Ok(forecast) => {
            print_forecast(&forecast);
            Ok(())
        }
        Err(e) => {
            tracing::debug!("Session error detail: {:?}", e);
            let message = e.user_message();
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Signal handling could not be installed
    Unavailable,
    /// Interrupted again after the session was cancelled
    Forced,
}

/// First interrupt cancels the session cooperatively; a second one means the
/// user is done waiting for in-flight calls.
async fn watch_interrupts<F, Fut>(mut interrupt: F, cancel: CancellationToken) -> Interrupt
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupt().await.is_err() {
        return Interrupt::Unavailable;
    }
    tracing::info!("Interrupted, cancelling forecast");
    eprintln!("Cancelling... press Ctrl-C again to quit immediately");
    cancel.cancel();

    match interrupt().await {
        Ok(()) => Interrupt::Forced,
        Err(_) => Interrupt::Unavailable,
    }
}

async fn report_progress<W: Write>(mut rx: mpsc::UnboundedReceiver<SessionProgress>, mut out: W) {
    while let Some(event) = rx.recv().await {
        match event {
            SessionProgress::State(state) => tracing::debug!("Progress: {:?}", state),
            SessionProgress::DayAttempted {
                index,
                date,
                predicted,
            } => {
                let status = if predicted { "done" } else { "unavailable" };
                if let Err(e) = writeln!(out, "  day {} ({}) {}", index + 1, date, status) {
                    tracing::debug!("Could not write progress: {}", e);
                }
            }
        }
    }
}

fn format_prediction(prediction: Option<&PredictionResult>) -> String {
    match prediction {
        Some(result) => format!(
            "{} ({:.0}%)",
            result.label.description(),
            result.probability * 100.0
        ),
        None => "unavailable".to_string(),
    }
}

fn print_forecast(forecast: &Forecast) {
    println!("Location:  {}", forecast.coordinate);
    println!(
        "District:  {} ({:.0} m)",
        forecast.geo.district, forecast.geo.elevation_meters
    );
    println!(
        "Now:       {:.1}°C, {:.0}% humidity, {:.1} mm rain",
        forecast.current.temperature_c,
        forecast.current.humidity_pct,
        forecast.current.precipitation_mm
    );
    println!("Today:     {}", format_prediction(forecast.today.as_ref()));
    println!();
    println!(
        "{:<12} {:>7} {:>9} {:>9}  Risk",
        "Date", "Temp", "Humidity", "Rain"
    );
    for day in &forecast.days {
        println!(
            "{:<12} {:>6.1}° {:>8.0}% {:>6.1} mm  {}",
            day.date.to_string(),
            day.temperature_c,
            day.humidity_pct,
            day.rain_mm(),
            format_prediction(day.prediction.as_ref())
        );
    }

    if forecast.is_degraded() {
        println!();
        println!("Notes:");
        for issue in &forecast.issues {
            println!("  - {}", issue);
        }
    }
}
