use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use owo_colors::OwoColorize;
use trackkit_location::{Fix, LocationManager, sys};
use trackkit_permission::AuthorizationLevel;
use trackkit_reporter::{HttpTransport, IntervalTicker, Reporter, ReporterConfig};

#[derive(Parser)]
#[command(name = "trackkit")]
#[command(about = "Sample this device's location and report it to a collector", long_about = None)]
struct Cli {
    #[command(flatten)]
    options: Options,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run continuously, reporting the latest fix on every interval
    Daemon,
    /// Get one fix and report it to the collector
    Report,
    /// Get one fix and print the report payload as JSON
    Json,
}

#[derive(Args)]
struct Options {
    /// Collector URL reports are POSTed to
    #[arg(long, env = "TRACKKIT_ENDPOINT", default_value = trackkit_reporter::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Identifier sent with every report
    #[arg(long, env = "TRACKKIT_DEVICE_ID", default_value = "trackkit")]
    device_id: String,

    /// Seconds between reports in daemon mode
    #[arg(long, env = "TRACKKIT_INTERVAL", default_value_t = 60)]
    interval: u64,

    /// Seconds before a single HTTP request is abandoned
    #[arg(long, env = "TRACKKIT_REQUEST_TIMEOUT", default_value_t = 10)]
    request_timeout: u64,

    /// Seconds a report may block before it is given up
    #[arg(long, env = "TRACKKIT_SEND_TIMEOUT", default_value_t = 15)]
    send_timeout: u64,

    /// Seconds to wait for a single location fix
    #[arg(long, env = "TRACKKIT_ACQUISITION_TIMEOUT", default_value_t = 30)]
    acquisition_timeout: u64,

    /// Authorization to ask for: `always` or `when-in-use`
    #[arg(long, env = "TRACKKIT_AUTHORIZATION", default_value = "when-in-use")]
    authorization: AuthorizationLevel,

    /// Seconds to wait for the user after the permission prompt
    #[arg(long, env = "TRACKKIT_AUTHORIZATION_GRACE", default_value_t = 5)]
    authorization_grace: u64,

    /// Agent tag added to the payload as `url`
    #[arg(long, env = "TRACKKIT_SOURCE")]
    source: Option<String>,

    /// Minimum seconds between platform location updates
    #[arg(long, env = "TRACKKIT_UPDATE_INTERVAL", default_value_t = 10)]
    update_interval: u64,
}

impl Options {
    fn into_config(self) -> ReporterConfig {
        ReporterConfig {
            endpoint: self.endpoint,
            device_id: self.device_id,
            interval: Duration::from_secs(self.interval),
            request_timeout: Duration::from_secs(self.request_timeout),
            send_timeout: Duration::from_secs(self.send_timeout),
            acquisition_timeout: Duration::from_secs(self.acquisition_timeout),
            authorization_level: self.authorization,
            authorization_grace: Duration::from_secs(self.authorization_grace),
            source: self.source,
            update_interval: Duration::from_secs(self.update_interval),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.options.into_config();
    config.validate().context("Invalid configuration")?;

    let backend = sys::platform_backend(config.update_interval);
    let location = LocationManager::new(backend, config.authorization_level);
    let transport = HttpTransport::new().context("Failed to build HTTP client")?;
    let reporter = Reporter::new(config, location, Arc::new(transport));

    match cli.command {
        Some(Commands::Daemon) => run_daemon(&reporter).await,
        Some(Commands::Report) => run_report(&reporter).await,
        Some(Commands::Json) => run_json(&reporter).await,
        None => run_print(&reporter).await,
    }
}

async fn run_daemon(reporter: &Reporter) -> Result<()> {
    let config = reporter.config();
    info!(
        "running in daemon mode (reporting every {}s)",
        config.interval.as_secs()
    );
    info!("backend: {}", config.endpoint);
    info!("device id: {}", config.device_id);

    reporter.start_sampling().await;
    reporter
        .run_daemon(&mut IntervalTicker::new(config.interval))
        .await;
    Ok(())
}

async fn run_report(reporter: &Reporter) -> Result<()> {
    reporter.ensure_authorized().await?;

    println!("Getting location and reporting to backend...");
    reporter
        .run_once(reporter.config().acquisition_timeout)
        .await
        .context("Failed to report location")?;

    println!("{}", "Successfully reported location to backend".green());
    Ok(())
}

async fn run_json(reporter: &Reporter) -> Result<()> {
    let payload = match reporter.ensure_authorized().await {
        Ok(_) => reporter
            .acquire(reporter.config().acquisition_timeout)
            .await
            .and_then(|fix| reporter.payload(&fix)),
        Err(err) => Err(err),
    };

    match payload {
        Ok(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        Err(err) => {
            println!("{}", serde_json::json!({ "error": err.to_string() }));
            Err(err).context("Failed to get location")
        }
    }
}

async fn run_print(reporter: &Reporter) -> Result<()> {
    reporter.ensure_authorized().await?;

    println!("Getting current location...");
    match reporter.acquire(reporter.config().acquisition_timeout).await {
        Ok(fix) => {
            print_fix(&fix);
            print_usage(reporter.config());
            Ok(())
        }
        Err(err) => {
            println!("{}", "Failed to get location".red().bold());
            println!("\nMake sure location services are enabled for this process.");
            Err(err).context("Failed to get location")
        }
    }
}

fn print_fix(fix: &Fix) {
    println!("\n{}", "Location:".bold());
    println!("  Latitude:  {:.6}°", fix.latitude);
    println!("  Longitude: {:.6}°", fix.longitude);
    println!("  Accuracy:  {:.1}m", fix.horizontal_accuracy);
    println!("  Altitude:  {:.1}m", fix.altitude);
    println!("  Timestamp: {}", fix.sampled_at.to_rfc3339());
}

fn print_usage(config: &ReporterConfig) {
    println!("\n{}", "Usage:".bold());
    println!("  trackkit report  Report location to backend");
    println!(
        "  trackkit daemon  Run continuously, reporting every {}s",
        config.interval.as_secs()
    );
    println!("  trackkit json    Output location as JSON");
}
