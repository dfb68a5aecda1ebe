mod dns;
mod error;
mod locator;
mod model;
mod runner;
mod scan;
mod server;

pub use error::{Error, Result};

use clap::{Arg, Command};
use model::{ensure_dir, export_to_json, EnumerationReport};
use runner::Sublist3r;
use server::AppState;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "127.0.0.1:5000";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .subcommand(
            Command::new("serve")
                .about("Serve the subdomain enumeration HTTP API")
                .arg(
                    Arg::new("addr")
                        .short('a')
                        .long("addr")
                        .help("Socket address to bind")
                        .value_name("ADDR")
                        .default_value(DEFAULT_ADDR),
                )
                .arg(
                    Arg::new("logs")
                        .short('s')
                        .long("logs")
                        .num_args(0)
                        .help("Save logs into a .log file"),
                ),
        )
        .subcommand(
            Command::new("scan")
                .about("Enumerate subdomains of a target once")
                .arg(
                    Arg::new("target")
                        .help("The domain name to enumerate")
                        .value_name("TARGET")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("logs")
                        .short('s')
                        .long("logs")
                        .num_args(0)
                        .help("Save logs into a .log file"),
                ),
        )
        .arg_required_else_help(true)
        .get_matches();

    match cli.subcommand() {
        Some(("serve", args)) => {
            let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
            let save_logs = *args.get_one::<bool>("logs").unwrap_or(&false);

            let output_dir = Path::new("output/server");
            if save_logs {
                ensure_dir(output_dir)?;
            }
            init_tracing_subscriber(save_logs, output_dir, &format!("{}", timestamp));

            let addr = args
                .get_one::<String>("addr")
                .map(String::as_str)
                .unwrap_or(DEFAULT_ADDR);
            serve(addr).await?;
        }

        Some(("scan", args)) => {
            if let Some(target) = args.get_one::<String>("target") {
                // create filename
                let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
                let filename = format!("{}", timestamp);

                // create output dir
                let output_dir = format!("output/{}", target);
                ensure_dir(output_dir.as_ref())?;

                let save_logs = *args.get_one::<bool>("logs").unwrap_or(&false);
                init_tracing_subscriber(save_logs, output_dir.as_ref(), &filename);

                info!("Enumerating {} (run_{})", target, timestamp);
                let report = scan_once(target).await?;

                println!("{}", serde_json::to_string_pretty(&report)?);

                let json_path = Path::new(&output_dir)
                    .join(&filename)
                    .with_extension("json");
                export_to_json(&report, &json_path)?;
            }
        }

        // fallback if a cmd is not handled (should not possible)
        _ => {
            error!("{:12} - Command not handled, exit program", "CLI ERROR");
            return Err(Error::CliUsage("Command not handled".into()));
        }
    }

    Ok(())
}

/// Explicit startup step: the tool is located once, then injected into the
/// request handlers through the shared state.
async fn serve(addr: &str) -> Result<()> {
    let script_path = locator::locate_tool().await;
    let state = Arc::new(AppState {
        runner: Arc::new(Sublist3r::new(script_path)),
        dns_resolver: dns::new_resolver(),
    });

    let listener = TcpListener::bind(addr).await?;
    info!("{:12} - listening on {}", "SERVER", listener.local_addr()?);
    axum::serve(listener, server::app(state)).await?;

    Ok(())
}

async fn scan_once(target: &str) -> Result<EnumerationReport> {
    let script_path = locator::locate_tool().await;
    let runner = Sublist3r::new(script_path);
    let dns_resolver = dns::new_resolver();

    let report = scan::enumerate(&runner, &dns_resolver, target).await?;
    Ok(report)
}

fn init_tracing_subscriber(save_logs_file: bool, output_dir: &Path, filename: &str) {
    // base for the subscriber
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE);

    if save_logs_file {
        let filename = format!("{}.log", filename);
        let file_appender = RollingFileAppender::new(Rotation::NEVER, output_dir, filename);
        let suscriber = subscriber
            .with_ansi(false)
            .with_file(false)
            .with_target(false)
            .with_writer(file_appender)
            .finish();

        // add log in terminal as an additional layer
        let stdout_layer = layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(true)
            .with_file(false)
            .with_target(false);

        // init the subscriber
        tracing::subscriber::set_global_default(suscriber.with(stdout_layer))
            .expect("Unable to set global subscriber with 2 layer");
    } else {
        let suscriber = subscriber
            .with_ansi(true)
            .with_file(false)
            .with_target(false)
            .finish();

        // init the subscriber
        tracing::subscriber::set_global_default(suscriber)
            .expect("Unable to set global subscriber with 2 layer");
    }
}
