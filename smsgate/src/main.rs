//! SMS Gateway
//!
//! Command-line front end for sending SMS through AT-command GSM modems and
//! inspecting the modems attached to this machine. Results go to stdout as
//! JSON; logs go to stderr.

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use at_engine::{Connector, ModemSession, SendRequest, SerialConnector};
use at_protocol::SmsMode;
use at_sim::{VirtualConnector, VirtualModem};
use clap::{Parser, Subcommand};
use serde::Serialize;
use settings::Settings;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, global = true, help = "Path to the settings file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Talk to virtual modems instead of serial hardware"
    )]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one SMS
    Send {
        #[arg(long, help = "Destination number, 9-16 digits with optional +")]
        to: String,
        #[arg(long, help = "Message text, at most 160 characters")]
        message: String,
        #[arg(long)]
        port: Option<String>,
        #[arg(long)]
        baud: Option<u32>,
        #[arg(long, value_parser = parse_mode, help = "text or pdu")]
        mode: Option<SmsMode>,
        #[arg(long, help = "Operation timeout in seconds (5-300)")]
        timeout: Option<u64>,
    },
    /// Check that a port opens and probe its balance
    Status {
        #[arg(long)]
        port: Option<String>,
    },
    /// Collect identity and network details of one modem
    Info {
        #[arg(long)]
        port: Option<String>,
        #[arg(long)]
        baud: Option<u32>,
    },
    /// List candidate modem ports
    Ports,
    /// Collect device info from every candidate port
    Scan,
    /// Print the effective settings
    Config {
        #[arg(long, help = "Also write them to the settings file")]
        write: bool,
    },
}

fn parse_mode(value: &str) -> Result<SmsMode, String> {
    SmsMode::from_name(value).ok_or_else(|| format!("unknown mode {:?}, expected text or pdu", value))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "smsgate=info,at_protocol=info,at_detect=info,at_engine=info,at_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref());

    if let Command::Config { write } = &cli.command {
        print_json(&settings)?;
        if *write {
            let path = settings
                .save(cli.config.as_deref())
                .map_err(anyhow::Error::msg)?;
            info!("Settings written to {}", path.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    if cli.simulate {
        info!("Simulating modems on {:?}", settings.simulated_ports);
        let connector = settings
            .simulated_ports
            .iter()
            .fold(VirtualConnector::new(), |connector, port| {
                connector.with_modem(port.clone(), VirtualModem::sim7600(port.clone()))
            });
        run(ModemSession::new(connector, settings.modem), cli.command, &cancel).await
    } else {
        run(
            ModemSession::new(SerialConnector::new(), settings.modem),
            cli.command,
            &cancel,
        )
        .await
    }
}

async fn run<C: Connector>(
    session: ModemSession<C>,
    command: Command,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    match command {
        Command::Send {
            to,
            message,
            port,
            baud,
            mode,
            timeout,
        } => {
            let request = SendRequest {
                to,
                message,
                port,
                baud_rate: baud,
                mode,
                timeout_secs: timeout,
            }
            .resolve(session.config())
            .context("invalid send request")?;

            let outcome = session.send(&request, cancel).await;
            print_json(&outcome)?;
            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Status { port } => {
            let status = session.port_status(port.as_deref(), cancel).await?;
            print_json(&status)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Info { port, baud } => {
            let info = session.device_info(port.as_deref(), baud, cancel).await?;
            print_json(&info)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ports => {
            print_json(&session.list_ports()?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Scan => {
            print_json(&session.scan_devices(cancel).await?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
