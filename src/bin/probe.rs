//! Firmata Probe Binary
//!
//! Connects to a board over TCP, runs the handshake and performs one command.

use std::time::Duration;

use clap::{Parser, Subcommand};
use crossbeam::channel::{self, select};
use firmata::transport::TcpTransport;
use firmata::{Config, Firmata, Hooks, PinMode};
use tracing_subscriber::{fmt, EnvFilter};

/// Firmata Probe
#[derive(Parser, Debug)]
#[command(name = "firmata-probe")]
#[command(about = "Inspect and drive a Firmata board over TCP")]
#[command(version)]
struct Args {
    /// Board address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:3030")]
    addr: String,

    /// Connect and handshake timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    timeout_ms: u64,

    /// Sampling interval sent to the board in milliseconds
    #[arg(short, long, default_value = "500")]
    sampling_ms: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print versions and the pin table
    Info,

    /// Set a pin mode
    Mode {
        /// Digital pin index
        pin: u8,

        /// Mode name (INPUT, OUTPUT, PWM, ... or I, O, PU, ...)
        mode: PinMode,
    },

    /// Write a pin value (digital 0/1, or PWM/servo value)
    Write {
        /// Digital pin index
        pin: u8,

        /// Value to write
        value: u32,
    },

    /// Enable reporting and log board events
    Watch {
        /// How long to watch
        #[arg(long, default_value = "10")]
        seconds: u64,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,firmata=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Firmata probe v{}", firmata::VERSION);
    tracing::info!("Board address: {}", args.addr);

    let timeout = Duration::from_millis(args.timeout_ms);
    let transport = match TcpTransport::connect(args.addr.as_str(), timeout) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to connect to {}: {}", args.addr, e);
            std::process::exit(1);
        }
    };

    let config = Config::builder()
        .sampling_interval_ms(args.sampling_ms)
        .handshake_timeout(timeout)
        .build();

    let board = match Firmata::connect(transport, config, watch_hooks()) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Handshake failed: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Commands::Info => print_info(&board),
        Commands::Mode { pin, mode } => board.set_pin_mode(pin, mode),
        Commands::Write { pin, value } => board.set_pin_value(pin, value),
        Commands::Watch { seconds } => watch(&board, Duration::from_secs(seconds)),
    };

    board.close();
    if let Err(e) = result {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

fn watch_hooks() -> Hooks {
    Hooks::new()
        .on_analog_message(|_, pin| {
            tracing::info!("A{} ({}) = {}", pin.ax, pin.name, pin.value);
        })
        .on_digital_message(|_, port, changed, values| {
            tracing::info!("Port {} changed 0b{:08b} values 0b{:08b}", port, changed, values);
        })
        .on_string_data(|_, data| {
            tracing::info!("Board says: {}", String::from_utf8_lossy(data));
        })
        .on_i2c_reply(|_, reply| {
            tracing::info!(
                "I2C 0x{:02x} register {}: {:?}",
                reply.address,
                reply.register,
                reply.data
            );
        })
}

fn print_info(board: &Firmata) -> firmata::Result<()> {
    let snapshot = board.snapshot()?;
    for version in [&snapshot.protocol_version, &snapshot.firmware_version]
        .into_iter()
        .flatten()
    {
        println!(
            "{} (client v{}.{}, {:?})",
            version.server.name, version.client.major, version.client.minor, version.compatibility
        );
    }
    println!(
        "{} pins, {} ports, {} analog",
        snapshot.pins.len(),
        snapshot.total_ports,
        snapshot.analog_pins.len()
    );
    println!("{:>3} {:>3} {:>6} {:>6} {:>6} {:>6}  modes", "D", "A", "name", "mode", "value", "state");
    for pin in &snapshot.pins {
        let analog = if pin.is_analog() {
            pin.ax.to_string()
        } else {
            "-".to_string()
        };
        let modes: Vec<String> = pin
            .modes
            .iter()
            .map(|(mode, bits)| format!("{}:{}", mode.short_name(), bits))
            .collect();
        println!(
            "{:>3} {:>3} {:>6} {:>6} {:>6} {:>6}  {}",
            pin.dx,
            analog,
            pin.name.to_string(),
            pin.mode.short_name(),
            pin.value,
            pin.state,
            modes.join(" ")
        );
    }
    Ok(())
}

fn watch(board: &Firmata, duration: Duration) -> firmata::Result<()> {
    let snapshot = board.snapshot()?;
    for ax in 0..snapshot.analog_pins.len() as u8 {
        board.report_analog(ax, true)?;
    }
    for port in 0..snapshot.total_ports {
        board.report_digital(port, true)?;
    }

    let closed = board.close_notify();
    select! {
        recv(closed) -> _ => {
            if let Some(reason) = board.closed_reason() {
                tracing::warn!("Board disconnected: {}", reason);
            }
        }
        recv(channel::after(duration)) -> _ => {}
    }
    Ok(())
}
