//! setu-gs - Headless ground station
//!
//! ## Interfaces
//!
//! - **UDP (default 0.0.0.0:5555)**: Inbound telemetry from the stand controller
//! - **TCP (default 192.168.1.10:5556)**: Outbound commands, one connection per command
//!
//! Operator commands are read line by line from stdin (type `help`).

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{RecvTimeoutError, Sender, unbounded};

use setu_gs::console::{self, ConsoleCommand};
use setu_gs::{AppConfig, Error, Result, Station};

/// How often the latest sample is logged
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "setu-gs", version, about = "Ground-station telemetry and command core")]
struct Cli {
    /// Configuration file (defaults are used if it does not exist)
    #[arg(short, long, default_value = "setu-gs.toml")]
    config: PathBuf,

    /// Override network.telemetry_bind
    #[arg(long)]
    telemetry_bind: Option<String>,

    /// Override network.command_addr
    #[arg(long)]
    command_addr: Option<String>,

    /// Start recording immediately
    #[arg(long)]
    record: bool,
}

fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if path.exists() {
        Ok((AppConfig::from_file(path)?, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, from_file) = load_config(&cli.config)?;
    if let Some(bind) = cli.telemetry_bind {
        config.network.telemetry_bind = bind;
    }
    if let Some(addr) = cli.command_addr {
        config.network.command_addr = addr;
    }
    if cli.record {
        config.recorder.record_on_start = true;
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.level))
        .init();

    log::info!("setu-gs v{} starting...", env!("CARGO_PKG_VERSION"));
    if from_file {
        log::info!("Using config: {}", cli.config.display());
    } else {
        log::info!("No config at {}, using defaults", cli.config.display());
    }

    let station = Station::start(config)?;

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let (cmd_tx, cmd_rx) = unbounded();
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || read_console(cmd_tx))
        .map_err(|e| Error::Other(format!("Failed to spawn console thread: {}", e)))?;

    log::info!(
        "setu-gs running (telemetry on udp://{}). Press Ctrl-C to stop.",
        station.telemetry_addr()
    );

    let mut last_status = Instant::now();
    while running.load(Ordering::Relaxed) {
        match cmd_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(cmd) => println!("{}", console::execute(&station, cmd)),
            Err(RecvTimeoutError::Timeout) => {}
            // stdin closed; keep running headless
            Err(RecvTimeoutError::Disconnected) => thread::sleep(Duration::from_millis(100)),
        }

        if last_status.elapsed() >= STATUS_INTERVAL {
            last_status = Instant::now();
            log_status(&station);
        }
    }

    log::info!("Shutting down...");
    station.shutdown();
    log::info!("setu-gs stopped");
    Ok(())
}

fn log_status(station: &Station) {
    let stats = station.receiver_stats();
    match station.latest() {
        Some(sample) if station.is_connected() => {
            log::info!("{}", console::format_sample(&sample));
        }
        _ => log::info!("Waiting for telemetry ({} datagrams rejected)", stats.rejected()),
    }
}

fn read_console(tx: Sender<ConsoleCommand>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().eq_ignore_ascii_case("help") {
            println!("{}", HELP);
            continue;
        }
        match ConsoleCommand::parse(&line) {
            Ok(Some(cmd)) => {
                if tx.send(cmd).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => println!("{}", e),
        }
    }
}

const HELP: &str = "\
status                         link, counters and latest sample
record start|stop              session recording
arm | disarm                   system arm state
valve <dev> open|close         rvv_o, mpv_p, rvv_f
servo <dev> <0-255>            dot_oxidizer, mpf_f, oxidizer_engine
actuator <dev> <0-255>         in_1, ac_1, ac_2
send <type> <dev> <value>      raw command
start | abort                  firing sequence
estop                          close valves, zero servos, disarm
quit";
