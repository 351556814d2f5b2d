//! Line-oriented operator console
//!
//! ```text
//! status
//! record start|stop
//! arm | disarm
//! valve <device> open|close
//! servo <device> <0-255>
//! actuator <device> <0-255>
//! send <type> <device> <value>
//! start | abort | estop
//! quit
//! ```
//!
//! Devices are given by channel name (`rvv_o`, `mpf_f`, ...) or numeric id.

use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::protocol::constants::DEVICE_SYSTEM;
use crate::protocol::{CommandAck, CommandType, Device, TelemetrySample};
use crate::station::Station;

/// Parsed operator input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Status,
    Record(bool),
    Arm(bool),
    Send {
        command_type: CommandType,
        device_id: u8,
        value: u8,
    },
    EmergencyStop,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let lowered = line.to_ascii_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Ok(None);
        };

        let cmd = match (verb, args) {
            ("status", []) => ConsoleCommand::Status,
            ("record", [arg]) => match *arg {
                "start" => ConsoleCommand::Record(true),
                "stop" => ConsoleCommand::Record(false),
                other => return Err(invalid(format!("record {}: expected start|stop", other))),
            },
            ("arm", []) => ConsoleCommand::Arm(true),
            ("disarm", []) => ConsoleCommand::Arm(false),
            ("valve", [device, state]) => {
                let open = match *state {
                    "open" => true,
                    "close" => false,
                    other => return Err(invalid(format!("valve state {}: expected open|close", other))),
                };
                device_command(CommandType::Solenoid, device, open as u8)?
            }
            ("servo", [device, pos]) => device_command(CommandType::Servo, device, parse_u8(pos)?)?,
            ("actuator", [device, pos]) => {
                device_command(CommandType::Actuator, device, parse_u8(pos)?)?
            }
            ("send", [ty, device, value]) => ConsoleCommand::Send {
                command_type: CommandType::try_from(parse_u8(ty)?)?,
                device_id: parse_device(device)?,
                value: parse_u8(value)?,
            },
            ("start", []) => system(CommandType::StartSequence),
            ("abort", []) => system(CommandType::AbortSequence),
            ("estop", []) => ConsoleCommand::EmergencyStop,
            ("quit" | "exit", []) => ConsoleCommand::Quit,
            _ => return Err(invalid(format!("unrecognised command: {}", line.trim()))),
        };
        Ok(Some(cmd))
    }
}

fn invalid(msg: String) -> Error {
    Error::InvalidParameter(msg)
}

fn system(command_type: CommandType) -> ConsoleCommand {
    ConsoleCommand::Send {
        command_type,
        device_id: DEVICE_SYSTEM,
        value: 1,
    }
}

fn parse_u8(s: &str) -> Result<u8> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| invalid(format!("{}: expected a value 0-255", s)))
}

fn parse_device(s: &str) -> Result<u8> {
    match Device::from_name(s) {
        Some(device) => Ok(device.id()),
        None => parse_u8(s),
    }
}

/// Named device, checked against the command type it is driven with
fn device_command(command_type: CommandType, name: &str, value: u8) -> Result<ConsoleCommand> {
    let device = Device::from_name(name).ok_or_else(|| invalid(format!("unknown device: {}", name)))?;
    if device.command_type() != command_type {
        return Err(invalid(format!("{} is not a {} device", name, command_type)));
    }
    Ok(ConsoleCommand::Send {
        command_type,
        device_id: device.id(),
        value,
    })
}

/// One-line summary of a sample for the operator
pub fn format_sample(s: &TelemetrySample) -> String {
    let p = &s.pressures;
    let lc = &s.load_cells;
    format!(
        "#{} t={}ms PT[o1_3={:.1} o2_2={:.1} p1_6={:.1} f2_4={:.1} f1_5={:.1} eng={:.1}] \
         LC[{:.1} {:.1} {:.1} {:.1}] TC={:.1} SOL[{}{}{}] armed={} err={}",
        s.packet_counter,
        s.timestamp_ms,
        p.pt_o1_3,
        p.pt_o2_2,
        p.pt_p1_6,
        p.pt_f2_4,
        p.pt_f1_5,
        p.pt_f2_4_engine,
        lc.lc_1,
        lc.lc_2,
        lc.lc_3,
        lc.lc_4,
        s.temperature,
        s.solenoids.rvv_o as u8,
        s.solenoids.mpv_p as u8,
        s.solenoids.rvv_f as u8,
        s.status.armed,
        s.status.error
    )
}

fn format_ack(result: &Result<CommandAck>) -> String {
    match result {
        Ok(ack) => format!("{} seq={} {}", ack.outcome(), ack.sequence_id, ack.message()),
        Err(e) => format!("ERROR {}", e),
    }
}

/// Execute a command against the station and return the operator response
pub fn execute(station: &Station, cmd: ConsoleCommand) -> String {
    let timeout = station.config().network.command_timeout();
    match cmd {
        ConsoleCommand::Status => {
            let stats = station.receiver_stats();
            let store = station.store();
            let age = match store.since_last_update() {
                Some(age) => format!("{}ms", age.as_millis()),
                None => "never".to_string(),
            };
            let mut out = format!(
                "link={} last={} recording={} rx={} ok={} rejected={} history={}/{} queued={}",
                if station.is_connected() { "up" } else { "down" },
                age,
                station.is_recording(),
                stats.datagrams,
                stats.accepted,
                stats.rejected(),
                store.history().len(),
                store.history_capacity(),
                station.queued_commands()
            );
            if let Some(sample) = station.latest() {
                let _ = write!(out, "\n{}", format_sample(&sample));
            }
            out
        }
        ConsoleCommand::Record(true) => match station.start_recording() {
            true => "Recording started".to_string(),
            false => "Recording not started (already active or I/O error)".to_string(),
        },
        ConsoleCommand::Record(false) => match station.stop_recording() {
            true => "Recording stopped".to_string(),
            false => "Not recording".to_string(),
        },
        ConsoleCommand::Arm(armed) => {
            format_ack(&station.send_command(CommandType::System, DEVICE_SYSTEM, armed as u8, timeout))
        }
        ConsoleCommand::Send {
            command_type,
            device_id,
            value,
        } => format_ack(&station.send_command(command_type, device_id, value, timeout)),
        ConsoleCommand::EmergencyStop => station
            .emergency_stop(timeout)
            .iter()
            .map(|step| format!("{}={} {}", step.device.name(), step.value, format_ack(&step.result)))
            .collect::<Vec<_>>()
            .join("\n"),
        ConsoleCommand::Quit => "Bye".to_string(),
    }
}
