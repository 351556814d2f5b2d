//! Ground station facade
//!
//! Wires configuration into a running set of components and exposes the
//! operations a presentation layer needs: live data, liveness, recording
//! and commands.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::monitor::LivenessPoller;
use crate::network::{
    CommandChannel, CommandDispatcher, CommandTransport, PendingCommand, ReceiverStatsSnapshot,
    TcpTransport, TelemetryReceiver,
};
use crate::protocol::{CommandAck, CommandType, Device, TelemetrySample};
use crate::recorder::SessionRecorder;
use crate::store::DataStore;

/// Commands that bring the stand to a safe state, in order
pub const EMERGENCY_STOP_STEPS: [(Device, u8); 7] = [
    (Device::RvvO, 0),
    (Device::MpvP, 0),
    (Device::RvvF, 0),
    (Device::DotOxidizer, 0),
    (Device::MpfF, 0),
    (Device::OxidizerEngine, 0),
    (Device::System, 0),
];

/// Outcome of one emergency-stop step
#[derive(Debug)]
pub struct StepResult {
    pub device: Device,
    pub value: u8,
    pub result: Result<CommandAck>,
}

impl StepResult {
    pub fn is_ok(&self) -> bool {
        matches!(&self.result, Ok(ack) if ack.is_ok())
    }
}

/// Running ground station
pub struct Station {
    config: AppConfig,
    store: Arc<DataStore>,
    receiver: TelemetryReceiver,
    poller: LivenessPoller,
    channel: Arc<CommandChannel>,
    dispatcher: CommandDispatcher,
}

impl Station {
    /// Start with a TCP command transport to `network.command_addr`
    pub fn start(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let transport = TcpTransport::new(config.network.command_socket_addr()?);
        Self::with_transport(config, Box::new(transport))
    }

    /// Start with a caller-supplied command transport
    pub fn with_transport(config: AppConfig, transport: Box<dyn CommandTransport>) -> Result<Self> {
        config.validate()?;

        let recorder = Arc::new(SessionRecorder::new(
            config.recorder.directory.clone(),
            config.recorder.file_prefix.clone(),
        ));
        let store = Arc::new(DataStore::new(config.store.history_capacity, recorder));

        let receiver = TelemetryReceiver::spawn(config.network.telemetry_bind_addr()?, Arc::clone(&store))?;
        let poller = LivenessPoller::spawn(
            Arc::clone(&store),
            config.store.liveness_timeout(),
            config.store.poll_interval(),
        )?;

        info!("Commands go to {}", transport.describe());
        let channel = Arc::new(CommandChannel::new(transport, config.network.command_timeout()));
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&channel),
            config.commands.workers,
            config.commands.queue_capacity,
        )?;

        if config.recorder.record_on_start && !store.start_recording() {
            warn!("Recording requested at startup but could not be started");
        }

        Ok(Self {
            config,
            store,
            receiver,
            poller,
            channel,
            dispatcher,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    pub fn channel(&self) -> &Arc<CommandChannel> {
        &self.channel
    }

    /// Bound telemetry address (useful when configured with port 0)
    pub fn telemetry_addr(&self) -> SocketAddr {
        self.receiver.local_addr()
    }

    pub fn receiver_stats(&self) -> ReceiverStatsSnapshot {
        self.receiver.stats()
    }

    /// Inject a sample as if it arrived over the network
    pub fn update_telemetry(&self, sample: TelemetrySample) {
        self.store.update(sample);
    }

    pub fn latest(&self) -> Option<TelemetrySample> {
        self.store.latest()
    }

    pub fn history(&self) -> Vec<TelemetrySample> {
        self.store.history()
    }

    pub fn check_connection(&self, timeout: Duration) -> bool {
        self.store.check_connection(timeout)
    }

    /// Liveness against the configured timeout
    pub fn is_connected(&self) -> bool {
        self.store.check_connection(self.config.store.liveness_timeout())
    }

    pub fn start_recording(&self) -> bool {
        self.store.start_recording()
    }

    pub fn stop_recording(&self) -> bool {
        self.store.stop_recording()
    }

    pub fn is_recording(&self) -> bool {
        self.store.is_recording()
    }

    /// Commands waiting for a dispatcher worker
    pub fn queued_commands(&self) -> usize {
        self.dispatcher.queued()
    }

    /// Blocking command round trip
    pub fn send_command(
        &self,
        command_type: CommandType,
        device_id: u8,
        value: u8,
        timeout: Duration,
    ) -> Result<CommandAck> {
        self.channel.send(command_type, device_id, value, timeout)
    }

    /// Queue a command on the worker pool
    pub fn submit_command(
        &self,
        command_type: CommandType,
        device_id: u8,
        value: u8,
        timeout: Duration,
    ) -> Result<PendingCommand> {
        self.dispatcher.submit(command_type, device_id, value, timeout)
    }

    /// Close all valves, zero all servos and disarm.
    ///
    /// Every step is attempted even if an earlier one fails.
    pub fn emergency_stop(&self, timeout: Duration) -> Vec<StepResult> {
        warn!("EMERGENCY STOP");
        EMERGENCY_STOP_STEPS
            .iter()
            .map(|&(device, value)| {
                let result = self
                    .channel
                    .send(device.command_type(), device.id(), value, timeout);
                if let Err(e) = &result {
                    warn!("Emergency stop: {} failed: {}", device.name(), e);
                }
                StepResult {
                    device,
                    value,
                    result,
                }
            })
            .collect()
    }

    /// Stop all threads and close any open recording
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.receiver.stop();
        self.poller.stop();
        self.dispatcher.shutdown();
        if self.store.stop_recording() {
            info!("Recording closed on shutdown");
        }
    }
}

impl Drop for Station {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}
