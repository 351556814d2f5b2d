//! Network side of the ground station
//!
//! - [`receiver`]: UDP telemetry intake
//! - [`channel`]: TCP command round trips
//! - [`dispatcher`]: bounded worker pool in front of the channel
//! - [`transport`]: connection abstraction under the channel

pub mod channel;
pub mod dispatcher;
pub mod mock;
pub mod receiver;
pub mod transport;

pub use channel::CommandChannel;
pub use dispatcher::{CommandDispatcher, PendingCommand};
pub use mock::{MockReply, MockTransport};
pub use receiver::{ReceiverStats, ReceiverStatsSnapshot, TelemetryReceiver};
pub use transport::{CommandLink, CommandTransport, TcpTransport};
