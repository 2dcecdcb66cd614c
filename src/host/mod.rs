//! Robot host abstraction.
//!
//! - [`RobotHost`]: Trait the behavior drives; implement it for a real robot runtime
//! - [`types`]: Sensor readings, event registrations, recorded commands
//! - [`sim`]: Simulated host with property filtering, debounce and keep-alive
//! - [`feeder`]: Background thread publishing synthetic sensor readings

pub mod feeder;
pub mod sim;
pub mod types;

pub use feeder::SensorFeeder;
pub use sim::{SimHandle, SimHost};
pub use types::{
    Comparator, EventSpec, HostCommand, MessageType, PropertyTest, PropertyValue, SensorEvent,
    SensorReading, TofPosition,
};

use crate::error::Result;
use std::time::Duration;

/// Command and subscription surface of the robot runtime.
///
/// Velocities are host-defined percentages. Every call except [`pause`]
/// returns as soon as the host accepted the command.
///
/// [`pause`]: RobotHost::pause
pub trait RobotHost: Send {
    /// Move the head to an absolute position
    fn move_head(&mut self, pitch: f32, roll: f32, yaw: f32, velocity: f32) -> Result<()>;

    /// Drive at a velocity until the next drive command
    fn drive(&mut self, linear: f32, angular: f32) -> Result<()>;

    /// Drive at a velocity for a bounded time, then stop
    fn drive_time(&mut self, linear: f32, angular: f32, duration: Duration) -> Result<()>;

    /// Block the caller
    fn pause(&mut self, duration: Duration) -> Result<()>;

    /// Register a named event. Matching readings are delivered as [`SensorEvent`]s.
    fn register_event(&mut self, spec: &EventSpec) -> Result<()>;

    /// Remove a registration. Fails with `NotSubscribed` if the name is unknown.
    fn unregister_event(&mut self, name: &str) -> Result<()>;

    /// Fire-and-forget debug message
    fn debug(&mut self, message: &str);
}
