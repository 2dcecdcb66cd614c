//! Bhraman - Reactive wander behavior for VacuumTiger-class robots
//!
//! The robot drives at random; when a time-of-flight or bump sensor reports a
//! near obstacle it backs off, turns and resumes after a cool-down.
//!
//! ## Modules
//!
//! - [`wander`]: Drive loop and obstacle reactions ([`Wander`])
//! - [`maneuver`]: Evasive motion scripts and their runner
//! - [`subscriptions`]: The five obstacle event registrations
//! - [`state`]: Shared wander state
//! - [`host`]: Robot host trait plus a simulated host for hardware-free runs

pub mod config;
pub mod error;
pub mod host;
pub mod maneuver;
pub mod state;
pub mod subscriptions;
pub mod wander;

// Re-export commonly used types
pub use config::BhramanConfig;
pub use error::{BhramanError, Result};
pub use host::{RobotHost, SensorEvent, SensorReading, SimHost};
pub use maneuver::{BumpSensor, MotionStep, Trigger};
pub use state::WanderState;
pub use wander::{EventOutcome, TickOutcome, Wander};
