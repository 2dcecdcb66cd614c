//! Simulated robot host.
//!
//! Stands in for the robot runtime so the wander behavior can run without
//! hardware. It owns the event registry and decides which readings become
//! events, the way the real runtime does:
//!
//! | Registration field | Simulated behavior |
//! |--------------------|--------------------|
//! | `message_type` | Reading must come from the same stream |
//! | `property_tests` | Every test must pass |
//! | `debounce` | Deliveries closer than this are dropped |
//! | `keep_alive = false` | Registration removed after first delivery |
//!
//! # Thread Model
//!
//! ```text
//! ┌─────────────────┐  feed()   ┌──────────────┐  SensorEvent  ┌──────────────┐
//! │ Feeder / tests  │──────────▶│  SimHandle   │──────────────▶│    Wander    │
//! └─────────────────┘           │ (registry)   │◀──────────────│  (SimHost)   │
//!                               └──────────────┘ register/cmds └──────────────┘
//! ```
//!
//! The registry is shared behind a `parking_lot::Mutex`; the controller holds
//! the [`SimHost`], everyone else a cloned [`SimHandle`].

use super::RobotHost;
use super::types::{EventSpec, HostCommand, SensorEvent, SensorReading};
use crate::config::SimulationConfig;
use crate::error::{BhramanError, Result};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Subscription {
    spec: EventSpec,
    last_delivered: Option<Instant>,
}

struct SimInner {
    subscriptions: HashMap<String, Subscription>,
    commands: Vec<HostCommand>,
    record_commands: bool,
    paused_total: Duration,
    velocity: (f32, f32),
}

impl SimInner {
    fn record(&mut self, command: HostCommand) {
        if self.record_commands {
            self.commands.push(command);
        }
    }
}

/// Cloneable access to the simulated host's registry and command log
#[derive(Clone)]
pub struct SimHandle {
    inner: Arc<Mutex<SimInner>>,
    events_tx: Sender<SensorEvent>,
}

impl SimHandle {
    /// Offer a reading to every registration. Returns the number of events delivered.
    pub fn feed(&self, reading: SensorReading) -> usize {
        self.feed_at(reading, Instant::now())
    }

    /// Same as [`feed`](Self::feed) with an explicit timestamp for debounce
    pub fn feed_at(&self, reading: SensorReading, now: Instant) -> usize {
        let mut inner = self.inner.lock();

        let mut matched: Vec<(String, bool, u64)> = Vec::new();
        for (name, sub) in inner.subscriptions.iter_mut() {
            if !sub.spec.accepts(&reading) {
                continue;
            }
            if let Some(last) = sub.last_delivered
                && now.saturating_duration_since(last) < sub.spec.debounce
            {
                continue;
            }
            sub.last_delivered = Some(now);
            matched.push((name.clone(), sub.spec.keep_alive, sub.spec.generation));
        }

        for (name, keep_alive, generation) in &matched {
            if !keep_alive {
                inner.subscriptions.remove(name);
                tracing::trace!("Event {} delivered once, registration dropped", name);
            }
            let event = SensorEvent {
                name: name.clone(),
                reading: reading.clone(),
                generation: *generation,
            };
            if self.events_tx.send(event).is_err() {
                tracing::trace!("Event receiver gone, {} not delivered", name);
            }
        }

        matched.len()
    }

    pub fn is_subscribed(&self, name: &str) -> bool {
        self.inner.lock().subscriptions.contains_key(name)
    }

    /// Names of the active registrations, sorted
    pub fn subscriptions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().subscriptions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Commands issued so far (empty unless `record_commands` is set)
    pub fn commands(&self) -> Vec<HostCommand> {
        self.inner.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.inner.lock().commands.clear();
    }

    /// Sum of every pause the behavior requested
    pub fn paused_total(&self) -> Duration {
        self.inner.lock().paused_total
    }

    /// Last commanded (linear, angular) velocity
    pub fn velocity(&self) -> (f32, f32) {
        self.inner.lock().velocity
    }
}

/// Simulated host driven by the wander controller
pub struct SimHost {
    handle: SimHandle,
    realtime_pauses: bool,
}

impl SimHost {
    /// Create a host and the receiving end of its event channel
    pub fn new(config: &SimulationConfig) -> (Self, Receiver<SensorEvent>) {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let inner = SimInner {
            subscriptions: HashMap::new(),
            commands: Vec::new(),
            record_commands: config.record_commands,
            paused_total: Duration::ZERO,
            velocity: (0.0, 0.0),
        };
        let host = Self {
            handle: SimHandle {
                inner: Arc::new(Mutex::new(inner)),
                events_tx,
            },
            realtime_pauses: config.realtime_pauses,
        };
        (host, events_rx)
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }
}

impl RobotHost for SimHost {
    fn move_head(&mut self, pitch: f32, roll: f32, yaw: f32, velocity: f32) -> Result<()> {
        self.handle.inner.lock().record(HostCommand::MoveHead {
            pitch,
            roll,
            yaw,
            velocity,
        });
        tracing::debug!(
            "Head -> pitch={:.1}, roll={:.1}, yaw={:.1} @ {:.0}%",
            pitch,
            roll,
            yaw,
            velocity
        );
        Ok(())
    }

    fn drive(&mut self, linear: f32, angular: f32) -> Result<()> {
        let mut inner = self.handle.inner.lock();
        inner.velocity = (linear, angular);
        inner.record(HostCommand::Drive { linear, angular });
        Ok(())
    }

    fn drive_time(&mut self, linear: f32, angular: f32, duration: Duration) -> Result<()> {
        let mut inner = self.handle.inner.lock();
        inner.velocity = (linear, angular);
        inner.record(HostCommand::DriveTime {
            linear,
            angular,
            duration,
        });
        Ok(())
    }

    fn pause(&mut self, duration: Duration) -> Result<()> {
        {
            let mut inner = self.handle.inner.lock();
            inner.paused_total += duration;
            inner.record(HostCommand::Pause(duration));
        }
        // Lock released before sleeping so the feeder keeps running
        if self.realtime_pauses {
            thread::sleep(duration);
        }
        Ok(())
    }

    fn register_event(&mut self, spec: &EventSpec) -> Result<()> {
        if spec.name.is_empty() {
            return Err(BhramanError::Host("event name must not be empty".into()));
        }
        let mut inner = self.handle.inner.lock();
        let previous = inner.subscriptions.insert(
            spec.name.clone(),
            Subscription {
                spec: spec.clone(),
                last_delivered: None,
            },
        );
        if previous.is_some() {
            tracing::debug!("Event {} re-registered", spec.name);
        }
        tracing::trace!(
            "Registered {} [{}] (generation {})",
            spec.name,
            spec.describe_filters(),
            spec.generation
        );
        inner.record(HostCommand::Register(spec.name.clone()));
        Ok(())
    }

    fn unregister_event(&mut self, name: &str) -> Result<()> {
        let mut inner = self.handle.inner.lock();
        inner.record(HostCommand::Unregister(name.to_string()));
        match inner.subscriptions.remove(name) {
            Some(_) => Ok(()),
            None => Err(BhramanError::NotSubscribed(name.to_string())),
        }
    }

    fn debug(&mut self, message: &str) {
        tracing::debug!(target: "bhraman::host", "{}", message);
    }
}
