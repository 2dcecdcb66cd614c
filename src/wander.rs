//! Wander controller: random drive loop plus obstacle reactions.
//!
//! The loop selects on two sources:
//!
//! ```text
//!            ┌──────────── tick (50ms) ────────────┐
//!            │                                     ▼
//! host ── SensorEvent ──▶ select! ──▶ on_event / on_tick ──▶ RobotHost
//! ```
//!
//! Reactions run inline, so at most one is ever in progress and the state
//! needs no lock. A reaction unsubscribes every obstacle event and starts a
//! cool-down; the tick that sees the cool-down expired subscribes them again.
//!
//! Every subscribe round gets a new generation, and the host stamps it on the
//! events it raises. An event still queued from an earlier round is dropped,
//! even when the tick that resubscribed was selected ahead of it.

use crate::config::BhramanConfig;
use crate::error::Result;
use crate::host::{EventSpec, RobotHost, SensorEvent, SensorReading};
use crate::maneuver::{self, Trigger};
use crate::state::WanderState;
use crate::subscriptions;

use crossbeam_channel::{Receiver, select, tick};
use rand::prelude::*;
use rand::rngs::SmallRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Idle,
    /// Cool-down expired, obstacle events registered again
    Resubscribed,
    /// New drive window started with this velocity
    Drove { linear: i32, angular: i32 },
}

/// What an event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Maneuver ran to completion
    Reacted(Trigger),
    /// Arrived while subscriptions were off; dropped
    Ignored,
}

/// The wander behavior bound to one host
pub struct Wander<H: RobotHost> {
    config: BhramanConfig,
    host: H,
    specs: Vec<EventSpec>,
    state: WanderState,
    rng: SmallRng,
}

impl<H: RobotHost> Wander<H> {
    pub fn new(config: BhramanConfig, host: H) -> Self {
        let mut rng = if config.wander.random_seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.wander.random_seed)
        };
        let time_in_drive = roll_drive_secs(&mut rng, &config);
        let specs = subscriptions::event_specs(&config.avoidance);

        Self {
            config,
            host,
            specs,
            state: WanderState::new(Instant::now(), time_in_drive),
            rng,
        }
    }

    pub fn state(&self) -> &WanderState {
        &self.state
    }

    /// Center the head, reset the timers to `now` and subscribe the obstacle events
    pub fn start(&mut self, now: Instant) -> Result<()> {
        let startup = &self.config.startup;
        if startup.center_head {
            self.host.debug("Centering Head");
            self.host.move_head(0.0, 0.0, 0.0, startup.head_velocity)?;
            self.host.pause(Duration::from_millis(startup.settle_ms))?;
        }

        let time_in_drive = roll_drive_secs(&mut self.rng, &self.config);
        let generation = self.state.generation;
        self.state = WanderState::new(now, time_in_drive);
        self.state.generation = generation;
        self.subscribe_all()?;

        tracing::info!(
            "Wander started: first drive window {}s, cool-down {:.1}s",
            time_in_drive,
            self.config.wander.cooldown_secs
        );
        Ok(())
    }

    /// One pass of the drive loop
    pub fn on_tick(&mut self, now: Instant) -> Result<TickOutcome> {
        if self.state.cooldown_expired(now, self.config.wander.cooldown()?) {
            self.state.tof_triggered = false;
            self.subscribe_all()?;
            tracing::info!("Cool-down over, obstacle events resubscribed");
            return Ok(TickOutcome::Resubscribed);
        }

        if self.state.drive_window_expired(now) {
            let wander = &self.config.wander;
            let linear = self.rng.gen_range(wander.min_linear..=wander.max_linear);
            let angular = self.rng.gen_range(-wander.max_angular..=wander.max_angular);
            self.host.drive(linear as f32, angular as f32)?;

            let time_in_drive = roll_drive_secs(&mut self.rng, &self.config);
            self.state.restart_drive(now, time_in_drive);
            tracing::debug!(
                "Drive linear={}, angular={} for {}s",
                linear,
                angular,
                time_in_drive
            );
            return Ok(TickOutcome::Drove { linear, angular });
        }

        Ok(TickOutcome::Idle)
    }

    /// Obstacle reaction for a delivered event. Blocks for the whole maneuver.
    pub fn on_event(&mut self, event: &SensorEvent, now: Instant) -> Result<EventOutcome> {
        if !self.state.accepts_event(event.generation) {
            tracing::debug!(
                "Dropping stale {} (generation {}, current {})",
                event.name,
                event.generation,
                self.state.generation
            );
            return Ok(EventOutcome::Ignored);
        }
        let trigger = Trigger::from_event(event)?;

        self.unsubscribe_all()?;
        self.state.trigger(now);

        match &event.reading {
            SensorReading::TimeOfFlight {
                position,
                distance_m,
            } => {
                self.host.debug(&format!("Distance: {}", distance_m));
                self.host.debug(&format!("Sensor Position: {}", position));
            }
            SensorReading::Bump { sensor_name, .. } => self.host.debug(sensor_name),
        }
        let steps = trigger.sequence();
        tracing::info!(
            "Obstacle: {}, running evasive maneuver ({:.1}s)",
            trigger,
            maneuver::blocking_time(steps).as_secs_f32()
        );

        maneuver::run(&mut self.host, steps)?;
        Ok(EventOutcome::Reacted(trigger))
    }

    /// Register all obstacle events under a new generation and mark them active
    pub fn subscribe_all(&mut self) -> Result<()> {
        let generation = self.state.next_generation();
        for spec in &mut self.specs {
            spec.generation = generation;
        }
        subscriptions::subscribe_all(&mut self.host, &self.specs)?;
        self.state.subscriptions_active = true;
        Ok(())
    }

    /// Unregister all obstacle events, tolerating ones already gone
    pub fn unsubscribe_all(&mut self) -> Result<()> {
        subscriptions::unsubscribe_all(&mut self.host)?;
        self.state.subscriptions_active = false;
        Ok(())
    }

    /// Run until `running` is cleared or the event channel closes.
    ///
    /// Errors from the host abort the loop; the robot is stopped on every exit path
    /// that still has a working host.
    pub fn run(&mut self, events: &Receiver<SensorEvent>, running: &Arc<AtomicBool>) -> Result<()> {
        let ticker = tick(self.config.wander.tick());
        let result = self.run_loop(events, &ticker, running);

        if let Err(e) = self.host.drive(0.0, 0.0) {
            tracing::warn!("Failed to stop robot: {}", e);
        }
        result
    }

    fn run_loop(
        &mut self,
        events: &Receiver<SensorEvent>,
        ticker: &Receiver<Instant>,
        running: &Arc<AtomicBool>,
    ) -> Result<()> {
        while running.load(Ordering::Relaxed) {
            select! {
                recv(events) -> msg => match msg {
                    Ok(event) => {
                        self.on_event(&event, Instant::now())?;
                    }
                    Err(_) => {
                        tracing::warn!("Host event channel closed");
                        return Ok(());
                    }
                },
                recv(ticker) -> _ => {
                    self.on_tick(Instant::now())?;
                }
            }
        }
        tracing::info!("Wander loop stopped");
        Ok(())
    }
}

fn roll_drive_secs(rng: &mut SmallRng, config: &BhramanConfig) -> u64 {
    rng.gen_range(config.wander.min_drive_secs..=config.wander.max_drive_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::host::{HostCommand, SimHandle, SimHost, TofPosition};
    use crate::subscriptions::{BUMPED, FRONT_TOF};

    fn test_config() -> BhramanConfig {
        let mut config = BhramanConfig::default();
        config.wander.random_seed = 7;
        config.simulation = SimulationConfig {
            realtime_pauses: false,
            record_commands: true,
            ..SimulationConfig::default()
        };
        config
    }

    fn started() -> (Wander<SimHost>, SimHandle, Receiver<SensorEvent>, Instant) {
        let config = test_config();
        let (host, rx) = SimHost::new(&config.simulation);
        let handle = host.handle();
        let mut wander = Wander::new(config, host);
        let t0 = Instant::now();
        wander.start(t0).unwrap();
        handle.clear_commands();
        (wander, handle, rx, t0)
    }

    fn front_event(generation: u64) -> SensorEvent {
        SensorEvent {
            name: FRONT_TOF.to_string(),
            reading: SensorReading::TimeOfFlight {
                position: TofPosition::Center,
                distance_m: 0.1,
            },
            generation,
        }
    }

    #[test]
    fn test_start_centers_head_and_subscribes() {
        let config = test_config();
        let (host, _rx) = SimHost::new(&config.simulation);
        let handle = host.handle();
        let mut wander = Wander::new(config, host);
        wander.start(Instant::now()).unwrap();

        let commands = handle.commands();
        assert_eq!(
            commands[0],
            HostCommand::MoveHead {
                pitch: 0.0,
                roll: 0.0,
                yaw: 0.0,
                velocity: 100.0
            }
        );
        assert_eq!(commands[1], HostCommand::Pause(Duration::from_millis(3000)));
        assert_eq!(handle.subscriptions().len(), 5);
        assert!(wander.state().subscriptions_active);
        assert!(!wander.state().tof_triggered);
    }

    #[test]
    fn test_no_drive_before_window() {
        let (mut wander, handle, _rx, t0) = started();
        let window = wander.state().time_in_drive_secs;

        let at_window = t0 + Duration::from_secs(window);
        assert_eq!(wander.on_tick(at_window).unwrap(), TickOutcome::Idle);
        assert!(handle.commands().is_empty());

        let after = at_window + Duration::from_millis(50);
        assert!(matches!(
            wander.on_tick(after).unwrap(),
            TickOutcome::Drove { .. }
        ));
        assert_eq!(wander.state().drive_started_at, after);
    }

    #[test]
    fn test_event_while_unsubscribed_is_ignored() {
        let (mut wander, handle, _rx, t0) = started();
        wander.unsubscribe_all().unwrap();
        handle.clear_commands();

        let current = wander.state().generation;
        let outcome = wander.on_event(&front_event(current), t0).unwrap();
        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(!wander.state().tof_triggered);
        assert!(handle.commands().is_empty());
    }

    #[test]
    fn test_reaction_then_resubscribe() {
        let (mut wander, handle, _rx, t0) = started();

        let current = wander.state().generation;
        let outcome = wander.on_event(&front_event(current), t0).unwrap();
        assert_eq!(outcome, EventOutcome::Reacted(Trigger::FrontTof));
        assert!(wander.state().tof_triggered);
        assert!(handle.subscriptions().is_empty());

        assert_eq!(
            wander.on_tick(t0 + Duration::from_secs(4)).unwrap(),
            TickOutcome::Idle
        );
        assert_eq!(
            wander.on_tick(t0 + Duration::from_millis(4050)).unwrap(),
            TickOutcome::Resubscribed
        );
        assert!(!wander.state().tof_triggered);
        assert_eq!(handle.subscriptions().len(), 5);
    }

    #[test]
    fn test_event_from_earlier_round_is_ignored() {
        let (mut wander, handle, _rx, t0) = started();
        let stale = wander.state().generation;

        wander.on_event(&front_event(stale), t0).unwrap();
        assert_eq!(
            wander.on_tick(t0 + Duration::from_millis(4050)).unwrap(),
            TickOutcome::Resubscribed
        );
        handle.clear_commands();

        assert_eq!(
            wander.on_event(&front_event(stale), t0).unwrap(),
            EventOutcome::Ignored
        );
        assert!(handle.commands().is_empty());
        assert!(!wander.state().tof_triggered);
    }

    #[test]
    fn test_restart_keeps_generation_increasing() {
        let (mut wander, _handle, _rx, t0) = started();
        let before = wander.state().generation;
        wander.start(t0).unwrap();
        assert!(wander.state().generation > before);
    }

    #[test]
    fn test_malformed_event_propagates() {
        let (mut wander, _handle, _rx, t0) = started();
        let event = SensorEvent {
            name: BUMPED.to_string(),
            reading: SensorReading::TimeOfFlight {
                position: TofPosition::Back,
                distance_m: 0.1,
            },
            generation: wander.state().generation,
        };
        assert!(wander.on_event(&event, t0).is_err());
    }

    #[test]
    fn test_run_exits_when_channel_closes() {
        let (mut wander, handle, _rx, _t0) = started();
        let running = Arc::new(AtomicBool::new(true));

        let (tx, closed_rx) = crossbeam_channel::unbounded::<SensorEvent>();
        drop(tx);
        wander.run(&closed_rx, &running).unwrap();

        assert_eq!(
            handle.commands().last(),
            Some(&HostCommand::Drive {
                linear: 0.0,
                angular: 0.0
            })
        );
    }

    #[test]
    fn test_run_exits_when_stopped() {
        let (mut wander, _handle, rx, _t0) = started();
        let running = Arc::new(AtomicBool::new(false));
        wander.run(&rx, &running).unwrap();
    }
}
