//! Synthetic sensor feed for the simulated host.
//!
//! Every cycle (at `reading_hz`) the feeder publishes one ToF reading per
//! position and, with `bump_probability`, one bump contact:
//!
//! ```text
//! ToF distance:  near obstacle (p = obstacle_probability) -> U[0.03, 0.14] m
//!                otherwise                                -> U[0.30, 2.00] m
//! Bump label:    uniform over the four quadrant labels
//! ```

use super::sim::SimHandle;
use super::types::{SensorReading, TofPosition};
use crate::config::SimulationConfig;
use crate::error::{BhramanError, Result};

use rand::prelude::*;
use rand::rngs::SmallRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Labels the bump sensor reports, one per quadrant
pub const BUMP_LABELS: [&str; 4] = [
    "Bump_FrontRight",
    "Bump_FrontLeft",
    "Bump_RearLeft",
    "Bump_RearRight",
];

const NEAR_RANGE_M: (f64, f64) = (0.03, 0.14);
const CLEAR_RANGE_M: (f64, f64) = (0.30, 2.00);

/// Generates readings; separated from the thread so it can be stepped in tests
pub struct ReadingGenerator {
    rng: SmallRng,
    obstacle_probability: f32,
    bump_probability: f32,
}

impl ReadingGenerator {
    /// Seed 0 draws from entropy, anything else is reproducible
    pub fn new(config: &SimulationConfig) -> Self {
        let rng = if config.random_seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.random_seed)
        };
        Self {
            rng,
            obstacle_probability: config.obstacle_probability,
            bump_probability: config.bump_probability,
        }
    }

    /// Readings for one feed cycle
    pub fn cycle(&mut self) -> Vec<SensorReading> {
        let mut readings = Vec::with_capacity(TofPosition::ALL.len() + 1);

        for position in TofPosition::ALL {
            let (lo, hi) = if self.rng.gen_bool(self.obstacle_probability as f64) {
                NEAR_RANGE_M
            } else {
                CLEAR_RANGE_M
            };
            readings.push(SensorReading::TimeOfFlight {
                position,
                distance_m: self.rng.gen_range(lo..=hi),
            });
        }

        if self.rng.gen_bool(self.bump_probability as f64) {
            let label = BUMP_LABELS[self.rng.gen_range(0..BUMP_LABELS.len())];
            readings.push(SensorReading::Bump {
                sensor_name: label.to_string(),
                is_contacted: true,
            });
        }

        readings
    }
}

/// Background thread feeding synthetic readings into a [`SimHandle`]
pub struct SensorFeeder {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl SensorFeeder {
    /// Spawn the feeder thread. It stops when `running` is cleared or on [`stop`](Self::stop).
    pub fn spawn(
        config: &SimulationConfig,
        host: SimHandle,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let mut generator = ReadingGenerator::new(config);
        let interval = config.reading_interval()?;
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("sensor-feeder".to_string())
            .spawn(move || {
                tracing::info!("Sensor feeder started: interval={:?}", interval);
                let mut delivered_total: u64 = 0;

                while thread_running.load(Ordering::Relaxed) {
                    let cycle_start = Instant::now();

                    for reading in generator.cycle() {
                        let delivered = host.feed(reading.clone());
                        if delivered > 0 {
                            tracing::debug!("Reading {:?} raised {} event(s)", reading, delivered);
                            delivered_total += delivered as u64;
                        }
                    }

                    let elapsed = cycle_start.elapsed();
                    if elapsed < interval {
                        thread::sleep(interval - elapsed);
                    }
                }

                tracing::info!(
                    "Sensor feeder stopped ({} events delivered)",
                    delivered_total
                );
            })
            .map_err(|e| BhramanError::Host(format!("Failed to spawn sensor feeder: {}", e)))?;

        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    /// Signal the thread and wait for it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("Sensor feeder thread panicked");
        }
    }
}

impl Drop for SensorFeeder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(obstacle: f32, bump: f32) -> ReadingGenerator {
        ReadingGenerator::new(&SimulationConfig {
            obstacle_probability: obstacle,
            bump_probability: bump,
            random_seed: 42,
            ..SimulationConfig::default()
        })
    }

    #[test]
    fn test_cycle_covers_all_positions() {
        let mut generator = seeded(0.0, 0.0);
        let readings = generator.cycle();
        assert_eq!(readings.len(), 4);
        for (reading, expected) in readings.iter().zip(TofPosition::ALL) {
            match reading {
                SensorReading::TimeOfFlight {
                    position,
                    distance_m,
                } => {
                    assert_eq!(*position, expected);
                    assert!(*distance_m >= CLEAR_RANGE_M.0 && *distance_m <= CLEAR_RANGE_M.1);
                }
                other => panic!("unexpected reading {:?}", other),
            }
        }
    }

    #[test]
    fn test_always_near_and_bumped() {
        let mut generator = seeded(1.0, 1.0);
        let readings = generator.cycle();
        assert_eq!(readings.len(), 5);
        for reading in &readings[..4] {
            if let SensorReading::TimeOfFlight { distance_m, .. } = reading {
                assert!(*distance_m <= NEAR_RANGE_M.1);
            }
        }
        match &readings[4] {
            SensorReading::Bump { sensor_name, .. } => {
                assert!(BUMP_LABELS.contains(&sensor_name.as_str()))
            }
            other => panic!("unexpected reading {:?}", other),
        }
    }

    #[test]
    fn test_deterministic_seed() {
        let mut a = seeded(0.3, 0.3);
        let mut b = seeded(0.3, 0.3);
        for _ in 0..50 {
            assert_eq!(a.cycle(), b.cycle());
        }
    }
}
