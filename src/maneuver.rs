//! Scripted evasive maneuvers.
//!
//! Every obstacle reaction is a fixed list of timed motion steps. Drive steps
//! are time-boxed and return immediately; only stops and pauses block, so a
//! later drive step cuts the previous one short.
//!
//! | Trigger | Sequence |
//! |---------|----------|
//! | Back ToF | stop, (35, 0) 2.5s, pause 2.5s |
//! | Front / Right ToF, bump front-right | stop, (-35, 0) 2.5s, pause 1s, (0, 52) 2.5s, pause 2.5s |
//! | Left ToF, bump front-left | stop, (-35, 0) 2.5s, pause 1s, (0, -52) 2.5s, pause 2.5s |
//! | Bump rear-left | stop, (35, 0) 2.5s, pause 1s, (0, -52) 2.5s, pause 2.5s |
//! | Bump rear-right or unknown label | stop, (35, 0) 2.5s, pause 1s, (0, 52) 2.5s, pause 2.5s |
//!
//! Positive angular velocity turns counter-clockwise.

use crate::error::{BhramanError, Result};
use crate::host::{RobotHost, SensorEvent, SensorReading};
use crate::subscriptions::{BACK_TOF, BUMPED, FRONT_TOF, LEFT_TOF, RIGHT_TOF};
use std::fmt;
use std::time::Duration;

/// One timed motion command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionStep {
    /// Zero velocity, then block for the settle time
    Stop { settle_ms: u64 },
    /// Time-boxed drive; does not block
    Drive {
        linear: f32,
        angular: f32,
        duration_ms: u64,
    },
    /// Block
    Pause { ms: u64 },
}

impl MotionStep {
    /// How long the step blocks the caller
    pub fn blocking_time(&self) -> Duration {
        match self {
            Self::Stop { settle_ms } => Duration::from_millis(*settle_ms),
            Self::Drive { .. } => Duration::ZERO,
            Self::Pause { ms } => Duration::from_millis(*ms),
        }
    }
}

const STOP: MotionStep = MotionStep::Stop { settle_ms: 200 };
const REVERSE: MotionStep = MotionStep::Drive {
    linear: -35.0,
    angular: 0.0,
    duration_ms: 2500,
};
const ADVANCE: MotionStep = MotionStep::Drive {
    linear: 35.0,
    angular: 0.0,
    duration_ms: 2500,
};
const TURN_CCW: MotionStep = MotionStep::Drive {
    linear: 0.0,
    angular: 52.0,
    duration_ms: 2500,
};
const TURN_CW: MotionStep = MotionStep::Drive {
    linear: 0.0,
    angular: -52.0,
    duration_ms: 2500,
};
const SHORT_PAUSE: MotionStep = MotionStep::Pause { ms: 1000 };
const LONG_PAUSE: MotionStep = MotionStep::Pause { ms: 2500 };

const ADVANCE_ONLY: [MotionStep; 3] = [STOP, ADVANCE, LONG_PAUSE];
const REVERSE_TURN_CCW: [MotionStep; 5] = [STOP, REVERSE, SHORT_PAUSE, TURN_CCW, LONG_PAUSE];
const REVERSE_TURN_CW: [MotionStep; 5] = [STOP, REVERSE, SHORT_PAUSE, TURN_CW, LONG_PAUSE];
const ADVANCE_TURN_CCW: [MotionStep; 5] = [STOP, ADVANCE, SHORT_PAUSE, TURN_CCW, LONG_PAUSE];
const ADVANCE_TURN_CW: [MotionStep; 5] = [STOP, ADVANCE, SHORT_PAUSE, TURN_CW, LONG_PAUSE];

/// Bump quadrant as resolved from the host label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpSensor {
    FrontRight,
    FrontLeft,
    RearLeft,
    /// "Bump_RearRight" and every label not listed above
    RearRight,
}

impl BumpSensor {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Bump_FrontRight" => Self::FrontRight,
            "Bump_FrontLeft" => Self::FrontLeft,
            "Bump_RearLeft" => Self::RearLeft,
            _ => Self::RearRight,
        }
    }
}

/// What set off an obstacle reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    FrontTof,
    BackTof,
    LeftTof,
    RightTof,
    Bump(BumpSensor),
}

impl Trigger {
    /// Resolve a delivered event by its registration name.
    ///
    /// The payload must be the message type the registration is bound to.
    pub fn from_event(event: &SensorEvent) -> Result<Self> {
        let malformed = |reason: &str| BhramanError::MalformedEvent {
            event: event.name.clone(),
            reason: reason.to_string(),
        };

        match event.name.as_str() {
            FRONT_TOF | BACK_TOF | LEFT_TOF | RIGHT_TOF => {
                if !matches!(event.reading, SensorReading::TimeOfFlight { .. }) {
                    return Err(malformed("expected a time-of-flight reading"));
                }
                Ok(match event.name.as_str() {
                    FRONT_TOF => Self::FrontTof,
                    BACK_TOF => Self::BackTof,
                    LEFT_TOF => Self::LeftTof,
                    _ => Self::RightTof,
                })
            }
            BUMPED => match &event.reading {
                SensorReading::Bump { sensor_name, .. } => {
                    Ok(Self::Bump(BumpSensor::from_label(sensor_name)))
                }
                _ => Err(malformed("expected a bump sensor reading")),
            },
            other => Err(BhramanError::UnknownEvent(other.to_string())),
        }
    }

    /// Motion script for this trigger
    pub fn sequence(&self) -> &'static [MotionStep] {
        match self {
            Self::BackTof => &ADVANCE_ONLY,
            Self::FrontTof | Self::RightTof => &REVERSE_TURN_CCW,
            Self::LeftTof => &REVERSE_TURN_CW,
            Self::Bump(BumpSensor::FrontRight) => &REVERSE_TURN_CCW,
            Self::Bump(BumpSensor::FrontLeft) => &REVERSE_TURN_CW,
            Self::Bump(BumpSensor::RearLeft) => &ADVANCE_TURN_CW,
            Self::Bump(BumpSensor::RearRight) => &ADVANCE_TURN_CCW,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrontTof => f.write_str("front ToF"),
            Self::BackTof => f.write_str("back ToF"),
            Self::LeftTof => f.write_str("left ToF"),
            Self::RightTof => f.write_str("right ToF"),
            Self::Bump(sensor) => write!(f, "bump {:?}", sensor),
        }
    }
}

/// Execute a motion script, blocking until its last step returns
pub fn run<H: RobotHost + ?Sized>(host: &mut H, steps: &[MotionStep]) -> Result<()> {
    for step in steps {
        match *step {
            MotionStep::Stop { settle_ms } => {
                host.drive(0.0, 0.0)?;
                host.pause(Duration::from_millis(settle_ms))?;
            }
            MotionStep::Drive {
                linear,
                angular,
                duration_ms,
            } => host.drive_time(linear, angular, Duration::from_millis(duration_ms))?,
            MotionStep::Pause { ms } => host.pause(Duration::from_millis(ms))?,
        }
    }
    Ok(())
}

/// Total time a script blocks the caller
pub fn blocking_time(steps: &[MotionStep]) -> Duration {
    steps.iter().map(MotionStep::blocking_time).sum()
}
