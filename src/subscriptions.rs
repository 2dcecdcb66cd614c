//! The five obstacle subscriptions and the all-or-nothing (un)subscribe operations.

use crate::config::AvoidanceConfig;
use crate::error::{BhramanError, Result};
use crate::host::{Comparator, EventSpec, MessageType, PropertyTest, RobotHost, TofPosition};
use std::time::Duration;

pub const FRONT_TOF: &str = "FrontTOF";
pub const BACK_TOF: &str = "BackTOF";
pub const LEFT_TOF: &str = "LeftTOF";
pub const RIGHT_TOF: &str = "RightTOF";
pub const BUMPED: &str = "Bumped";

/// Every event name the behavior owns, in unsubscribe order
pub const ALL_EVENTS: [&str; 5] = [FRONT_TOF, BACK_TOF, RIGHT_TOF, LEFT_TOF, BUMPED];

fn tof_spec(name: &str, position: TofPosition, threshold_m: f64, debounce: Duration) -> EventSpec {
    EventSpec::new(name, MessageType::TimeOfFlight)
        .with_test(PropertyTest::new(
            "SensorPosition",
            Comparator::Equal,
            position.as_str(),
        ))
        .with_test(PropertyTest::new(
            "DistanceInMeters",
            Comparator::LessEqual,
            threshold_m,
        ))
        .with_debounce(debounce)
        .with_keep_alive(false)
}

/// Registrations in subscribe order
pub fn event_specs(config: &AvoidanceConfig) -> Vec<EventSpec> {
    let tof_debounce = Duration::from_millis(config.tof_debounce_ms);
    vec![
        tof_spec(
            FRONT_TOF,
            TofPosition::Center,
            config.front_threshold_m,
            tof_debounce,
        ),
        tof_spec(
            LEFT_TOF,
            TofPosition::Left,
            config.side_threshold_m,
            tof_debounce,
        ),
        tof_spec(
            RIGHT_TOF,
            TofPosition::Right,
            config.side_threshold_m,
            tof_debounce,
        ),
        tof_spec(
            BACK_TOF,
            TofPosition::Back,
            config.back_threshold_m,
            tof_debounce,
        ),
        EventSpec::new(BUMPED, MessageType::BumpSensor)
            .with_return_property("sensorName")
            .with_debounce(Duration::from_millis(config.bump_debounce_ms))
            .with_keep_alive(true),
    ]
}

/// Register all five obstacle events. Any failure propagates.
pub fn subscribe_all<H: RobotHost + ?Sized>(host: &mut H, specs: &[EventSpec]) -> Result<()> {
    for spec in specs {
        host.register_event(spec)?;
    }
    tracing::debug!("Subscribed {} obstacle events", specs.len());
    Ok(())
}

/// Unregister all five obstacle events.
///
/// A missing registration is skipped so the remaining ones still go; the
/// count of events actually removed is returned.
pub fn unsubscribe_all<H: RobotHost + ?Sized>(host: &mut H) -> Result<usize> {
    let mut removed = 0;
    for name in ALL_EVENTS {
        match host.unregister_event(name) {
            Ok(()) => removed += 1,
            Err(BhramanError::NotSubscribed(_)) => {
                tracing::debug!("Event {} was not subscribed", name);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::host::{SensorReading, SimHost};

    fn sim() -> (SimHost, crossbeam_channel::Receiver<crate::host::SensorEvent>) {
        SimHost::new(&SimulationConfig {
            realtime_pauses: false,
            record_commands: true,
            ..SimulationConfig::default()
        })
    }

    #[test]
    fn test_event_specs() {
        let specs = event_specs(&AvoidanceConfig::default());
        assert_eq!(specs.len(), 5);

        let back = specs.iter().find(|s| s.name == BACK_TOF).unwrap();
        assert_eq!(
            back.property_tests[1],
            PropertyTest::new("DistanceInMeters", Comparator::LessEqual, 0.20)
        );
        assert!(!back.keep_alive);

        let bumped = specs.iter().find(|s| s.name == BUMPED).unwrap();
        assert!(bumped.keep_alive);
        assert!(bumped.property_tests.is_empty());
        assert_eq!(bumped.debounce, Duration::from_millis(250));
        assert_eq!(bumped.return_properties, vec!["sensorName".to_string()]);
    }

    #[test]
    fn test_back_threshold_is_wider() {
        let specs = event_specs(&AvoidanceConfig::default());
        let reading = |position| SensorReading::TimeOfFlight {
            position,
            distance_m: 0.18,
        };
        let accepted: Vec<&str> = specs
            .iter()
            .filter(|s| {
                TofPosition::ALL
                    .iter()
                    .any(|&position| s.accepts(&reading(position)))
            })
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(accepted, vec![BACK_TOF]);
    }

    #[test]
    fn test_subscribe_then_unsubscribe() {
        let (mut host, _rx) = sim();
        let handle = host.handle();
        subscribe_all(&mut host, &event_specs(&AvoidanceConfig::default())).unwrap();
        assert_eq!(handle.subscriptions().len(), 5);

        assert_eq!(unsubscribe_all(&mut host).unwrap(), 5);
        assert!(handle.subscriptions().is_empty());
    }

    #[test]
    fn test_unsubscribe_all_twice_is_ok() {
        let (mut host, _rx) = sim();
        subscribe_all(&mut host, &event_specs(&AvoidanceConfig::default())).unwrap();

        assert_eq!(unsubscribe_all(&mut host).unwrap(), 5);
        assert_eq!(unsubscribe_all(&mut host).unwrap(), 0);
    }

    #[test]
    fn test_unsubscribe_skips_dropped_registration() {
        let (mut host, _rx) = sim();
        let handle = host.handle();
        subscribe_all(&mut host, &event_specs(&AvoidanceConfig::default())).unwrap();

        // FrontTOF is not keep-alive: the host drops it after delivering
        handle.feed(SensorReading::TimeOfFlight {
            position: TofPosition::Center,
            distance_m: 0.05,
        });
        assert!(!handle.is_subscribed(FRONT_TOF));

        assert_eq!(unsubscribe_all(&mut host).unwrap(), 4);
        assert!(handle.subscriptions().is_empty());
    }
}
