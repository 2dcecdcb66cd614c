//! Host data types: sensor readings, event registrations, delivered events.
//!
//! Key types:
//! - [`SensorReading`]: One raw message from a sensor, as the host sees it
//! - [`EventSpec`]: A named registration with property filters and debounce
//! - [`SensorEvent`]: A reading that passed a registration, delivered by name
//! - [`HostCommand`]: Record of a command issued to the host

use std::fmt;
use std::time::Duration;

/// Sensor message stream an event is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    TimeOfFlight,
    BumpSensor,
}

/// Mounting position of a time-of-flight range sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TofPosition {
    /// Front-facing sensor, reported by the host as "Center"
    Center,
    Left,
    Right,
    Back,
}

impl TofPosition {
    pub const ALL: [TofPosition; 4] = [Self::Center, Self::Left, Self::Right, Self::Back];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Center => "Center",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Back => "Back",
        }
    }
}

impl fmt::Display for TofPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime property values carried by sensor messages
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    F64(f64),
    String(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::F64(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::F64(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

/// Comparison applied by a property test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Comparator {
    /// Host notation ("==", "<=", ...)
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
        }
    }
}

/// Filter on one named property of a sensor message
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTest {
    pub property: String,
    pub comparator: Comparator,
    pub value: PropertyValue,
}

impl PropertyTest {
    pub fn new(property: &str, comparator: Comparator, value: impl Into<PropertyValue>) -> Self {
        Self {
            property: property.to_string(),
            comparator,
            value: value.into(),
        }
    }

    /// Evaluate against a reading. Missing properties and mismatched types fail.
    pub fn matches(&self, reading: &SensorReading) -> bool {
        let Some(actual) = reading.property(&self.property) else {
            return false;
        };
        match (&actual, &self.value) {
            (PropertyValue::F64(a), PropertyValue::F64(b)) => match self.comparator {
                Comparator::Equal => a == b,
                Comparator::NotEqual => a != b,
                Comparator::Less => a < b,
                Comparator::LessEqual => a <= b,
                Comparator::Greater => a > b,
                Comparator::GreaterEqual => a >= b,
            },
            (PropertyValue::String(a), PropertyValue::String(b)) => match self.comparator {
                Comparator::Equal => a == b,
                Comparator::NotEqual => a != b,
                _ => false,
            },
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => match self.comparator {
                Comparator::Equal => a == b,
                Comparator::NotEqual => a != b,
                _ => false,
            },
            _ => false,
        }
    }
}

/// Named event registration
#[derive(Debug, Clone, PartialEq)]
pub struct EventSpec {
    pub name: String,
    pub message_type: MessageType,
    /// Minimum interval between two deliveries of this event
    pub debounce: Duration,
    /// When false the host drops the registration after its first delivery
    pub keep_alive: bool,
    /// All tests must pass for a reading to be delivered
    pub property_tests: Vec<PropertyTest>,
    /// Extra properties the handler wants echoed back
    pub return_properties: Vec<String>,
    /// Subscription round this registration belongs to, copied onto its events
    pub generation: u64,
}

impl EventSpec {
    pub fn new(name: &str, message_type: MessageType) -> Self {
        Self {
            name: name.to_string(),
            message_type,
            debounce: Duration::ZERO,
            keep_alive: false,
            property_tests: Vec::new(),
            return_properties: Vec::new(),
            generation: 0,
        }
    }

    pub fn with_test(mut self, test: PropertyTest) -> Self {
        self.property_tests.push(test);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_return_property(mut self, property: &str) -> Self {
        self.return_properties.push(property.to_string());
        self
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Filters in host notation, e.g. `SensorPosition == "Center" && DistanceInMeters <= 0.15`
    pub fn describe_filters(&self) -> String {
        self.property_tests
            .iter()
            .map(|t| format!("{} {} {}", t.property, t.comparator.symbol(), t.value))
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// True if the reading belongs to this event's stream and passes every test
    pub fn accepts(&self, reading: &SensorReading) -> bool {
        reading.message_type() == self.message_type
            && self.property_tests.iter().all(|t| t.matches(reading))
    }
}

/// Raw sensor message
#[derive(Debug, Clone, PartialEq)]
pub enum SensorReading {
    TimeOfFlight {
        position: TofPosition,
        distance_m: f64,
    },
    Bump {
        /// Host label such as "Bump_FrontLeft"
        sensor_name: String,
        is_contacted: bool,
    },
}

impl SensorReading {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::TimeOfFlight { .. } => MessageType::TimeOfFlight,
            Self::Bump { .. } => MessageType::BumpSensor,
        }
    }

    /// Look up a property by its host name
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        match (self, name) {
            (Self::TimeOfFlight { position, .. }, "SensorPosition") => {
                Some(PropertyValue::from(position.as_str()))
            }
            (Self::TimeOfFlight { distance_m, .. }, "DistanceInMeters") => {
                Some(PropertyValue::F64(*distance_m))
            }
            (Self::Bump { sensor_name, .. }, "sensorName") => {
                Some(PropertyValue::String(sensor_name.clone()))
            }
            (Self::Bump { is_contacted, .. }, "isContacted") => {
                Some(PropertyValue::Bool(*is_contacted))
            }
            _ => None,
        }
    }
}

/// Reading delivered to the behavior under the name of the event it matched
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub name: String,
    pub reading: SensorReading,
    /// Generation of the registration that raised this event
    pub generation: u64,
}

/// Commands issued to the host, as recorded by the simulated host
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    MoveHead {
        pitch: f32,
        roll: f32,
        yaw: f32,
        velocity: f32,
    },
    Drive {
        linear: f32,
        angular: f32,
    },
    DriveTime {
        linear: f32,
        angular: f32,
        duration: Duration,
    },
    Pause(Duration),
    Register(String),
    Unregister(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tof(position: TofPosition, distance_m: f64) -> SensorReading {
        SensorReading::TimeOfFlight {
            position,
            distance_m,
        }
    }

    #[test]
    fn test_numeric_property_test() {
        let test = PropertyTest::new("DistanceInMeters", Comparator::LessEqual, 0.15);
        assert!(test.matches(&tof(TofPosition::Center, 0.10)));
        assert!(test.matches(&tof(TofPosition::Center, 0.15)));
        assert!(!test.matches(&tof(TofPosition::Center, 0.16)));
    }

    #[test]
    fn test_string_property_test() {
        let test = PropertyTest::new("SensorPosition", Comparator::Equal, "Left");
        assert!(test.matches(&tof(TofPosition::Left, 1.0)));
        assert!(!test.matches(&tof(TofPosition::Right, 1.0)));

        // Ordering comparisons are undefined for strings
        let ordered = PropertyTest::new("SensorPosition", Comparator::Less, "Left");
        assert!(!ordered.matches(&tof(TofPosition::Left, 1.0)));
    }

    #[test]
    fn test_missing_property_fails() {
        let test = PropertyTest::new("DistanceInMeters", Comparator::LessEqual, 0.15);
        let bump = SensorReading::Bump {
            sensor_name: "Bump_FrontLeft".into(),
            is_contacted: true,
        };
        assert!(!test.matches(&bump));
    }

    #[test]
    fn test_spec_accepts_checks_message_type() {
        let spec = EventSpec::new("Bumped", MessageType::BumpSensor);
        assert!(!spec.accepts(&tof(TofPosition::Back, 0.01)));
        assert!(spec.accepts(&SensorReading::Bump {
            sensor_name: "Bump_RearLeft".into(),
            is_contacted: false,
        }));
    }

    #[test]
    fn test_describe_filters() {
        let spec = EventSpec::new("FrontTOF", MessageType::TimeOfFlight)
            .with_test(PropertyTest::new("SensorPosition", Comparator::Equal, "Center"))
            .with_test(PropertyTest::new("DistanceInMeters", Comparator::LessEqual, 0.15));
        assert_eq!(
            spec.describe_filters(),
            r#"SensorPosition == "Center" && DistanceInMeters <= 0.15"#
        );
        assert_eq!(EventSpec::new("Bumped", MessageType::BumpSensor).describe_filters(), "");
    }
}
