//! ==============================================================================
//! domain.rs - plain data shared between the store, the door and the web layer
//! ==============================================================================
//!
//! purpose:
//!     defines the latest-value snapshot the esp32 pushes, the raw query shape
//!     it pushes it in, and the two-valued door command.
//!
//! relationships:
//!     - used by: telemetry.rs (applies TelemetryUpdate to SensorReading)
//!     - used by: door.rs (DoorCommand)
//!     - used by: server.rs (json output, query extraction)
//!
//! ==============================================================================

use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// latest sensor snapshot
///
/// replaced as a whole on every ingestion, never partially visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SensorReading {
    /// temperature in celsius
    #[serde(rename = "temp")]
    pub temperature: f64,
    /// relative humidity (0-100%)
    #[serde(rename = "hum")]
    pub humidity: f64,
    /// mq2 gas sensor level
    #[serde(rename = "mq2")]
    pub gas_level_a: f64,
    /// mq6 gas sensor level
    #[serde(rename = "mq6")]
    pub gas_level_b: f64,
    /// decoded flame flag (true = fire)
    #[serde(rename = "flame", serialize_with = "serialize_flame_raw")]
    pub flame_detected: bool,
}

/// raw flame value meaning "flame present" (the module pulls its output low)
pub const FLAME_PRESENT: u8 = 0;
/// raw flame value the device reports when nothing is burning
pub const FLAME_CLEAR: u8 = 1;

fn serialize_flame_raw<S: Serializer>(detected: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(if *detected { FLAME_PRESENT } else { FLAME_CLEAR })
}

/// json body of `/data`
///
/// carries the raw `flame` the dashboard script expects plus the decoded flag.
#[derive(Debug, Serialize)]
pub struct ReadingView {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub flame_detected: bool,
}

impl From<SensorReading> for ReadingView {
    fn from(reading: SensorReading) -> Self {
        Self {
            flame_detected: reading.flame_detected,
            reading,
        }
    }
}

/// json body of `/get_sensor_data`, the shape the dashboard script polls
#[derive(Debug, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub fire: bool,
    pub door: DoorCommand,
}

impl DashboardSnapshot {
    pub fn new(reading: &SensorReading, door: DoorCommand) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            fire: reading.flame_detected,
            door,
        }
    }
}

/// raw query parameters of `/update`
///
/// every field is optional and untyped: parsing is done per field by the
/// store so a single bad value never rejects the whole push.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetryUpdate {
    pub temp: Option<String>,
    pub hum: Option<String>,
    pub mq2: Option<String>,
    pub mq6: Option<String>,
    pub flame: Option<String>,
}

impl From<HashMap<String, String>> for TelemetryUpdate {
    fn from(mut params: HashMap<String, String>) -> Self {
        Self {
            temp: params.remove("temp"),
            hum: params.remove("hum"),
            mq2: params.remove("mq2"),
            mq6: params.remove("mq6"),
            flame: params.remove("flame"),
        }
    }
}

impl TelemetryUpdate {
    /// fold this update onto the previous snapshot
    ///
    /// absent fields keep their previous value, malformed fields too.
    pub fn apply_to(&self, previous: &SensorReading) -> SensorReading {
        SensorReading {
            temperature: parse_field("temp", self.temp.as_deref(), previous.temperature),
            humidity: parse_field("hum", self.hum.as_deref(), previous.humidity),
            gas_level_a: parse_field("mq2", self.mq2.as_deref(), previous.gas_level_a),
            gas_level_b: parse_field("mq6", self.mq6.as_deref(), previous.gas_level_b),
            flame_detected: parse_flame(self.flame.as_deref(), previous.flame_detected),
        }
    }
}

/// parse one numeric field, falling back to `previous` when absent or malformed
pub fn parse_field(name: &str, raw: Option<&str>, previous: f64) -> f64 {
    let Some(raw) = raw else {
        return previous;
    };

    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            tracing::warn!(field = name, raw, previous, "Ignoring malformed telemetry value");
            previous
        }
    }
}

/// decode the active-low flame value
///
/// `0` means flame present, any other number means clear. an absent value
/// reads as `1` (clear); only a present but non-numeric value keeps `previous`.
pub fn parse_flame(raw: Option<&str>, previous: bool) -> bool {
    let Some(raw) = raw else {
        return false;
    };

    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value == f64::from(FLAME_PRESENT),
        _ => {
            tracing::warn!(field = "flame", raw, previous, "Ignoring malformed flame value");
            previous
        }
    }
}

/// pending actuator command for the door
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumString,
)]
pub enum DoorCommand {
    #[default]
    #[strum(serialize = "CLOSED")]
    #[serde(rename = "CLOSED")]
    Closed,
    #[strum(serialize = "OPEN")]
    #[serde(rename = "OPEN")]
    Open,
}
