use serde::{Deserialize, Serialize};

/// One satellite observation inside a [`Report`].
///
/// `carrier_frequency_hz` is 0 when the receiver does not expose it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteMeasurement {
    pub svid: i32,
    #[serde(rename = "carrierFreq")]
    pub carrier_frequency_hz: f64,
    /// Pseudorange rate in m/s (negative = closing on the satellite).
    #[serde(rename = "prRate")]
    pub pseudorange_rate: f64,
    /// Carrier-to-noise density in dB-Hz.
    #[serde(rename = "cn0")]
    pub cn0_db_hz: f64,
}

impl SatelliteMeasurement {
    pub fn new(svid: i32, carrier_frequency_hz: f64, pseudorange_rate: f64, cn0_db_hz: f64) -> Self {
        Self {
            svid,
            carrier_frequency_hz,
            pseudorange_rate,
            cn0_db_hz,
        }
    }
}

/// One device's position + satellite-measurement snapshot.
///
/// Immutable once constructed; copied by value whenever it crosses the
/// transport or registry boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub device_id: String,
    /// Capture wall-clock timestamp in milliseconds.
    pub timestamp: i64,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Meters above the WGS-84 ellipsoid.
    pub altitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f32,
    /// Ordered satellite measurements; may be empty.
    pub measurements: Vec<SatelliteMeasurement>,
}

impl Report {
    pub fn new(
        device_id: impl Into<String>,
        timestamp: i64,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        accuracy: f32,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            latitude,
            longitude,
            altitude,
            accuracy,
            measurements: Vec::new(),
        }
    }

    /// Append one satellite measurement, preserving insertion order.
    pub fn add_measurement(&mut self, svid: i32, carrier_freq: f64, pr_rate: f64, cn0: f64) {
        self.measurements
            .push(SatelliteMeasurement::new(svid, carrier_freq, pr_rate, cn0));
    }

    /// The geographic fix carried by this report.
    pub fn position(&self) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
        }
    }

    /// Short human-readable summary for status displays.
    pub fn summary(&self) -> String {
        let id: String = self.device_id.chars().take(8).collect();
        format!(
            "device {}: lat {:.6}, lon {:.6}, {} sats, ±{:.2}m",
            id,
            self.latitude,
            self.longitude,
            self.measurements.len(),
            self.accuracy,
        )
    }
}

/// A geographic fix extracted from a [`Report`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// The role this peer plays in the mesh, assigned once per session by the
/// discovery collaborator. The hub accepts connections and relays between
/// spokes; a spoke holds a single connection to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Hub,
    Spoke,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Hub => write!(f, "hub"),
            Role::Spoke => write!(f, "spoke"),
        }
    }
}
