use chrono::Utc;
use rand::RngExt;

use proxim_core::Report;

/// Synthetic stand-in for the platform's GNSS feed: a slow random walk
/// around a fixed origin with plausible satellite measurements. The core
/// never reads sensors; this lives entirely on the host side.
pub struct SyntheticSensor {
    device_id: String,
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

impl SyntheticSensor {
    pub fn new(device_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            device_id: device_id.into(),
            latitude,
            longitude,
            altitude: 50.0,
        }
    }

    /// Produce the next report, drifting roughly a meter per call.
    pub fn next_report(&mut self) -> Report {
        let mut rng = rand::rng();
        self.latitude += rng.random_range(-1.0e-5..1.0e-5);
        self.longitude += rng.random_range(-1.0e-5..1.0e-5);
        self.altitude += rng.random_range(-0.2..0.2);

        let mut report = Report::new(
            self.device_id.clone(),
            Utc::now().timestamp_millis(),
            self.latitude,
            self.longitude,
            self.altitude,
            rng.random_range(2.0..8.0),
        );
        for svid in [3, 7, 12, 19, 24] {
            report.add_measurement(
                svid,
                1_575_420_000.0,
                rng.random_range(-50.0..50.0),
                rng.random_range(28.0..48.0),
            );
        }
        report
    }
}
