//! # proxim-registry
//!
//! Concurrent registry of the latest report per device, with time-based
//! eviction and the proximity engine on top. The registry is the single
//! owner of all [`DeviceEntry`] state; network readers, the local sensor
//! feed, and the periodic sweeper all mutate it concurrently.

pub mod proximity;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use proxim_core::{Event, EventBus, Report};

/// A device with no report for this long is evicted by the sweep.
pub const DEVICE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default cadence of the liveness sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(5_000);

/// Latest known state for one device. Owned exclusively by the registry;
/// queries hand out clones.
#[derive(Debug, Clone)]
pub struct DeviceEntry {
    pub device_id: String,
    /// The latest report, replaced wholesale on every update.
    pub latest: Report,
    pub last_update: Instant,
    pub active: bool,
}

impl DeviceEntry {
    fn new(report: Report) -> Self {
        Self {
            device_id: report.device_id.clone(),
            last_update: Instant::now(),
            active: true,
            latest: report,
        }
    }

    /// Replace the report, timestamp, and active flag as one unit.
    fn refresh(&mut self, report: Report) {
        self.latest = report;
        self.last_update = Instant::now();
        self.active = true;
    }

    /// Whether this entry has gone stale as of `now`.
    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_update) > timeout
    }
}

/// Concurrent map of device id to latest state.
///
/// Every operation is safe under parallel callers; a single update replaces
/// the entry's report, timestamp, and active flag atomically (under the
/// map's shard lock), so observers never see a half-updated entry.
pub struct DeviceRegistry {
    devices: DashMap<String, DeviceEntry>,
    events: EventBus,
    timeout: Duration,
}

impl DeviceRegistry {
    pub fn new(timeout: Duration, events: EventBus) -> Self {
        Self {
            devices: DashMap::new(),
            events,
            timeout,
        }
    }

    /// Registry with the standard 10 s liveness timeout.
    pub fn with_defaults(events: EventBus) -> Self {
        Self::new(DEVICE_TIMEOUT, events)
    }

    /// The event bus this registry publishes on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Upsert the entry for `report.device_id`.
    ///
    /// First sight of an id publishes `DeviceAdded` strictly before the
    /// `DeviceUpdated` that every call publishes.
    pub fn update(&self, report: Report) {
        let device_id = report.device_id.clone();
        let mut added = false;

        match self.devices.entry(device_id.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().refresh(report.clone()),
            Entry::Vacant(slot) => {
                slot.insert(DeviceEntry::new(report.clone()));
                added = true;
            }
        }

        if added {
            debug!(device_id = %device_id, "new device");
            self.events.publish(Event::DeviceAdded {
                device_id: device_id.clone(),
            });
        }
        self.events.publish(Event::DeviceUpdated { device_id, report });
    }

    /// Point lookup, no side effects.
    pub fn get(&self, device_id: &str) -> Option<DeviceEntry> {
        self.devices.get(device_id).map(|e| e.value().clone())
    }

    /// Snapshot of every entry, active or not, in unspecified order.
    pub fn all_devices(&self) -> Vec<DeviceEntry> {
        self.devices.iter().map(|e| e.value().clone()).collect()
    }

    /// Snapshot of entries that are active and within the liveness timeout,
    /// recomputed at call time (does not rely on a sweep having run).
    pub fn active_devices(&self) -> Vec<DeviceEntry> {
        self.active_devices_at(Instant::now())
    }

    /// [`Self::active_devices`] against a caller-supplied clock.
    pub fn active_devices_at(&self, now: Instant) -> Vec<DeviceEntry> {
        self.devices
            .iter()
            .filter(|e| e.active && !e.is_timed_out(now, self.timeout))
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn active_device_count(&self) -> usize {
        self.active_devices().len()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Mark every stale entry inactive, remove it, and publish exactly one
    /// `DeviceRemoved` for each eviction.
    ///
    /// Safe to call concurrently with `update` and queries: an update that
    /// lands between the mark and the removal re-activates the entry and
    /// rescues it (no event, no removal).
    pub fn sweep_timeouts(&self) {
        self.sweep_timeouts_at(Instant::now());
    }

    /// [`Self::sweep_timeouts`] against a caller-supplied clock.
    pub fn sweep_timeouts_at(&self, now: Instant) {
        let mut expired = Vec::new();
        for mut entry in self.devices.iter_mut() {
            if entry.is_timed_out(now, self.timeout) {
                entry.active = false;
                expired.push(entry.device_id.clone());
            }
        }

        for device_id in expired {
            if self
                .devices
                .remove_if(&device_id, |_, e| !e.active)
                .is_some()
            {
                info!(device_id = %device_id, "evicted stale device");
                self.events.publish(Event::DeviceRemoved { device_id });
            }
        }
    }

    /// Drop all entries with no per-entry events (session teardown).
    pub fn clear(&self) {
        self.devices.clear();
    }

    // ── Proximity engine ───────────────────────────────────────

    /// Distance in meters between two known devices, or
    /// [`proxim_geo::DISTANCE_UNKNOWN`] when either id is absent.
    pub fn distance_between(&self, a: &str, b: &str) -> f64 {
        let a = self.get(a).map(|e| e.latest.position());
        let b = self.get(b).map(|e| e.latest.position());
        proxim_geo::distance_between(a.as_ref(), b.as_ref())
    }

    /// Relative-velocity estimate between two known devices, 0 when either
    /// id is absent.
    pub fn relative_velocity_between(&self, a: &str, b: &str) -> f64 {
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => proxim_geo::relative_velocity(&a.latest, &b.latest),
            _ => 0.0,
        }
    }

    /// Text report of the reference device against every other active
    /// device: distance, relative velocity, and a warning classification.
    pub fn proximity_report(&self, reference_id: &str) -> String {
        let Some(reference) = self.get(reference_id) else {
            return "no data for reference device".into();
        };

        let mut out = String::from("proximity report:\n");
        for other in self.active_devices() {
            if other.device_id == reference_id {
                continue;
            }
            let distance =
                proxim_geo::distance_meters(&reference.latest.position(), &other.latest.position());
            let rel_vel = proxim_geo::relative_velocity(&reference.latest, &other.latest);

            let id: String = other.device_id.chars().take(8).collect();
            out.push_str(&format!(
                "device {id}: distance {distance:.2} m, rel velocity {rel_vel:.2} m/s"
            ));
            match proximity::classify(distance, rel_vel) {
                proximity::ProximityClass::Approaching => {
                    out.push_str("  [WARNING: approaching!]");
                }
                proximity::ProximityClass::CloseProximity => {
                    out.push_str("  [CAUTION: close proximity]");
                }
                proximity::ProximityClass::Clear => {}
            }
            out.push('\n');
        }
        out
    }

    /// Human-readable roster of all active devices.
    pub fn devices_summary(&self) -> String {
        let active = self.active_devices();
        let mut out = format!("connected devices: {}\n", active.len());
        for entry in active {
            out.push_str(&entry.latest.summary());
            out.push('\n');
        }
        out
    }
}

/// Handle to a running liveness sweeper task.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the sweeper and wait for the task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Spawn the recurring liveness sweep for `registry`.
pub fn spawn_sweeper(registry: Arc<DeviceRegistry>, interval: Duration) -> SweeperHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => registry.sweep_timeouts(),
            }
        }
        debug!("liveness sweeper stopped");
    });
    SweeperHandle { cancel, task }
}
