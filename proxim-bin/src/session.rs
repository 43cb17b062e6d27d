use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use proxim_config::ProximConfig;
use proxim_core::{Event, EventBus, Result, Role};
use proxim_mesh::MeshTransport;
use proxim_registry::{DeviceRegistry, spawn_sweeper};

use crate::sensor::SyntheticSensor;

/// Start position of the synthetic sensor walk.
const ORIGIN: (f64, f64) = (48.1351, 11.5820);

/// Run one mesh session until ctrl-c: assign the role, share the local
/// report on its cadence, sweep the registry, and log what happens.
pub async fn run(config: ProximConfig, role: Role, hub_addr: Option<SocketAddr>) -> Result<()> {
    let device_id = config
        .device
        .device_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!(device_id = %device_id, role = %role, "starting proxim session");

    let events = EventBus::default();
    let registry = Arc::new(DeviceRegistry::new(
        Duration::from_millis(config.registry.device_timeout_ms),
        events.clone(),
    ));
    let transport = MeshTransport::new(config.mesh.clone(), registry.clone(), events.clone());

    transport.assign_role(role, hub_addr).await?;

    let sweeper = spawn_sweeper(
        registry.clone(),
        Duration::from_millis(config.registry.sweep_interval_ms),
    );

    // Mirror every event into the log (the stand-in for a display layer).
    let mut rx = events.subscribe();
    let event_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event consumer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut sensor = SyntheticSensor::new(&device_id, ORIGIN.0, ORIGIN.1);
    let mut share = tokio::time::interval(Duration::from_millis(config.reporting.share_interval_ms));
    let mut analysis = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            _ = share.tick() => {
                let report = sensor.next_report();
                registry.update(report.clone());
                match transport.send_data(&report).await {
                    Ok(delivered) => debug!(delivered, "shared local report"),
                    Err(e) => warn!(error = %e, "broadcast failed"),
                }
            }
            _ = analysis.tick() => {
                if registry.active_device_count() > 1 {
                    info!("\n{}", registry.proximity_report(&device_id));
                }
            }
        }
    }

    transport.disconnect().await;
    sweeper.shutdown().await;
    registry.clear();
    event_task.abort();
    Ok(())
}

fn log_event(event: &Event) {
    match event {
        Event::DeviceAdded { device_id } => info!(device_id = %device_id, "device joined"),
        Event::DeviceUpdated { device_id, report } => {
            debug!(device_id = %device_id, sats = report.measurements.len(), "device updated");
        }
        Event::DeviceRemoved { device_id } => info!(device_id = %device_id, "device timed out"),
        Event::PeerConnected { conn_id, addr } => {
            info!(conn_id, addr = %addr, "peer connected");
        }
        Event::PeerDisconnected { conn_id } => info!(conn_id, "peer disconnected"),
        Event::StatusChanged { status } => info!(status = %status, "status"),
    }
}
