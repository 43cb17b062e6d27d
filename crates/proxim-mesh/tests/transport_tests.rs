#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    use proxim_config::schema::MeshConfig;
    use proxim_core::{Event, EventBus, ProximError, Report, Role};
    use proxim_mesh::MeshTransport;
    use proxim_registry::DeviceRegistry;

    fn mesh_config() -> MeshConfig {
        MeshConfig {
            port: 0,
            connect_timeout_ms: 1_000,
        }
    }

    fn node() -> (MeshTransport, Arc<DeviceRegistry>, EventBus) {
        let events = EventBus::default();
        let registry = Arc::new(DeviceRegistry::with_defaults(events.clone()));
        let transport = MeshTransport::new(mesh_config(), registry.clone(), events.clone());
        (transport, registry, events)
    }

    async fn start_hub() -> (MeshTransport, Arc<DeviceRegistry>, EventBus, SocketAddr) {
        let (hub, registry, events) = node();
        hub.assign_role(Role::Hub, None).await.unwrap();
        let addr = hub.local_addr().unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], addr.port()));
        (hub, registry, events, addr)
    }

    fn report(device_id: &str) -> Report {
        let mut r = Report::new(device_id, 1_700_000_000_000, 51.5074, -0.1278, 11.0, 5.0);
        r.add_measurement(4, 1_575_420_000.0, -7.25, 43.0);
        r
    }

    /// Poll `f` for up to two seconds.
    async fn wait_for(f: impl Fn() -> bool) -> bool {
        for _ in 0..200 {
            if f() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    // ── Hub / spoke data flow ──────────────────────────────────

    #[tokio::test]
    async fn test_spoke_report_reaches_hub_registry() {
        let (_hub, hub_registry, _events, addr) = start_hub().await;

        let (spoke, _spoke_registry, _spoke_events) = node();
        spoke.assign_role(Role::Spoke, Some(addr)).await.unwrap();
        assert_eq!(spoke.role(), Some(Role::Spoke));

        let delivered = spoke.send_data(&report("spoke-1")).await.unwrap();
        assert_eq!(delivered, 1);

        assert!(
            wait_for(|| hub_registry.get("spoke-1").is_some()).await,
            "hub registry never saw the spoke's report"
        );
        let entry = hub_registry.get("spoke-1").unwrap();
        assert_eq!(entry.latest.measurements.len(), 1);
    }

    #[tokio::test]
    async fn test_hub_relays_to_other_spokes_excluding_sender() {
        let (hub, hub_registry, _events, addr) = start_hub().await;

        let (spoke_a, registry_a, _ev_a) = node();
        let (spoke_b, registry_b, _ev_b) = node();
        spoke_a.assign_role(Role::Spoke, Some(addr)).await.unwrap();
        spoke_b.assign_role(Role::Spoke, Some(addr)).await.unwrap();
        assert!(wait_for(|| hub.connection_count() == 2).await);

        spoke_a.send_data(&report("alpha")).await.unwrap();

        // The hub consumes the record and relays it to the other spoke.
        assert!(wait_for(|| hub_registry.get("alpha").is_some()).await);
        assert!(
            wait_for(|| registry_b.get("alpha").is_some()).await,
            "relay never reached the second spoke"
        );
        // The sender must not get its own record back.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(registry_a.get("alpha").is_none());
    }

    #[tokio::test]
    async fn test_hub_broadcast_reaches_all_spokes() {
        let (hub, _hub_registry, _events, addr) = start_hub().await;

        let (spoke_a, registry_a, _ev_a) = node();
        let (spoke_b, registry_b, _ev_b) = node();
        spoke_a.assign_role(Role::Spoke, Some(addr)).await.unwrap();
        spoke_b.assign_role(Role::Spoke, Some(addr)).await.unwrap();
        assert!(wait_for(|| hub.connection_count() == 2).await);

        let delivered = hub.send_data(&report("hub-dev")).await.unwrap();
        assert_eq!(delivered, 2);

        assert!(wait_for(|| registry_a.get("hub-dev").is_some()).await);
        assert!(wait_for(|| registry_b.get("hub-dev").is_some()).await);
    }

    #[tokio::test]
    async fn test_dead_connection_removed_before_next_broadcast() {
        let (hub, _hub_registry, _events, addr) = start_hub().await;

        let (spoke_a, registry_a, _ev_a) = node();
        let (spoke_b, registry_b, _ev_b) = node();
        let (spoke_c, _registry_c, _ev_c) = node();
        spoke_a.assign_role(Role::Spoke, Some(addr)).await.unwrap();
        spoke_b.assign_role(Role::Spoke, Some(addr)).await.unwrap();
        spoke_c.assign_role(Role::Spoke, Some(addr)).await.unwrap();
        assert!(wait_for(|| hub.connection_count() == 3).await);

        // One spoke dies; its socket close must evict it from the set.
        spoke_c.disconnect().await;
        assert!(wait_for(|| hub.connection_count() == 2).await);

        // The remaining two still get the broadcast.
        let delivered = hub.send_data(&report("survivor")).await.unwrap();
        assert_eq!(delivered, 2);
        assert!(wait_for(|| registry_a.get("survivor").is_some()).await);
        assert!(wait_for(|| registry_b.get("survivor").is_some()).await);
    }

    // ── Malformed input ────────────────────────────────────────

    #[tokio::test]
    async fn test_malformed_record_dropped_stream_continues() {
        let (hub, hub_registry, _events, addr) = start_hub().await;

        let mut raw = TcpStream::connect(addr).await.unwrap();
        assert!(wait_for(|| hub.connection_count() == 1).await);

        raw.write_all(b"{this is not json\n").await.unwrap();
        let line = proxim_proto::encode(&report("after-garbage")).unwrap();
        raw.write_all(line.as_bytes()).await.unwrap();
        raw.write_all(b"\n").await.unwrap();
        raw.flush().await.unwrap();

        assert!(
            wait_for(|| hub_registry.get("after-garbage").is_some()).await,
            "valid record after garbage was not processed"
        );
        // The bad record must not have cost us the connection.
        assert_eq!(hub.connection_count(), 1);
    }

    // ── Role assignment & failure ──────────────────────────────

    #[tokio::test]
    async fn test_spoke_connect_failure_stays_idle() {
        let (spoke, _registry, events) = node();
        let mut rx = events.subscribe();

        // Nothing listens here.
        let addr = SocketAddr::from(([127, 0, 0, 1], 1));
        let result = spoke.assign_role(Role::Spoke, Some(addr)).await;
        assert!(matches!(result, Err(ProximError::Connect { .. })));
        assert_eq!(spoke.role(), None);
        assert_eq!(spoke.connection_count(), 0);

        let mut saw_status = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, Event::StatusChanged { .. }) {
                saw_status = true;
            }
        }
        assert!(saw_status, "connect failure must surface as a status event");
    }

    #[tokio::test]
    async fn test_spoke_without_hub_addr_is_config_error() {
        let (spoke, _registry, _events) = node();
        let result = spoke.assign_role(Role::Spoke, None).await;
        assert!(matches!(result, Err(ProximError::Config(_))));
    }

    #[tokio::test]
    async fn test_peer_connected_event_on_accept() {
        let (_hub, _hub_registry, events, addr) = start_hub().await;
        let mut rx = events.subscribe();

        let _raw = TcpStream::connect(addr).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Event::PeerConnected { .. } = rx.recv().await.unwrap() {
                    break;
                }
            }
        })
        .await;
        assert!(event.is_ok(), "no PeerConnected event observed");
    }

    // ── Teardown ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_disconnect_is_prompt_and_clears_state() {
        let (hub, _hub_registry, _events, addr) = start_hub().await;

        let (spoke, _spoke_registry, _spoke_events) = node();
        spoke.assign_role(Role::Spoke, Some(addr)).await.unwrap();
        assert!(wait_for(|| hub.connection_count() == 1).await);

        // Disconnect must not block on data arrival.
        tokio::time::timeout(Duration::from_secs(1), hub.disconnect())
            .await
            .expect("disconnect blocked");

        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.role(), None);
        assert!(hub.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_new_role_supersedes_old_session() {
        let (node_a, _reg, _ev) = node();
        node_a.assign_role(Role::Hub, None).await.unwrap();
        let first_addr = node_a.local_addr().unwrap();

        // Re-assignment tears the old listener down and starts fresh.
        node_a.assign_role(Role::Hub, None).await.unwrap();
        assert_eq!(node_a.role(), Some(Role::Hub));
        assert!(node_a.local_addr().is_some());
        let _ = first_addr;
    }
}
