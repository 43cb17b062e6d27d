#[cfg(test)]
mod tests {
    use proxim_core::{ProximError, Report};
    use proxim_proto::{decode, encode};

    fn sample_report() -> Report {
        let mut report = Report::new(
            "f3a1c9e2-device",
            1_700_000_123_456,
            52.520008,
            13.404954,
            34.7,
            2.25,
        );
        report.add_measurement(1, 1_575_420_000.0, 5.0, 42.0);
        report.add_measurement(2, 0.0, 3.0, 39.5);
        report
    }

    // ── Round-trip tests ───────────────────────────────────────

    #[test]
    fn test_roundtrip_preserves_report() {
        let report = sample_report();
        let line = encode(&report).unwrap();
        let restored = decode(&line).unwrap();
        assert_eq!(restored, report);
    }

    #[test]
    fn test_roundtrip_zero_measurements() {
        let report = Report::new("solo", 1, 0.0, 0.0, 0.0, 0.0);
        let line = encode(&report).unwrap();
        let restored = decode(&line).unwrap();
        assert_eq!(restored, report);
        assert!(restored.measurements.is_empty());
    }

    #[test]
    fn test_roundtrip_exact_doubles() {
        // Values with no short decimal form must survive exactly.
        let mut report = Report::new("precise", 9, 0.1 + 0.2, -0.000001234567891, 1e-300, 0.1);
        report.add_measurement(5, f64::MAX, f64::MIN_POSITIVE, -0.0);
        let restored = decode(&encode(&report).unwrap()).unwrap();
        assert_eq!(restored.latitude.to_bits(), report.latitude.to_bits());
        assert_eq!(restored.longitude.to_bits(), report.longitude.to_bits());
        assert_eq!(restored.altitude.to_bits(), report.altitude.to_bits());
        assert_eq!(
            restored.measurements[0].carrier_frequency_hz.to_bits(),
            report.measurements[0].carrier_frequency_hz.to_bits()
        );
    }

    #[test]
    fn test_measurement_order_preserved() {
        let mut report = Report::new("ordered", 2, 1.0, 2.0, 3.0, 4.0);
        for svid in [9, 3, 27, 1] {
            report.add_measurement(svid, 0.0, svid as f64, 30.0);
        }
        let restored = decode(&encode(&report).unwrap()).unwrap();
        let svids: Vec<i32> = restored.measurements.iter().map(|m| m.svid).collect();
        assert_eq!(svids, vec![9, 3, 27, 1]);
    }

    #[test]
    fn test_encode_is_single_line() {
        let line = encode(&sample_report()).unwrap();
        assert!(!line.contains('\n'));
    }

    // ── Failure tests ──────────────────────────────────────────

    #[test]
    fn test_encode_rejects_empty_device_id() {
        let report = Report::new("", 1, 0.0, 0.0, 0.0, 0.0);
        assert!(matches!(encode(&report), Err(ProximError::Encode(_))));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(matches!(
            decode("{not json"),
            Err(ProximError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        // No deviceId.
        let line = r#"{"timestamp":1,"latitude":0.0,"longitude":0.0,"altitude":0.0,"accuracy":0.0,"measurements":[]}"#;
        assert!(matches!(decode(line), Err(ProximError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_bad_numeric() {
        let line = r#"{"deviceId":"d","timestamp":1,"latitude":"north","longitude":0.0,"altitude":0.0,"accuracy":0.0,"measurements":[]}"#;
        assert!(matches!(decode(line), Err(ProximError::Decode(_))));
    }

    #[test]
    fn test_decode_accepts_wire_record() {
        // A record exactly as another implementation would emit it.
        let line = r#"{"deviceId":"peer-1","timestamp":1700000000000,"latitude":48.8566,"longitude":2.3522,"altitude":35.0,"accuracy":4.5,"measurements":[{"svid":3,"carrierFreq":1575420000.0,"prRate":-12.5,"cn0":44.0}]}"#;
        let report = decode(line).unwrap();
        assert_eq!(report.device_id, "peer-1");
        assert_eq!(report.measurements.len(), 1);
        assert_eq!(report.measurements[0].svid, 3);
        assert_eq!(report.measurements[0].pseudorange_rate, -12.5);
    }
}
