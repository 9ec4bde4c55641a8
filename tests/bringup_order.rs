use hotspot_bringup::{
    config::{
        AccessPointConfig, AppConfig, IdentityConfig, NatConfig, StorageConfig, UplinkConfig,
    },
    services::bringup::BringupSequencer,
    sim::{SimEvent, SimRig, SimUplinkProfile},
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn test_config() -> AppConfig {
    AppConfig {
        identity: IdentityConfig {
            ssid_length: 7,
            passphrase_length: 8,
        },
        access_point: AccessPointConfig {
            channel: 1,
            max_clients: 4,
        },
        uplink: UplinkConfig {
            ready_timeout_ms: Some(5_000),
        },
        nat: NatConfig { max_flows: 512 },
        storage: StorageConfig {
            data_dir: std::env::temp_dir().join("hotspot-bringup-order-test"),
            capacity_bytes: 24_576,
        },
    }
}

fn jittered_latency() -> Duration {
    // 0..=11ms derived from the clock; zero exercises the case where the
    // uplink is ready before anyone waits on it
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    Duration::from_millis(u64::from(nanos) % 12)
}

#[tokio::test]
async fn a_hundred_jittered_boots_preserve_the_bringup_order() {
    for boot in 0..100 {
        let profile = SimUplinkProfile {
            latency: jittered_latency(),
            ..SimUplinkProfile::default()
        };
        let rig = SimRig::new(profile);
        let mut sequencer = BringupSequencer::new(
            test_config(),
            rig.modem.clone(),
            rig.wifi.clone(),
            rig.dhcp.clone(),
            rig.nat.clone(),
            rig.storage.clone(),
        );

        sequencer
            .bring_up()
            .await
            .unwrap_or_else(|e| panic!("boot {boot} failed: {e}"));

        let journal = rig.journal;
        let storage = journal.position(|e| *e == SimEvent::StorageInit).unwrap();
        let session = journal.position(|e| *e == SimEvent::SessionOpened).unwrap();
        let mac = journal
            .position(|e| matches!(e, SimEvent::MacApplied(_)))
            .unwrap();
        let configured = journal
            .position(|e| matches!(e, SimEvent::ApConfigured { .. }))
            .unwrap();
        let started = journal.position(|e| *e == SimEvent::ApStarted).unwrap();
        let offer = journal
            .position(|e| matches!(e, SimEvent::DnsOfferSet { .. }))
            .unwrap();
        let resolver = journal
            .position(|e| matches!(e, SimEvent::ResolverSet { .. }))
            .unwrap();
        let nat = journal
            .position(|e| matches!(e, SimEvent::NatEnabled { .. }))
            .unwrap();

        assert_eq!(storage, 0, "boot {boot}: storage must initialize first");
        assert!(session < mac, "boot {boot}: radio touched before the uplink");
        assert!(mac < configured, "boot {boot}: configure before mac override");
        assert!(configured < started, "boot {boot}: start before configure");
        assert!(started < offer, "boot {boot}: dns offered before broadcast");
        assert!(offer < resolver, "boot {boot}: resolver before dns offer");
        assert!(resolver < nat, "boot {boot}: nat enabled before dns relay");
        assert_eq!(
            journal.count(|e| matches!(e, SimEvent::NatEnabled { .. })),
            1,
            "boot {boot}: nat must be enabled exactly once"
        );
    }
}

#[tokio::test]
async fn an_uplink_ready_before_the_wait_is_not_missed() {
    let profile = SimUplinkProfile {
        latency: Duration::ZERO,
        ..SimUplinkProfile::default()
    };
    let rig = SimRig::new(profile);
    let mut sequencer = BringupSequencer::new(
        test_config(),
        rig.modem.clone(),
        rig.wifi.clone(),
        rig.dhcp.clone(),
        rig.nat.clone(),
        rig.storage.clone(),
    );

    sequencer.bring_up().await.unwrap();
    assert_eq!(rig.journal.count(|e| *e == SimEvent::ApStarted), 1);
}
