use crate::{
    config::AccessPointConfig,
    netif::ApInterface,
    services::{
        bringup::BringupError,
        identity::NetworkIdentity,
        stations::{spawn_station_logger, station_event_queue},
    },
    wifi_client::{ApRadioConfig, AuthMode, WifiClient, WifiMode},
};
use log::{debug, info};

/// Radio lifecycle within one boot. Transitions are one-directional;
/// only a process restart returns to `Uninitialized`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApState {
    Uninitialized,
    Configured,
    Broadcasting,
}

impl std::fmt::Display for ApState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApState::Uninitialized => write!(f, "uninitialized"),
            ApState::Configured => write!(f, "configured"),
            ApState::Broadcasting => write!(f, "broadcasting"),
        }
    }
}

/// A broadcasting access point and the interface it serves.
#[derive(Clone, Debug)]
pub struct ApSession {
    interface: ApInterface,
    state: ApState,
}

impl ApSession {
    pub fn interface(&self) -> &ApInterface {
        &self.interface
    }

    pub fn state(&self) -> ApState {
        self.state
    }
}

/// Decides the authentication mode from the passphrase.
///
/// Empty selects an open network; 8 to 63 characters select WPA2-PSK
/// (mixed WPA/WPA2 accepted). Anything else is rejected here, before the
/// driver sees it.
pub fn auth_mode_for(passphrase: &str) -> Result<AuthMode, BringupError> {
    match passphrase.len() {
        0 => Ok(AuthMode::Open),
        8..=63 => Ok(AuthMode::WpaWpa2Psk),
        n => Err(BringupError::RadioConfigRejected(format!(
            "passphrase length {n} outside the WPA2-PSK 8..=63 window"
        ))),
    }
}

fn rejected(step: &str) -> impl FnOnce(anyhow::Error) -> BringupError + '_ {
    move |e| BringupError::RadioConfigRejected(format!("{step}: {e:#}"))
}

/// Applies a generated identity to the radio and starts broadcasting.
pub struct AccessPointConfigurator;

impl AccessPointConfigurator {
    /// Drives the radio through its contract order: init, observer
    /// registration, mode, MAC override, configuration, start. The MAC is
    /// applied before start so the very first beacon carries it. Any
    /// driver rejection is fatal; there is no half-configured recovery.
    pub async fn configure_and_start<W: WifiClient>(
        wifi: &W,
        settings: &AccessPointConfig,
        identity: NetworkIdentity,
    ) -> Result<ApSession, BringupError> {
        let auth_mode = auth_mode_for(&identity.passphrase)?;

        let mut state = ApState::Uninitialized;
        debug!("ap state: {state}");

        wifi.init().await.map_err(rejected("radio init"))?;

        let (observer, events) = station_event_queue();
        wifi.register_station_observer(observer)
            .await
            .map_err(rejected("station observer registration"))?;
        spawn_station_logger(events);

        wifi.set_mode(WifiMode::AccessPoint)
            .await
            .map_err(rejected("mode selection"))?;

        let NetworkIdentity {
            ssid,
            passphrase,
            mac,
        } = identity;

        wifi.set_mac(mac).await.map_err(rejected("mac override"))?;
        debug!("radio mac set to {mac}");

        wifi.configure_ap(ApRadioConfig {
            ssid: ssid.clone(),
            passphrase,
            channel: settings.channel,
            max_clients: settings.max_clients,
            auth_mode,
        })
        .await
        .map_err(rejected("ap configuration"))?;
        state = ApState::Configured;
        debug!("ap state: {state}, auth mode {auth_mode:?}");

        let interface = wifi.start().await.map_err(rejected("radio start"))?;
        state = ApState::Broadcasting;

        info!(
            "access point broadcasting: ssid={ssid} channel={} mac={mac}",
            settings.channel
        );

        Ok(ApSession { interface, state })
    }
}
