use crate::netif::{ApInterface, MacAddr};
use anyhow::Result;
#[cfg(feature = "mock")]
use mockall::automock;
use std::sync::Arc;
use trait_variant::make;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WifiMode {
    AccessPoint,
    Station,
}

/// Authentication mode applied to the broadcast network.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthMode {
    Open,
    /// WPA2-PSK with WPA fallback accepted.
    WpaWpa2Psk,
}

/// Radio-level access point parameters, applied in a single call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApRadioConfig {
    pub ssid: String,
    pub passphrase: String,
    pub channel: u8,
    pub max_clients: u8,
    pub auth_mode: AuthMode,
}

/// A station joined or left the access point.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StationEvent {
    pub mac: MacAddr,
    pub aid: u16,
    pub joined: bool,
}

/// Callback contract for station events.
///
/// Invoked from whatever execution context the radio driver delivers
/// events on; implementations must be cheap, thread-safe and must not
/// touch sequencer state.
pub trait StationEventObserver: Send + Sync {
    fn on_station_event(&self, event: StationEvent);
}

#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait WifiClient {
    async fn init(&self) -> Result<()>;
    async fn register_station_observer(
        &self,
        observer: Arc<dyn StationEventObserver>,
    ) -> Result<()>;
    async fn set_mode(&self, mode: WifiMode) -> Result<()>;
    /// Overrides the radio MAC. Must be applied before `start` so the
    /// first beacon already carries the override.
    async fn set_mac(&self, mac: MacAddr) -> Result<()>;
    async fn configure_ap(&self, config: ApRadioConfig) -> Result<()>;
    async fn start(&self) -> Result<ApInterface>;
}
