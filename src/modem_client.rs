use crate::netif::InterfaceHandle;
use anyhow::Result;
#[cfg(feature = "mock")]
use mockall::automock;
use std::net::Ipv4Addr;
use tokio::sync::watch;
use trait_variant::make;

/// Readiness of the cellular uplink as published by the modem driver.
///
/// Transitions monotonically from `Down` to `Ready` during bring-up; a
/// later regression is a link-loss event outside the boot sequence.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum UplinkState {
    #[default]
    Down,
    Ready(UplinkStatus),
}

impl UplinkState {
    pub fn is_ready(&self) -> bool {
        matches!(self, UplinkState::Ready(_))
    }

    pub fn status(&self) -> Option<&UplinkStatus> {
        match self {
            UplinkState::Ready(status) => Some(status),
            UplinkState::Down => None,
        }
    }
}

/// Link parameters reported once the modem has acquired an address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UplinkStatus {
    pub interface: InterfaceHandle,
    pub addr: Ipv4Addr,
    pub dns: Ipv4Addr,
}

#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait ModemClient {
    async fn power_up(&self) -> Result<()>;
    async fn open_data_session(&self) -> Result<()>;
    /// Level-triggered readiness signal: the receiver sees the current
    /// state immediately, so a transition raised before anyone subscribed
    /// is never missed.
    fn uplink(&self) -> watch::Receiver<UplinkState>;
    async fn deinit(&self) -> Result<()>;
}
