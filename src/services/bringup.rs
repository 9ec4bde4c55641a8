use crate::{
    config::AppConfig,
    dhcp_client::DhcpClient,
    modem_client::ModemClient,
    nat_client::NatClient,
    services::{
        access_point::AccessPointConfigurator, dns_relay::DnsRelayConfigurator,
        identity::IdentityGenerator, nat::NatEnabler, uplink::UplinkWaiter,
    },
    storage_client::StorageClient,
    wifi_client::WifiClient,
};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::time::interval;

const STEADY_TICK: Duration = Duration::from_secs(1);

/// Where the boot sequence currently stands. Strictly linear; a failed
/// step leaves the machine parked on the last phase it reached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BringupPhase {
    Boot,
    IdentityReady,
    UplinkReady,
    ApBroadcasting,
    DnsRelayed,
    NatActive,
    Steady,
}

impl BringupPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BringupPhase::Steady)
    }
}

impl std::fmt::Display for BringupPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BringupPhase::Boot => "boot",
            BringupPhase::IdentityReady => "identity-ready",
            BringupPhase::UplinkReady => "uplink-ready",
            BringupPhase::ApBroadcasting => "ap-broadcasting",
            BringupPhase::DnsRelayed => "dns-relayed",
            BringupPhase::NatActive => "nat-active",
            BringupPhase::Steady => "steady",
        };
        f.write_str(name)
    }
}

/// Fatal bring-up conditions. None of these are recoverable at the
/// sequencer level; there is no degraded partial-hotspot mode.
#[derive(Debug, Error)]
pub enum BringupError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),
    #[error("uplink not ready within {0:?}")]
    UplinkTimeout(Duration),
    #[error("modem dropped the uplink readiness signal")]
    UplinkSignalLost,
    #[error("radio rejected the access point configuration: {0}")]
    RadioConfigRejected(String),
    #[error("dhcp rejected the dns relay configuration: {0}")]
    DhcpConfigRejected(String),
    #[error("persistent storage failed to initialize: {0}")]
    StorageInitFailed(String),
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

/// Orchestrates the boot: storage, identity, modem, radio, DNS relay,
/// NAT, in that order, each step gated on the previous one.
///
/// Invoked exactly once per process lifetime on a single logical flow;
/// the only suspension points are the uplink wait and the steady tick.
pub struct BringupSequencer<M, W, D, N, S> {
    config: AppConfig,
    modem: M,
    wifi: W,
    dhcp: D,
    nat: N,
    storage: S,
    phase: BringupPhase,
}

impl<M, W, D, N, S> BringupSequencer<M, W, D, N, S>
where
    M: ModemClient,
    W: WifiClient,
    D: DhcpClient,
    N: NatClient,
    S: StorageClient,
{
    pub fn new(config: AppConfig, modem: M, wifi: W, dhcp: D, nat: N, storage: S) -> Self {
        Self {
            config,
            modem,
            wifi,
            dhcp,
            nat,
            storage,
            phase: BringupPhase::Boot,
        }
    }

    pub fn phase(&self) -> BringupPhase {
        self.phase
    }

    fn advance(&mut self, phase: BringupPhase) {
        debug!("bring-up phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    /// Runs the strictly ordered bring-up until NAT is active.
    pub async fn bring_up(&mut self) -> Result<(), BringupError> {
        // 1. the persistent store must be usable before any collaborator
        //    that might read persisted state
        self.init_storage().await?;

        // 2. fresh identity for this boot
        let identity = IdentityGenerator::generate(&self.config.identity)?;
        info!("generated identity: ssid={} mac={}", identity.ssid, identity.mac);
        self.advance(BringupPhase::IdentityReady);

        // 3. modem up, then block on the level-triggered readiness signal
        self.modem
            .power_up()
            .await
            .context("modem power-up failed")?;
        self.modem
            .open_data_session()
            .await
            .context("modem data session failed")?;

        let waiter = UplinkWaiter::new(self.modem.uplink(), self.config.uplink.ready_timeout());
        let uplink = waiter.await_ready().await?;
        info!(
            "uplink ready: {} addr={} dns={}",
            uplink.interface, uplink.addr, uplink.dns
        );
        self.advance(BringupPhase::UplinkReady);

        // 4. radio up with the generated identity
        let session = AccessPointConfigurator::configure_and_start(
            &self.wifi,
            &self.config.access_point,
            identity,
        )
        .await?;
        self.advance(BringupPhase::ApBroadcasting);

        // 5. downstream clients resolve through the uplink's dns
        DnsRelayConfigurator::relay_dns(&self.dhcp, session.interface(), uplink.dns).await?;
        self.advance(BringupPhase::DnsRelayed);

        // 6. translation last: an ap that cannot resolve names or accept
        //    clients must not forward traffic
        NatEnabler::enable(&self.nat, session.interface(), &self.config.nat).await?;
        self.advance(BringupPhase::NatActive);

        info!("hotspot active");

        Ok(())
    }

    /// Completes bring-up, then parks in the steady idle loop. Returns
    /// only on a bring-up failure; steady state never exits on its own.
    pub async fn run(&mut self) -> Result<(), BringupError> {
        self.bring_up().await?;
        self.advance(BringupPhase::Steady);

        let mut tick = interval(STEADY_TICK);
        loop {
            tick.tick().await;
        }
    }

    /// Releases the modem. Called when a signal interrupts the steady
    /// loop; radio and NAT state die with the process.
    pub async fn shutdown(&self) -> Result<()> {
        self.modem.deinit().await.context("modem deinit failed")?;
        info!("modem released");
        Ok(())
    }

    async fn init_storage(&self) -> Result<(), BringupError> {
        match self.storage.init().await {
            Ok(()) => {
                debug!("storage initialized");
                Ok(())
            }
            Err(e) if e.erase_recovers() => {
                warn!("storage init failed ({e}), erasing and retrying");
                self.storage
                    .erase()
                    .await
                    .map_err(|e| BringupError::StorageInitFailed(format!("erase failed: {e:#}")))?;
                self.storage
                    .init()
                    .await
                    .map_err(|e| BringupError::StorageInitFailed(format!("after erase: {e:#}")))?;
                debug!("storage initialized after erase");
                Ok(())
            }
            Err(e) => Err(BringupError::StorageInitFailed(format!("{e:#}"))),
        }
    }
}
