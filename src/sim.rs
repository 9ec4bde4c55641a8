//! Simulated device collaborators
//!
//! In-process stand-ins for the modem, radio, DHCP server, NAT engine
//! and flash store, faithful to the sequencing rules the real drivers
//! enforce. Every call is recorded in a shared [`Journal`] so tests can
//! assert on the total order of hardware-facing operations.

use crate::{
    dhcp_client::DhcpClient,
    modem_client::{ModemClient, UplinkState, UplinkStatus},
    nat_client::NatClient,
    netif::{ApInterface, InterfaceHandle, MacAddr},
    storage_client::{StorageClient, StorageInitError},
    wifi_client::{ApRadioConfig, AuthMode, StationEvent, StationEventObserver, WifiClient, WifiMode},
};
use anyhow::{ensure, Context, Result};
use std::{
    collections::{HashMap, VecDeque},
    env,
    net::Ipv4Addr,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{sync::watch, time::sleep};

const AP_IFACE_NAME: &str = "ap0";
const AP_GATEWAY: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

/// Shape of the simulated cellular uplink.
#[derive(Clone, Debug)]
pub struct SimUplinkProfile {
    pub iface: String,
    pub addr: Ipv4Addr,
    pub dns: Ipv4Addr,
    /// Delay between opening the data session and the ready signal.
    pub latency: Duration,
}

impl Default for SimUplinkProfile {
    fn default() -> Self {
        Self {
            iface: "wwan0".to_string(),
            addr: Ipv4Addr::new(198, 51, 100, 4),
            dns: Ipv4Addr::new(198, 51, 100, 1),
            latency: Duration::from_millis(800),
        }
    }
}

impl SimUplinkProfile {
    pub fn from_env() -> Result<Self> {
        let iface = env::var("SIM_UPLINK_IFACE").unwrap_or_else(|_| "wwan0".to_string());

        let addr = env::var("SIM_UPLINK_ADDR")
            .unwrap_or_else(|_| "198.51.100.4".to_string())
            .parse()
            .context("failed to parse SIM_UPLINK_ADDR: invalid format")?;

        let dns = env::var("SIM_UPLINK_DNS")
            .unwrap_or_else(|_| "198.51.100.1".to_string())
            .parse()
            .context("failed to parse SIM_UPLINK_DNS: invalid format")?;

        let latency_ms: u64 = env::var("SIM_UPLINK_LATENCY_MS")
            .unwrap_or_else(|_| "800".to_string())
            .parse()
            .context("failed to parse SIM_UPLINK_LATENCY_MS: invalid format")?;

        Ok(Self {
            iface,
            addr,
            dns,
            latency: Duration::from_millis(latency_ms),
        })
    }
}

/// One hardware-facing operation observed by a simulated collaborator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SimEvent {
    StorageInit,
    StorageErase,
    ModemPowerUp,
    SessionOpened,
    ModemDeinit,
    ApInit,
    ObserverRegistered,
    ModeSet(WifiMode),
    MacApplied(MacAddr),
    ApConfigured { channel: u8 },
    ApStarted,
    DnsOfferSet { interface: InterfaceHandle, dns: Ipv4Addr },
    ResolverSet { interface: InterfaceHandle, dns: Ipv4Addr },
    NatEnabled { subnet: Ipv4Addr, max_flows: u16 },
}

/// Totally ordered trace of every simulated operation.
///
/// All collaborators of one [`SimRig`] share a journal, so the relative
/// position of two events reflects the real call order across devices.
#[derive(Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<SimEvent>>>,
}

impl Journal {
    fn record(&self, event: SimEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Index of the first event matching `pred`, if any was recorded.
    pub fn position(&self, pred: impl Fn(&SimEvent) -> bool) -> Option<usize> {
        self.events.lock().unwrap().iter().position(pred)
    }

    pub fn count(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

/// Cellular modem publishing uplink readiness over a watch channel.
///
/// The ready signal is raised from a background task `latency` after the
/// data session opens, so subscribers exercise the same race the real
/// driver produces.
#[derive(Clone)]
pub struct SimModem {
    profile: SimUplinkProfile,
    powered: Arc<Mutex<bool>>,
    uplink_tx: Arc<watch::Sender<UplinkState>>,
    journal: Journal,
}

impl SimModem {
    fn new(profile: SimUplinkProfile, journal: Journal) -> Self {
        let (tx, _) = watch::channel(UplinkState::Down);
        Self {
            profile,
            powered: Arc::new(Mutex::new(false)),
            uplink_tx: Arc::new(tx),
            journal,
        }
    }
}

impl ModemClient for SimModem {
    async fn power_up(&self) -> Result<()> {
        *self.powered.lock().unwrap() = true;
        self.journal.record(SimEvent::ModemPowerUp);
        Ok(())
    }

    async fn open_data_session(&self) -> Result<()> {
        ensure!(*self.powered.lock().unwrap(), "modem not powered");
        self.journal.record(SimEvent::SessionOpened);

        let status = UplinkStatus {
            interface: InterfaceHandle::new(self.profile.iface.clone()),
            addr: self.profile.addr,
            dns: self.profile.dns,
        };
        let latency = self.profile.latency;
        let tx = self.uplink_tx.clone();
        tokio::spawn(async move {
            sleep(latency).await;
            tx.send_replace(UplinkState::Ready(status));
        });
        Ok(())
    }

    fn uplink(&self) -> watch::Receiver<UplinkState> {
        self.uplink_tx.subscribe()
    }

    async fn deinit(&self) -> Result<()> {
        self.uplink_tx.send_replace(UplinkState::Down);
        *self.powered.lock().unwrap() = false;
        self.journal.record(SimEvent::ModemDeinit);
        Ok(())
    }
}

#[derive(Default)]
struct RadioState {
    initialized: bool,
    mode: Option<WifiMode>,
    mac: Option<MacAddr>,
    config: Option<ApRadioConfig>,
    broadcasting: bool,
    observer: Option<Arc<dyn StationEventObserver>>,
}

/// Wi-Fi radio enforcing the driver's sequencing and parameter limits.
#[derive(Clone)]
pub struct SimWifiRadio {
    state: Arc<Mutex<RadioState>>,
    journal: Journal,
}

impl SimWifiRadio {
    fn new(journal: Journal) -> Self {
        Self {
            state: Arc::new(Mutex::new(RadioState::default())),
            journal,
        }
    }

    /// Delivers a station event the way the driver would: synchronously,
    /// on the caller's thread, to whatever observer is registered.
    pub fn inject_station_event(&self, event: StationEvent) {
        let observer = self.state.lock().unwrap().observer.clone();
        if let Some(observer) = observer {
            observer.on_station_event(event);
        }
    }

    pub fn broadcasting(&self) -> bool {
        self.state.lock().unwrap().broadcasting
    }

    pub fn applied_mac(&self) -> Option<MacAddr> {
        self.state.lock().unwrap().mac
    }

    pub fn applied_config(&self) -> Option<ApRadioConfig> {
        self.state.lock().unwrap().config.clone()
    }
}

impl WifiClient for SimWifiRadio {
    async fn init(&self) -> Result<()> {
        self.state.lock().unwrap().initialized = true;
        self.journal.record(SimEvent::ApInit);
        Ok(())
    }

    async fn register_station_observer(
        &self,
        observer: Arc<dyn StationEventObserver>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        ensure!(state.initialized, "radio not initialized");
        state.observer = Some(observer);
        drop(state);
        self.journal.record(SimEvent::ObserverRegistered);
        Ok(())
    }

    async fn set_mode(&self, mode: WifiMode) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        ensure!(state.initialized, "radio not initialized");
        state.mode = Some(mode);
        drop(state);
        self.journal.record(SimEvent::ModeSet(mode));
        Ok(())
    }

    async fn set_mac(&self, mac: MacAddr) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        ensure!(state.initialized, "radio not initialized");
        ensure!(!state.broadcasting, "mac change refused while broadcasting");
        state.mac = Some(mac);
        drop(state);
        self.journal.record(SimEvent::MacApplied(mac));
        Ok(())
    }

    async fn configure_ap(&self, config: ApRadioConfig) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        ensure!(state.initialized, "radio not initialized");
        ensure!(
            state.mode == Some(WifiMode::AccessPoint),
            "radio not in access point mode"
        );
        ensure!(
            (1..=13).contains(&config.channel),
            "channel {} out of range",
            config.channel
        );
        ensure!(
            !config.ssid.is_empty() && config.ssid.len() <= 32,
            "ssid length {} unsupported",
            config.ssid.len()
        );
        ensure!(
            (1..=10).contains(&config.max_clients),
            "station limit {} unsupported",
            config.max_clients
        );
        if config.auth_mode == AuthMode::WpaWpa2Psk {
            ensure!(
                (8..=63).contains(&config.passphrase.len()),
                "wpa2 passphrase length {} rejected",
                config.passphrase.len()
            );
        }
        let channel = config.channel;
        state.config = Some(config);
        drop(state);
        self.journal.record(SimEvent::ApConfigured { channel });
        Ok(())
    }

    async fn start(&self) -> Result<ApInterface> {
        let mut state = self.state.lock().unwrap();
        ensure!(state.config.is_some(), "start before configure");
        ensure!(!state.broadcasting, "already broadcasting");
        state.broadcasting = true;
        drop(state);
        self.journal.record(SimEvent::ApStarted);

        Ok(ApInterface {
            handle: InterfaceHandle::new(AP_IFACE_NAME),
            gateway: AP_GATEWAY,
        })
    }
}

#[derive(Default)]
struct DhcpState {
    offers: HashMap<InterfaceHandle, Ipv4Addr>,
    resolvers: HashMap<InterfaceHandle, Ipv4Addr>,
    reject: bool,
}

/// DHCP server keeping per-interface option state.
#[derive(Clone)]
pub struct SimDhcpServer {
    state: Arc<Mutex<DhcpState>>,
    journal: Journal,
}

impl SimDhcpServer {
    fn new(journal: Journal) -> Self {
        Self {
            state: Arc::new(Mutex::new(DhcpState::default())),
            journal,
        }
    }

    /// Makes every subsequent setter fail, as an exhausted option space
    /// would.
    pub fn set_reject(&self) {
        self.state.lock().unwrap().reject = true;
    }

    pub fn offered_dns(&self, interface: &InterfaceHandle) -> Option<Ipv4Addr> {
        self.state.lock().unwrap().offers.get(interface).copied()
    }

    pub fn resolver(&self, interface: &InterfaceHandle) -> Option<Ipv4Addr> {
        self.state.lock().unwrap().resolvers.get(interface).copied()
    }
}

impl DhcpClient for SimDhcpServer {
    async fn set_dns_offer(&self, interface: InterfaceHandle, dns: Ipv4Addr) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        ensure!(!state.reject, "option space exhausted");
        state.offers.insert(interface.clone(), dns);
        drop(state);
        self.journal.record(SimEvent::DnsOfferSet { interface, dns });
        Ok(())
    }

    async fn set_resolver(&self, interface: InterfaceHandle, dns: Ipv4Addr) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        ensure!(!state.reject, "option space exhausted");
        state.resolvers.insert(interface.clone(), dns);
        drop(state);
        self.journal.record(SimEvent::ResolverSet { interface, dns });
        Ok(())
    }
}

/// The subnet-to-uplink binding held by the translation engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NatBinding {
    pub subnet: Ipv4Addr,
    pub max_flows: u16,
}

/// NAT engine accepting exactly one binding per boot.
#[derive(Clone)]
pub struct SimNat {
    binding: Arc<Mutex<Option<NatBinding>>>,
    journal: Journal,
}

impl SimNat {
    fn new(journal: Journal) -> Self {
        Self {
            binding: Arc::new(Mutex::new(None)),
            journal,
        }
    }

    pub fn binding(&self) -> Option<NatBinding> {
        *self.binding.lock().unwrap()
    }
}

impl NatClient for SimNat {
    async fn enable(&self, subnet: Ipv4Addr, max_flows: u16) -> Result<()> {
        let mut binding = self.binding.lock().unwrap();
        ensure!(binding.is_none(), "nat already enabled");
        *binding = Some(NatBinding { subnet, max_flows });
        drop(binding);
        self.journal.record(SimEvent::NatEnabled { subnet, max_flows });
        Ok(())
    }
}

/// Flash-backed store whose init outcomes can be scripted per call.
///
/// With no scripted outcomes every init succeeds; each scripted error is
/// consumed by exactly one init attempt, in order.
#[derive(Clone)]
pub struct SimFlashStore {
    outcomes: Arc<Mutex<VecDeque<StorageInitError>>>,
    journal: Journal,
}

impl SimFlashStore {
    fn new(journal: Journal) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            journal,
        }
    }

    pub fn fail_init_with(&self, errors: impl IntoIterator<Item = StorageInitError>) {
        self.outcomes.lock().unwrap().extend(errors);
    }
}

impl StorageClient for SimFlashStore {
    async fn init(&self) -> Result<(), StorageInitError> {
        self.journal.record(SimEvent::StorageInit);
        match self.outcomes.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn erase(&self) -> Result<()> {
        self.journal.record(SimEvent::StorageErase);
        Ok(())
    }
}

/// The full simulated device: one instance of every collaborator wired
/// to a shared journal.
pub struct SimRig {
    pub modem: SimModem,
    pub wifi: SimWifiRadio,
    pub dhcp: SimDhcpServer,
    pub nat: SimNat,
    pub storage: SimFlashStore,
    pub journal: Journal,
}

impl SimRig {
    pub fn new(profile: SimUplinkProfile) -> Self {
        let journal = Journal::default();
        Self {
            modem: SimModem::new(profile, journal.clone()),
            wifi: SimWifiRadio::new(journal.clone()),
            dhcp: SimDhcpServer::new(journal.clone()),
            nat: SimNat::new(journal.clone()),
            storage: SimFlashStore::new(journal.clone()),
            journal,
        }
    }
}
