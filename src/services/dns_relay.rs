use crate::{dhcp_client::DhcpClient, netif::ApInterface, services::bringup::BringupError};
use log::info;
use std::net::Ipv4Addr;

/// Copies the uplink's resolved DNS server into the AP-side DHCP offer so
/// downstream clients resolve names via the cellular uplink.
pub struct DnsRelayConfigurator;

impl DnsRelayConfigurator {
    /// Sets `dns` as the offered DNS option and as the AP interface's own
    /// resolver. `dns` must come from a ready uplink; calling earlier is a
    /// programming error. Partial DHCP configuration is unsafe to proceed
    /// from, so the first rejection aborts.
    pub async fn relay_dns<D: DhcpClient>(
        dhcp: &D,
        ap: &ApInterface,
        dns: Ipv4Addr,
    ) -> Result<(), BringupError> {
        dhcp.set_dns_offer(ap.handle.clone(), dns)
            .await
            .map_err(|e| BringupError::DhcpConfigRejected(format!("dns offer: {e:#}")))?;

        dhcp.set_resolver(ap.handle.clone(), dns)
            .await
            .map_err(|e| BringupError::DhcpConfigRejected(format!("resolver: {e:#}")))?;

        info!("dhcp clients on {} will be offered dns {dns}", ap.handle);

        Ok(())
    }
}
