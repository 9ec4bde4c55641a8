use crate::netif::InterfaceHandle;
use anyhow::Result;
#[cfg(feature = "mock")]
use mockall::automock;
use std::net::Ipv4Addr;
use trait_variant::make;

/// Address-assignment service on the access point side.
///
/// Both setters are keyed by the interface the DHCP server runs on; the
/// offered DNS option and the interface's own resolver are configured
/// separately because downstream clients and the host itself resolve
/// through different paths.
#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait DhcpClient {
    async fn set_dns_offer(&self, interface: InterfaceHandle, dns: Ipv4Addr) -> Result<()>;
    async fn set_resolver(&self, interface: InterfaceHandle, dns: Ipv4Addr) -> Result<()>;
}
