use anyhow::Result;
#[cfg(feature = "mock")]
use mockall::automock;
use std::net::Ipv4Addr;
use trait_variant::make;

/// Network/port address translation engine.
///
/// `enable` binds the AP subnet (identified by its base address) to
/// whichever interface owns the default route. Calling it twice within
/// one boot is undefined; the caller owns the exactly-once discipline.
#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait NatClient {
    async fn enable(&self, subnet: Ipv4Addr, max_flows: u16) -> Result<()>;
}
