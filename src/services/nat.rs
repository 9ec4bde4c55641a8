use crate::{
    config::NatConfig, nat_client::NatClient, netif::ApInterface, services::bringup::BringupError,
};
use log::info;

/// Turns on address translation between the AP subnet and the uplink.
pub struct NatEnabler;

impl NatEnabler {
    /// Must run exactly once per boot, after the AP broadcasts and the DNS
    /// relay is in place; the translation engine does not define what a
    /// second enable does.
    pub async fn enable<N: NatClient>(
        nat: &N,
        ap: &ApInterface,
        settings: &NatConfig,
    ) -> Result<(), BringupError> {
        nat.enable(ap.gateway, settings.max_flows).await?;

        info!(
            "nat enabled for subnet {} ({} tracked flows)",
            ap.gateway, settings.max_flows
        );

        Ok(())
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{nat_client::MockNatClient, netif::InterfaceHandle};
    use std::net::Ipv4Addr;

    fn ap_interface() -> ApInterface {
        ApInterface {
            handle: InterfaceHandle::new("ap0"),
            gateway: Ipv4Addr::new(192, 168, 4, 1),
        }
    }

    #[tokio::test]
    async fn forwards_subnet_and_flow_limit() {
        let mut nat = MockNatClient::new();
        nat.expect_enable()
            .withf(|subnet, max_flows| {
                *subnet == Ipv4Addr::new(192, 168, 4, 1) && *max_flows == 512
            })
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        NatEnabler::enable(&nat, &ap_interface(), &NatConfig { max_flows: 512 })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn surfaces_engine_failures() {
        let mut nat = MockNatClient::new();
        nat.expect_enable()
            .returning(|_, _| Box::pin(async { Err(anyhow::anyhow!("translation tables exhausted")) }));

        let err = NatEnabler::enable(&nat, &ap_interface(), &NatConfig { max_flows: 512 })
            .await
            .unwrap_err();

        assert!(matches!(err, BringupError::Collaborator(_)));
        assert!(err.to_string().contains("translation tables exhausted"));
    }
}
