use std::{fmt, net::Ipv4Addr};

/// Handle identifying a network interface owned by a collaborator.
///
/// DHCP settings are keyed by this handle, and the uplink status carries
/// the modem's handle so callers can tell the two interfaces apart.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct InterfaceHandle(String);

impl InterfaceHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 6-byte IEEE 802 MAC address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Builds a locally-administered unicast address from raw bytes:
    /// bit 1 of the first octet set, bit 0 cleared.
    pub const fn locally_administered(mut octets: [u8; 6]) -> Self {
        octets[0] = (octets[0] | 0x02) & 0xFE;
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub const fn is_unicast(&self) -> bool {
        self.0[0] & 0x01 == 0
    }

    pub const fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 == 0x02
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// The access-point-side interface as reported by the radio after start.
///
/// `gateway` is the AP subnet base address; it is what DHCP hands out as
/// the default route and what NAT translates behind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApInterface {
    pub handle: InterfaceHandle,
    pub gateway: Ipv4Addr,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod mac_addr {
        use super::*;

        #[test]
        fn displays_as_lowercase_colon_hex() {
            let mac = MacAddr::new([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x42]);
            assert_eq!(mac.to_string(), "de:ad:be:ef:00:42");
        }

        #[test]
        fn locally_administered_sets_and_clears_first_octet_bits() {
            let mac = MacAddr::locally_administered([0xFF; 6]);
            assert_eq!(mac.octets()[0], 0xFE);
            assert!(mac.is_unicast());
            assert!(mac.is_locally_administered());
        }

        #[test]
        fn locally_administered_preserves_remaining_octets() {
            let mac = MacAddr::locally_administered([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
            assert_eq!(mac.octets()[1..], [0x11, 0x22, 0x33, 0x44, 0x55]);
        }
    }

    mod interface_handle {
        use super::*;

        #[test]
        fn compares_by_name() {
            assert_eq!(InterfaceHandle::new("ap0"), InterfaceHandle::new("ap0"));
            assert_ne!(InterfaceHandle::new("ap0"), InterfaceHandle::new("wwan0"));
        }

        #[test]
        fn displays_the_name() {
            assert_eq!(InterfaceHandle::new("wwan0").to_string(), "wwan0");
        }
    }
}
