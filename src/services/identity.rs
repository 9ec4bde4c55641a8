use crate::{config::IdentityConfig, netif::MacAddr, services::bringup::BringupError};
use rand_core::{OsRng, TryRngCore};

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// Largest multiple of the 62-symbol alphabet size that fits in a byte;
// bytes at or above it are redrawn to keep the distribution uniform
const REJECTION_LIMIT: u8 = 248;

/// The identity a single boot broadcasts: SSID, passphrase and radio MAC.
///
/// Created once per boot, immutable afterwards, and moved into the access
/// point configurator when the radio is brought up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkIdentity {
    pub ssid: String,
    pub passphrase: String,
    pub mac: MacAddr,
}

/// Draws a fresh [`NetworkIdentity`] from the OS entropy source.
pub struct IdentityGenerator;

impl IdentityGenerator {
    /// Generates SSID and passphrase of the configured lengths from the
    /// 62-symbol alphanumeric alphabet, plus a locally-administered
    /// unicast MAC.
    pub fn generate(settings: &IdentityConfig) -> Result<NetworkIdentity, BringupError> {
        let ssid = random_string(settings.ssid_length)?;
        let passphrase = random_string(settings.passphrase_length)?;
        let mac = random_mac()?;

        Ok(NetworkIdentity {
            ssid,
            passphrase,
            mac,
        })
    }
}

fn random_string(len: usize) -> Result<String, BringupError> {
    let mut out = String::with_capacity(len);

    while out.len() < len {
        let mut buf = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| BringupError::EntropyUnavailable(e.to_string()))?;

        for byte in buf {
            if out.len() == len {
                break;
            }
            if byte < REJECTION_LIMIT {
                out.push(ALPHANUMERIC[(byte % 62) as usize] as char);
            }
        }
    }

    Ok(out)
}

fn random_mac() -> Result<MacAddr, BringupError> {
    let mut octets = [0u8; 6];
    OsRng
        .try_fill_bytes(&mut octets)
        .map_err(|e| BringupError::EntropyUnavailable(e.to_string()))?;

    Ok(MacAddr::locally_administered(octets))
}
