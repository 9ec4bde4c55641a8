use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::{env, path::PathBuf, time::Duration};

/// Application configuration loaded and validated at startup.
///
/// Loaded once in `main` and passed by value into the sequencer; there is
/// no ambient global, which keeps the sequencer testable in isolation.
#[derive(Deserialize, Serialize, Clone, Validate, Debug)]
pub struct AppConfig {
    /// Randomized identity generation
    #[validate]
    pub identity: IdentityConfig,

    /// Access point radio parameters
    #[validate]
    pub access_point: AccessPointConfig,

    /// Uplink wait behavior
    pub uplink: UplinkConfig,

    /// NAT flow limits
    #[validate]
    pub nat: NatConfig,

    /// Persistent store location and capacity
    #[validate]
    pub storage: StorageConfig,
}

#[derive(Deserialize, Serialize, Clone, Validate, Debug)]
pub struct IdentityConfig {
    /// Characters in the generated SSID
    #[validate(minimum = 1)]
    #[validate(maximum = 32)]
    pub ssid_length: usize,

    /// Characters in the generated passphrase; 0 selects an open network
    #[validate(maximum = 63)]
    pub passphrase_length: usize,
}

#[derive(Deserialize, Serialize, Clone, Validate, Debug)]
pub struct AccessPointConfig {
    /// 2.4 GHz channel to broadcast on
    #[validate(minimum = 1)]
    #[validate(maximum = 13)]
    pub channel: u8,

    /// Maximum simultaneously associated stations
    #[validate(minimum = 1)]
    #[validate(maximum = 10)]
    pub max_clients: u8,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct UplinkConfig {
    /// How long to wait for uplink readiness; unset waits forever
    pub ready_timeout_ms: Option<u64>,
}

#[derive(Deserialize, Serialize, Clone, Validate, Debug)]
pub struct NatConfig {
    /// Maximum concurrently tracked translation flows
    #[validate(minimum = 1)]
    pub max_flows: u16,
}

#[derive(Deserialize, Serialize, Clone, Validate, Debug)]
pub struct StorageConfig {
    /// Directory holding the key-value store file
    pub data_dir: PathBuf,

    /// Upper bound on the store file size
    #[validate(minimum = 1)]
    pub capacity_bytes: u64,
}

impl AppConfig {
    /// Loads all sections from environment variables and validates them.
    ///
    /// Unset variables fall back to the built-in defaults; any value out
    /// of bounds fails startup.
    pub fn load() -> Result<Self> {
        Self {
            identity: IdentityConfig::load()?,
            access_point: AccessPointConfig::load()?,
            uplink: UplinkConfig::load()?,
            nat: NatConfig::load()?,
            storage: StorageConfig::load()?,
        }
        .validated()
    }

    fn validated(self) -> Result<Self> {
        self.validate().context("configuration validation failed")?;

        // WPA2-PSK accepts 8 to 63 characters; 0 selects an open network
        ensure!(
            self.identity.passphrase_length == 0
                || (8..=63).contains(&self.identity.passphrase_length),
            "passphrase length must be 0 or between 8 and 63, got {}",
            self.identity.passphrase_length
        );

        Ok(self)
    }
}

impl IdentityConfig {
    fn load() -> Result<Self> {
        let ssid_length = env::var("HOTSPOT_SSID_LENGTH")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .context("failed to parse HOTSPOT_SSID_LENGTH: invalid format")?;

        let passphrase_length = env::var("HOTSPOT_PASSPHRASE_LENGTH")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .context("failed to parse HOTSPOT_PASSPHRASE_LENGTH: invalid format")?;

        Ok(Self {
            ssid_length,
            passphrase_length,
        })
    }
}

impl AccessPointConfig {
    fn load() -> Result<Self> {
        let channel = env::var("HOTSPOT_WIFI_CHANNEL")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .context("failed to parse HOTSPOT_WIFI_CHANNEL: invalid format")?;

        let max_clients = env::var("HOTSPOT_MAX_CLIENTS")
            .unwrap_or_else(|_| "4".to_string())
            .parse()
            .context("failed to parse HOTSPOT_MAX_CLIENTS: invalid format")?;

        Ok(Self {
            channel,
            max_clients,
        })
    }
}

impl UplinkConfig {
    fn load() -> Result<Self> {
        let ready_timeout_ms = match env::var("HOTSPOT_UPLINK_TIMEOUT_MS") {
            Ok(raw) => Some(
                raw.parse()
                    .context("failed to parse HOTSPOT_UPLINK_TIMEOUT_MS: invalid format")?,
            ),
            Err(_) => None,
        };

        Ok(Self { ready_timeout_ms })
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }
}

impl NatConfig {
    fn load() -> Result<Self> {
        let max_flows = env::var("HOTSPOT_NAT_MAX_FLOWS")
            .unwrap_or_else(|_| "512".to_string())
            .parse()
            .context("failed to parse HOTSPOT_NAT_MAX_FLOWS: invalid format")?;

        Ok(Self { max_flows })
    }
}

impl StorageConfig {
    fn load() -> Result<Self> {
        let data_dir = env::var("HOTSPOT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_data_dir());

        std::fs::create_dir_all(&data_dir).context("failed to create data directory")?;

        let capacity_bytes = env::var("HOTSPOT_STORE_CAPACITY_BYTES")
            .unwrap_or_else(|_| "24576".to_string())
            .parse()
            .context("failed to parse HOTSPOT_STORE_CAPACITY_BYTES: invalid format")?;

        Ok(Self {
            data_dir,
            capacity_bytes,
        })
    }

    #[cfg(not(any(test, feature = "mock")))]
    fn default_data_dir() -> PathBuf {
        PathBuf::from(format!("/var/lib/{}", env!("CARGO_PKG_NAME")))
    }

    // In test mode, use a temp directory to avoid requiring system paths
    #[cfg(any(test, feature = "mock"))]
    fn default_data_dir() -> PathBuf {
        std::env::temp_dir().join("hotspot-bringup-test")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    // Tests touching the process environment share it with every other
    // test thread
    static ENV_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    fn valid_config() -> AppConfig {
        AppConfig {
            identity: IdentityConfig {
                ssid_length: 7,
                passphrase_length: 8,
            },
            access_point: AccessPointConfig {
                channel: 1,
                max_clients: 4,
            },
            uplink: UplinkConfig {
                ready_timeout_ms: None,
            },
            nat: NatConfig { max_flows: 512 },
            storage: StorageConfig {
                data_dir: std::env::temp_dir().join("hotspot-bringup-test"),
                capacity_bytes: 24576,
            },
        }
    }

    mod load {
        use super::*;

        #[test]
        fn falls_back_to_defaults() {
            let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

            let config = AppConfig::load().unwrap();

            assert_eq!(config.identity.ssid_length, 7);
            assert_eq!(config.identity.passphrase_length, 8);
            assert_eq!(config.access_point.channel, 1);
            assert_eq!(config.access_point.max_clients, 4);
            assert_eq!(config.uplink.ready_timeout_ms, None);
            assert_eq!(config.nat.max_flows, 512);
            assert_eq!(config.storage.capacity_bytes, 24576);
        }

        #[test]
        fn honors_environment_overrides() {
            let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

            unsafe {
                env::set_var("HOTSPOT_WIFI_CHANNEL", "6");
                env::set_var("HOTSPOT_UPLINK_TIMEOUT_MS", "1500");
            }

            let config = AppConfig::load().unwrap();

            unsafe {
                env::remove_var("HOTSPOT_WIFI_CHANNEL");
                env::remove_var("HOTSPOT_UPLINK_TIMEOUT_MS");
            }

            assert_eq!(config.access_point.channel, 6);
            assert_eq!(config.uplink.ready_timeout(), Some(Duration::from_millis(1500)));
        }

        #[test]
        fn rejects_unparsable_values() {
            let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

            unsafe {
                env::set_var("HOTSPOT_MAX_CLIENTS", "many");
            }

            let result = AppConfig::load();

            unsafe {
                env::remove_var("HOTSPOT_MAX_CLIENTS");
            }

            assert!(
                result
                    .unwrap_err()
                    .to_string()
                    .contains("HOTSPOT_MAX_CLIENTS")
            );
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn accepts_the_defaults() {
            assert!(valid_config().validated().is_ok());
        }

        #[test]
        fn rejects_out_of_range_channel() {
            let mut config = valid_config();
            config.access_point.channel = 14;
            assert!(config.validated().is_err());

            let mut config = valid_config();
            config.access_point.channel = 0;
            assert!(config.validated().is_err());
        }

        #[test]
        fn rejects_out_of_range_ssid_length() {
            let mut config = valid_config();
            config.identity.ssid_length = 0;
            assert!(config.validated().is_err());

            let mut config = valid_config();
            config.identity.ssid_length = 33;
            assert!(config.validated().is_err());
        }

        #[test]
        fn rejects_short_nonempty_passphrase_length() {
            let mut config = valid_config();
            config.identity.passphrase_length = 5;

            let err = config.validated().unwrap_err();
            assert!(err.to_string().contains("passphrase length"));
        }

        #[test]
        fn accepts_open_network_passphrase_length() {
            let mut config = valid_config();
            config.identity.passphrase_length = 0;
            assert!(config.validated().is_ok());
        }

        #[test]
        fn rejects_zero_clients_and_zero_flows() {
            let mut config = valid_config();
            config.access_point.max_clients = 0;
            assert!(config.validated().is_err());

            let mut config = valid_config();
            config.nat.max_flows = 0;
            assert!(config.validated().is_err());
        }
    }

    #[test]
    fn ready_timeout_converts_milliseconds() {
        let uplink = UplinkConfig {
            ready_timeout_ms: Some(250),
        };
        assert_eq!(uplink.ready_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(
            UplinkConfig {
                ready_timeout_ms: None
            }
            .ready_timeout(),
            None
        );
    }
}
