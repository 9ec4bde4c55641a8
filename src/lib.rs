pub mod config;
pub mod dhcp_client;
pub mod modem_client;
pub mod nat_client;
pub mod netif;
pub mod services;
pub mod sim;
pub mod storage_client;
pub mod wifi_client;

pub use services::bringup::{BringupError, BringupPhase, BringupSequencer};
