//! Bring-up services
//!
//! Each step of the boot sequence lives in its own service, separated
//! from the collaborator contracts it drives. Services are stateless
//! operations over generic collaborators, so they can be tested against
//! mocks as well as the simulated device.

pub mod access_point;
pub mod bringup;
pub mod dns_relay;
pub mod identity;
pub mod nat;
pub mod stations;
pub mod uplink;
