use std::net::Ipv4Addr;

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::IpNetwork;
use tracing::debug;

#[cfg(target_os = "linux")]
use linux_impl::is_physical;

#[cfg(not(target_os = "linux"))]
fn is_physical(_interface: &NetworkInterface) -> bool {
    true
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// Loopback interfaces never identify the device on the network.
    IsLoopback,
    /// The interface carries no IPv4 address.
    NoIpv4,
}

/// Finds the IPv4 address this device is reachable under.
///
/// Physical interfaces win over virtual ones; among those the first usable
/// one is taken. Returns `None` on a host without any usable interface.
pub fn get_device_ipv4() -> Option<Ipv4Addr> {
    let interfaces: Vec<NetworkInterface> = datalink::interfaces()
        .into_iter()
        .filter(|interface| is_viable_interface(interface).is_ok())
        .collect();

    let interface = select_best_interface(&interfaces, is_physical)?;
    debug!("selected interface {} for the device address", interface.name);
    first_ipv4(interface)
}

fn is_viable_interface(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if first_ipv4(interface).is_none() {
        return Err(ViabilityError::NoIpv4);
    }
    Ok(())
}

fn select_best_interface(
    interfaces: &[NetworkInterface],
    is_physical: impl Fn(&NetworkInterface) -> bool,
) -> Option<&NetworkInterface> {
    interfaces
        .iter()
        .find(|&interface| is_physical(interface))
        .or_else(|| interfaces.first())
}

fn first_ipv4(interface: &NetworkInterface) -> Option<Ipv4Addr> {
    interface.ips.iter().find_map(|net| match net {
        IpNetwork::V4(v4) if !v4.ip().is_loopback() => Some(v4.ip()),
        _ => None,
    })
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::Path;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/device", interface.name)).exists()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
