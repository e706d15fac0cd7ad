pub mod socket;

use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

use log::debug;

#[cfg(test)]
use mockall::automock;

use crate::{error::SendError, state::TransportKind};

pub use socket::SocketSender;

/// Puts a single packet on the wire
#[cfg_attr(test, automock)]
pub trait PacketSender {
    /// Sends `payload` to `destination:port` over `kind`, giving up after
    /// `timeout`. Returns whatever the peer answered within the timeout.
    fn send_packet(
        &self,
        kind: TransportKind,
        destination: &str,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, SendError>;
}

/// Sender that never touches the network
pub struct DryRunSender;

impl PacketSender for DryRunSender {
    fn send_packet(
        &self,
        kind: TransportKind,
        destination: &str,
        port: u16,
        payload: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, SendError> {
        debug!(
            "dryrun: {} packet of {} bytes to {}:{}",
            kind,
            payload.len(),
            destination,
            port
        );
        Ok(Vec::new())
    }
}

/// First address `destination` resolves to
pub fn resolve(destination: &str, port: u16) -> Result<SocketAddr, SendError> {
    let mut addrs = (destination, port)
        .to_socket_addrs()
        .map_err(|source| SendError::Resolve {
            host: destination.to_string(),
            source,
        })?;
    addrs
        .next()
        .ok_or_else(|| SendError::NoAddress(destination.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_ip_literals() {
        let addr = resolve("198.51.100.7", 9000).unwrap();
        assert_eq!(addr, "198.51.100.7:9000".parse().unwrap());

        let addr = resolve("::1", 443).unwrap();
        assert_eq!(addr, "[::1]:443".parse().unwrap());
    }

    #[test]
    fn dryrun_always_succeeds() {
        let output = DryRunSender
            .send_packet(
                TransportKind::Udp,
                "198.51.100.7",
                9000,
                &[0u8; 16],
                Duration::from_secs(1),
            )
            .unwrap();
        assert!(output.is_empty());
    }
}
