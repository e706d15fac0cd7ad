use std::{
    io::{self, Read, Write},
    net::{Shutdown, SocketAddr},
    time::Duration,
};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use super::{resolve, PacketSender};
use crate::{error::SendError, state::TransportKind};

/// Native sender: one short-lived socket per packet
pub struct SocketSender;

impl SocketSender {
    const MAX_REPLY: usize = 64 * 1024;

    fn send_tcp(
        addr: SocketAddr,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, SendError> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_read_timeout(Some(timeout))?;
        socket.set_write_timeout(Some(timeout))?;
        socket.connect_timeout(&SockAddr::from(addr), timeout)?;

        (&socket).write_all(payload)?;
        socket.shutdown(Shutdown::Write)?;

        Ok(Self::read_reply(&socket)?)
    }

    fn send_udp(
        addr: SocketAddr,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, SendError> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_write_timeout(Some(timeout))?;
        socket.send_to(payload, &SockAddr::from(addr))?;
        Ok(Vec::new())
    }

    // Reads until the peer closes or the read timeout expires
    fn read_reply(mut socket: &Socket) -> io::Result<Vec<u8>> {
        let mut reply = Vec::new();
        let mut buf = [0u8; 4096];
        while reply.len() < Self::MAX_REPLY {
            match socket.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => reply.extend_from_slice(&buf[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::ConnectionReset
                    ) =>
                {
                    break
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(reply)
    }
}

impl PacketSender for SocketSender {
    fn send_packet(
        &self,
        kind: TransportKind,
        destination: &str,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, SendError> {
        let addr = resolve(destination, port)?;
        match kind {
            TransportKind::Tcp => Self::send_tcp(addr, payload, timeout),
            TransportKind::Udp => Self::send_udp(addr, payload, timeout),
        }
    }
}
