use std::time::Duration;

use log::debug;
use rand::Rng;

use crate::{
    net::PacketSender,
    state::{TrafficSpec, TransportKind, TransportType},
};

/// Result of one send, never fatal to the run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent)
    }
}

/// Hands single packets of a fixed destination and size to the send primitive
pub struct Dispatcher {
    sender: Box<dyn PacketSender>,
    destination: String,
    port: u16,
    packet_size: usize,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(sender: Box<dyn PacketSender>, spec: &TrafficSpec, timeout: Duration) -> Self {
        Self {
            sender,
            destination: spec.destination.clone(),
            port: spec.port,
            packet_size: spec.packet_size,
            timeout,
        }
    }

    pub fn send(&self, kind: TransportKind) -> DispatchOutcome {
        let mut payload = vec![0u8; self.packet_size];
        rand::thread_rng().fill(&mut payload[..]);

        match self.sender.send_packet(
            kind,
            &self.destination,
            self.port,
            &payload,
            self.timeout,
        ) {
            Ok(reply) => {
                debug!(
                    "{} packet to {}:{} sent, {} reply bytes",
                    kind,
                    self.destination,
                    self.port,
                    reply.len()
                );
                DispatchOutcome::Sent
            }
            Err(e) => DispatchOutcome::Failed(e.to_string()),
        }
    }
}

/// A run of consecutive ticks sharing one transport selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Batch {
    pub transport: TransportType,
    /// `None` when the batch only ends through time or interruption
    pub quota: Option<u64>,
}

impl Batch {
    /// Kind of the `index`-th packet of this batch. BOTH alternates, TCP first.
    pub fn kind_at(&self, index: u64) -> TransportKind {
        match self.transport {
            TransportType::Tcp => TransportKind::Tcp,
            TransportType::Udp => TransportKind::Udp,
            TransportType::Both if index % 2 == 0 => TransportKind::Tcp,
            TransportType::Both => TransportKind::Udp,
        }
    }
}

/// Splits a run into batches. A finite BOTH run sends `count / 2` TCP packets
/// followed by the remaining UDP packets.
pub fn plan(transport: TransportType, count: Option<u64>) -> Vec<Batch> {
    match (transport, count) {
        (TransportType::Both, Some(count)) => {
            let tcp = count / 2;
            [
                Batch {
                    transport: TransportType::Tcp,
                    quota: Some(tcp),
                },
                Batch {
                    transport: TransportType::Udp,
                    quota: Some(count - tcp),
                },
            ]
            .into_iter()
            .filter(|batch| batch.quota != Some(0))
            .collect()
        }
        (transport, quota) => vec![Batch { transport, quota }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SendError, net::MockPacketSender, state::PacketCount};

    fn spec() -> TrafficSpec {
        TrafficSpec {
            destination: String::from("198.51.100.7"),
            packet_count: PacketCount::Finite(1),
            packet_size: 1460,
            interval: Duration::from_secs(1),
            port: 9000,
            transport_type: TransportType::Tcp,
            duration_limit: None,
            verbose: false,
        }
    }

    #[test]
    fn sends_exactly_once_per_call() {
        let mut sender = MockPacketSender::new();
        sender
            .expect_send_packet()
            .withf(|kind, destination, port, payload, timeout| {
                *kind == TransportKind::Udp
                    && destination == "198.51.100.7"
                    && *port == 9000
                    && payload.len() == 1460
                    && *timeout == Duration::from_secs(1)
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(b"pong".to_vec()));

        let dispatcher = Dispatcher::new(Box::new(sender), &spec(), Duration::from_secs(1));
        assert_eq!(
            dispatcher.send(TransportKind::Udp),
            DispatchOutcome::Sent
        );
    }

    #[test]
    fn send_failure_is_reported_not_raised() {
        let mut sender = MockPacketSender::new();
        sender
            .expect_send_packet()
            .times(1)
            .returning(|_, _, _, _, _| {
                Err(SendError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                )))
            });

        let dispatcher = Dispatcher::new(Box::new(sender), &spec(), Duration::from_secs(1));
        let outcome = dispatcher.send(TransportKind::Tcp);
        assert!(!outcome.is_sent());
        assert!(matches!(outcome, DispatchOutcome::Failed(_)));
    }

    #[test]
    fn splits_both_tcp_first() {
        for count in 1..=25u64 {
            let batches = plan(TransportType::Both, Some(count));
            let total: u64 = batches.iter().filter_map(|b| b.quota).sum();
            assert_eq!(total, count);

            let tcp = batches
                .iter()
                .find(|b| b.transport == TransportType::Tcp)
                .and_then(|b| b.quota)
                .unwrap_or(0);
            assert_eq!(tcp, count / 2);
            assert_eq!(batches.last().unwrap().transport, TransportType::Udp);
        }
    }

    #[test]
    fn single_packet_both_run_is_all_udp() {
        assert_eq!(
            plan(TransportType::Both, Some(1)),
            vec![Batch {
                transport: TransportType::Udp,
                quota: Some(1)
            }]
        );
    }

    #[test]
    fn single_transport_plans_one_batch() {
        assert_eq!(
            plan(TransportType::Tcp, Some(4)),
            vec![Batch {
                transport: TransportType::Tcp,
                quota: Some(4)
            }]
        );
        assert_eq!(
            plan(TransportType::Udp, None),
            vec![Batch {
                transport: TransportType::Udp,
                quota: None
            }]
        );
    }

    #[test]
    fn unbounded_both_alternates() {
        let batch = plan(TransportType::Both, None)[0];
        let kinds: Vec<_> = (0..4).map(|i| batch.kind_at(i)).collect();
        assert_eq!(
            kinds,
            vec![
                TransportKind::Tcp,
                TransportKind::Udp,
                TransportKind::Tcp,
                TransportKind::Udp
            ]
        );
    }
}
