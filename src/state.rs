use std::{
    fmt,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};

/// A concrete way of putting one packet on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Udp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Tcp => write!(f, "TCP"),
            TransportKind::Udp => write!(f, "UDP"),
        }
    }
}

/// Transport selection made by the operator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransportType {
    Tcp,
    Udp,
    #[default]
    Both,
}

impl TransportType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tcp" => Some(TransportType::Tcp),
            "udp" => Some(TransportType::Udp),
            "both" => Some(TransportType::Both),
            _ => None,
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Tcp => write!(f, "TCP"),
            TransportType::Udp => write!(f, "UDP"),
            TransportType::Both => write!(f, "TCP and UDP"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketCount {
    Finite(u64),
    Unbounded,
}

/// How a run is expected to end, resolved once at validation time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Stops when the count is exhausted (or earlier, if a time limit is also set)
    Count(u64),
    /// No finite count, stops once the time limit elapses
    TimeBounded(Duration),
    /// Runs until the operator interrupts
    Unbounded,
}

/// Validated, immutable parameters of one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrafficSpec {
    pub destination: String,
    pub packet_count: PacketCount,
    pub packet_size: usize,
    pub interval: Duration,
    pub port: u16,
    pub transport_type: TransportType,
    pub duration_limit: Option<Duration>,
    pub verbose: bool,
}

impl TrafficSpec {
    pub fn termination(&self) -> Termination {
        match (self.packet_count, self.duration_limit) {
            (PacketCount::Finite(count), _) => Termination::Count(count),
            (PacketCount::Unbounded, Some(limit)) => Termination::TimeBounded(limit),
            (PacketCount::Unbounded, None) => Termination::Unbounded,
        }
    }

    pub fn finite_count(&self) -> Option<u64> {
        match self.packet_count {
            PacketCount::Finite(count) => Some(count),
            PacketCount::Unbounded => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    CountExhausted,
    TimeLimitReached,
    UserInterrupt,
}

impl StopReason {
    pub fn describe(&self) -> &'static str {
        match self {
            StopReason::CountExhausted => "Packet count reached.",
            StopReason::TimeLimitReached => "Execution time reached.",
            StopReason::UserInterrupt => "User interrupt.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Init,
    Running,
    Completed(StopReason),
    Interrupted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed(_) | RunState::Interrupted)
    }
}

/// Mutable bookkeeping of a run, owned by the scheduler alone
#[derive(Debug)]
pub struct EmissionState {
    /// `None` when the count is unbounded
    pub remaining: Option<u64>,
    pub start: Instant,
    pub end: Option<Instant>,
    pub sent_tcp: u64,
    pub sent_udp: u64,
    pub failures: u64,
}

impl EmissionState {
    pub fn new(spec: &TrafficSpec, start: Instant) -> Self {
        Self {
            remaining: spec.finite_count(),
            start,
            // A limit past the end of the clock never stops the run
            end: spec
                .duration_limit
                .and_then(|limit| start.checked_add(limit)),
            sent_tcp: 0,
            sent_udp: 0,
            failures: 0,
        }
    }

    /// `None` while another packet may go out, otherwise why it may not
    pub fn stop_reason(&self, now: Instant) -> Option<StopReason> {
        if self.remaining == Some(0) {
            return Some(StopReason::CountExhausted);
        }
        match self.end {
            Some(end) if now >= end => Some(StopReason::TimeLimitReached),
            _ => None,
        }
    }

    /// Pause before the next tick, never running past the time limit
    pub fn pause_before_next(&self, interval: Duration, now: Instant) -> Duration {
        match self.end {
            Some(end) => interval.min(end.saturating_duration_since(now)),
            None => interval,
        }
    }

    pub fn record(&mut self, kind: TransportKind, success: bool) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        match kind {
            TransportKind::Tcp => self.sent_tcp += 1,
            TransportKind::Udp => self.sent_udp += 1,
        }
        if !success {
            self.failures += 1;
        }
    }

    pub fn dispatched(&self) -> u64 {
        self.sent_tcp + self.sent_udp
    }
}

/// Final result of a scheduler run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub state: RunState,
    pub reason: StopReason,
    pub sent_tcp: u64,
    pub sent_udp: u64,
    pub failures: u64,
    pub finished_at: DateTime<Utc>,
}
