use std::time::{Duration, Instant};

use chrono::Utc;
use log::debug;

use crate::{
    dispatch::{plan, Batch, DispatchOutcome, Dispatcher},
    monitor::{ProgressEvent, Reporter, TransportEvent},
    state::{EmissionState, Outcome, RunState, StopReason, TrafficSpec},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pause {
    Elapsed,
    Interrupted,
}

/// Time source and suspension point of the scheduler
pub trait Pacer {
    fn now(&self) -> Instant;

    /// Blocks for `duration` unless the operator interrupts first
    fn pause(&self, duration: Duration) -> Pause;

    /// True if an interrupt arrived since the last check
    fn interrupted(&self) -> bool;
}

/// Drives one run from start to a terminal state on the calling thread
pub struct Scheduler<'a, P: Pacer> {
    spec: &'a TrafficSpec,
    dispatcher: &'a Dispatcher,
    reporter: &'a Reporter,
    pacer: &'a P,
    state: RunState,
    sequence: u64,
}

impl<'a, P: Pacer> Scheduler<'a, P> {
    pub fn new(
        spec: &'a TrafficSpec,
        dispatcher: &'a Dispatcher,
        reporter: &'a Reporter,
        pacer: &'a P,
    ) -> Self {
        Self {
            spec,
            dispatcher,
            reporter,
            pacer,
            state: RunState::Init,
            sequence: 0,
        }
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(!self.state.is_terminal());
        debug!("Scheduler {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Emits packets until the count or time limit is reached or the operator
    /// interrupts, then writes the single terminal log entry.
    pub fn run(mut self) -> Outcome {
        debug!("Starting run, {:?}", self.spec.termination());
        let mut emission = EmissionState::new(self.spec, self.pacer.now());
        self.transition(RunState::Running);

        let reason = self.emit(&mut emission);
        match reason {
            StopReason::UserInterrupt => self.transition(RunState::Interrupted),
            reason => self.transition(RunState::Completed(reason)),
        }

        debug!(
            "Run ended after {} packets in {:?}",
            emission.dispatched(),
            self.pacer.now().saturating_duration_since(emission.start)
        );
        let outcome = Outcome {
            state: self.state,
            reason,
            sent_tcp: emission.sent_tcp,
            sent_udp: emission.sent_udp,
            failures: emission.failures,
            finished_at: Utc::now(),
        };
        self.reporter
            .report(&ProgressEvent::Terminated(outcome.clone()));
        outcome
    }

    fn emit(&mut self, emission: &mut EmissionState) -> StopReason {
        for batch in plan(self.spec.transport_type, self.spec.finite_count()) {
            self.reporter.report(&ProgressEvent::BatchStart {
                transport: batch.transport,
                quota: batch.quota,
            });

            let (sent, stop) = self.emit_batch(&batch, emission);

            self.reporter.report(&ProgressEvent::BatchEnd {
                transport: batch.transport,
                sent,
            });
            if let Some(reason) = stop {
                return reason;
            }
        }
        StopReason::CountExhausted
    }

    // Returns how many packets the batch sent and, if the run has to end,
    // why. `None` means the batch quota was met and the next batch may start.
    fn emit_batch(
        &mut self,
        batch: &Batch,
        emission: &mut EmissionState,
    ) -> (u64, Option<StopReason>) {
        let mut sent = 0;
        loop {
            if batch.quota == Some(sent) {
                return (sent, None);
            }
            if self.pacer.interrupted() {
                return (sent, Some(StopReason::UserInterrupt));
            }
            if let Some(reason) = emission.stop_reason(self.pacer.now()) {
                return (sent, Some(reason));
            }

            let kind = batch.kind_at(sent);
            self.sequence += 1;
            let event = TransportEvent {
                timestamp: Utc::now(),
                kind,
                sequence: self.sequence,
            };

            let outcome = self.dispatcher.send(kind);
            emission.record(kind, outcome.is_sent());
            sent += 1;

            match outcome {
                DispatchOutcome::Sent => {
                    self.reporter.report(&ProgressEvent::Dispatched(event))
                }
                DispatchOutcome::Failed(reason) => self
                    .reporter
                    .report(&ProgressEvent::SendFailed { event, reason }),
            }

            // Nothing left to pace once the last counted packet is out
            if emission.remaining == Some(0) {
                continue;
            }
            let pause = emission.pause_before_next(self.spec.interval, self.pacer.now());
            if self.pacer.pause(pause) == Pause::Interrupted {
                return (sent, Some(StopReason::UserInterrupt));
            }
        }
    }
}
