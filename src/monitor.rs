use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use log::warn;

use crate::{
    sink::LogSink,
    state::{Outcome, TransportKind, TransportType},
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// One scheduler dispatch decision
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: TransportKind,
    pub sequence: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    UserInput { raw: String },
    Reprompt { field: &'static str, raw: String },
    DefaultApplied { field: &'static str, value: String },
    Notice(String),
    BatchStart { transport: TransportType, quota: Option<u64> },
    Dispatched(TransportEvent),
    SendFailed { event: TransportEvent, reason: String },
    BatchEnd { transport: TransportType, sent: u64 },
    Terminated(Outcome),
    PromptClosed,
}

impl ProgressEvent {
    /// Detail events only reach the log when the operator asked for verbose output
    pub fn is_detail(&self) -> bool {
        matches!(
            self,
            ProgressEvent::UserInput { .. } | ProgressEvent::Dispatched(_)
        )
    }

    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ProgressEvent::Dispatched(event) | ProgressEvent::SendFailed { event, .. } => {
                event.timestamp
            }
            ProgressEvent::Terminated(outcome) => outcome.finished_at,
            _ => Utc::now(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            ProgressEvent::UserInput { raw } => format!("User input: {raw}"),
            ProgressEvent::Reprompt { field, raw } => {
                format!("Invalid {field} {raw:?}, asking again")
            }
            ProgressEvent::DefaultApplied { field, value } => {
                format!("No {field} given, using default: {value}")
            }
            ProgressEvent::Notice(text) => text.clone(),
            ProgressEvent::BatchStart {
                transport,
                quota: Some(quota),
            } => format!("Sending {quota} {transport} packets"),
            ProgressEvent::BatchStart {
                transport,
                quota: None,
            } => format!("Sending {transport} packets until stopped"),
            ProgressEvent::Dispatched(event) => {
                format!("Sent {} packet #{}", event.kind, event.sequence)
            }
            ProgressEvent::SendFailed { event, reason } => format!(
                "Failed to send {} packet #{}: {}",
                event.kind, event.sequence, reason
            ),
            ProgressEvent::BatchEnd { transport, sent } => {
                format!("Finished sending {transport} packets ({sent} sent)")
            }
            ProgressEvent::Terminated(outcome) => format!(
                "Script execution terminated. Reason: {} Traffic generation completed at {} ({} TCP, {} UDP sent, {} failed)",
                outcome.reason.describe(),
                outcome.finished_at.format(TIMESTAMP_FORMAT),
                outcome.sent_tcp,
                outcome.sent_udp,
                outcome.failures,
            ),
            ProgressEvent::PromptClosed => String::from("Script execution terminated."),
        }
    }
}

/// Timestamped log line as written to the sink and the display
pub fn format_line(at: DateTime<Utc>, message: &str) -> String {
    format!("{} {}", at.format(TIMESTAMP_FORMAT), message)
}

/// Terminal entry for a Ctrl+C that arrives while the wizard is still asking
pub fn record_prompt_interrupt(sink: &dyn LogSink, at: DateTime<Utc>) {
    let line = format_line(at, "Script execution terminated. Reason: User interrupt.");
    if let Err(e) = sink.append(&line) {
        warn!("Failed to append to log sink: {}", e);
    }
    if let Err(e) = sink.flush() {
        warn!("Failed to flush log sink: {}", e);
    }
}

/// Writes progress of the wizard and the scheduler to the log sink, and to
/// the display when verbose.
pub struct Reporter {
    sink: Arc<dyn LogSink>,
    display: Mutex<Box<dyn Write + Send>>,
    verbose: bool,
}

impl Reporter {
    pub fn new(sink: Arc<dyn LogSink>, verbose: bool) -> Self {
        Self::with_display(sink, verbose, Box::new(io::stdout()))
    }

    pub fn with_display(
        sink: Arc<dyn LogSink>,
        verbose: bool,
        display: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            sink,
            display: Mutex::new(display),
            verbose,
        }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn report(&self, event: &ProgressEvent) {
        if event.is_detail() && !self.verbose {
            return;
        }

        let line = format_line(event.timestamp(), &event.message());
        if let Err(e) = self.sink.append(&line) {
            warn!("Failed to append to log sink: {}", e);
        }

        if self.verbose {
            self.display_line(&line);
        }

        if matches!(event, ProgressEvent::Terminated(_)) {
            self.finish();
        }
    }

    /// Shows a line on the display only, regardless of verbosity
    pub fn display_line(&self, line: &str) {
        match self.display.lock() {
            Ok(mut display) => {
                if let Err(e) = writeln!(display, "{line}") {
                    warn!("Failed to write to display: {}", e);
                }
            }
            Err(e) => warn!("Display lock poisoned: {}", e),
        }
    }

    pub fn finish(&self) {
        if let Err(e) = self.sink.flush() {
            warn!("Failed to flush log sink: {}", e);
        }
        if let Ok(mut display) = self.display.lock() {
            let _ = display.flush();
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.finish();
    }
}


#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::{display::SharedDisplay, *};
    use crate::{
        sink::memory::MemorySink,
        state::{RunState, StopReason},
    };

    fn reporter(verbose: bool) -> (Reporter, MemorySink, SharedDisplay) {
        let sink = MemorySink::default();
        let display = SharedDisplay::default();
        let reporter =
            Reporter::with_display(Arc::new(sink.clone()), verbose, Box::new(display.clone()));
        (reporter, sink, display)
    }

    fn dispatched(sequence: u64) -> ProgressEvent {
        ProgressEvent::Dispatched(TransportEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 17, 22, 51, 0).unwrap(),
            kind: TransportKind::Tcp,
            sequence,
        })
    }

    struct BrokenSink {
        flushes: std::sync::atomic::AtomicUsize,
    }

    impl LogSink for BrokenSink {
        fn append(&self, _line: &str) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::Other))
        }

        fn flush(&self) -> io::Result<()> {
            self.flushes
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(io::Error::from(io::ErrorKind::Other))
        }
    }

    #[test]
    fn prompt_interrupt_is_logged_and_flushed() {
        let sink = MemorySink::default();
        let at = Utc.with_ymd_and_hms(2024, 1, 17, 22, 51, 7).unwrap();
        record_prompt_interrupt(&sink, at);

        assert_eq!(
            sink.lines(),
            vec!["2024-01-17 22:51:07 UTC Script execution terminated. Reason: User interrupt."]
        );
        assert_eq!(sink.flushes(), 1);
    }

    #[test]
    fn prompt_interrupt_survives_failing_sink() {
        let sink = BrokenSink {
            flushes: Default::default(),
        };
        record_prompt_interrupt(&sink, Utc::now());
        assert_eq!(sink.flushes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn formats_timestamped_lines() {
        let at = Utc.with_ymd_and_hms(2024, 1, 17, 22, 51, 7).unwrap();
        assert_eq!(format_line(at, "hello"), "2024-01-17 22:51:07 UTC hello");
    }

    #[test]
    fn verbose_reports_details_to_sink_and_display() {
        let (reporter, sink, display) = reporter(true);
        reporter.report(&dispatched(1));

        assert_eq!(sink.lines(), vec!["2024-01-17 22:51:00 UTC Sent TCP packet #1"]);
        assert_eq!(display.contents(), "2024-01-17 22:51:00 UTC Sent TCP packet #1\n");
    }

    #[test]
    fn quiet_reports_only_summary_to_sink() {
        let (reporter, sink, display) = reporter(false);
        reporter.report(&dispatched(1));
        reporter.report(&ProgressEvent::BatchStart {
            transport: TransportType::Udp,
            quota: Some(3),
        });

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("Sending 3 UDP packets"));
        assert!(display.contents().is_empty());
    }

    #[test]
    fn terminal_entry_names_reason_and_flushes() {
        let (reporter, sink, _) = reporter(false);
        let outcome = Outcome {
            state: RunState::Interrupted,
            reason: StopReason::UserInterrupt,
            sent_tcp: 2,
            sent_udp: 0,
            failures: 1,
            finished_at: Utc.with_ymd_and_hms(2024, 1, 17, 22, 52, 0).unwrap(),
        };
        reporter.report(&ProgressEvent::Terminated(outcome));

        assert_eq!(
            sink.lines(),
            vec![
                "2024-01-17 22:52:00 UTC Script execution terminated. Reason: User interrupt. \
                 Traffic generation completed at 2024-01-17 22:52:00 UTC (2 TCP, 0 UDP sent, 1 failed)"
            ]
        );
        assert!(sink.flushes() >= 1);
    }

    #[test]
    fn unbounded_batch_message() {
        let event = ProgressEvent::BatchStart {
            transport: TransportType::Both,
            quota: None,
        };
        assert_eq!(event.message(), "Sending TCP and UDP packets until stopped");
    }
}
