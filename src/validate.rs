use std::time::Duration;

use crate::{
    error::Result,
    monitor::{ProgressEvent, Reporter},
    prompt::Prompt,
    state::{Termination, TransportType},
};

/// A prompted value: how it is named in the log and how it is asked for again
#[derive(Clone, Copy, Debug)]
pub struct Field {
    pub label: &'static str,
    pub retry: &'static str,
}

pub const DESTINATION: Field = Field {
    label: "destination",
    retry: "Enter a destination IP or hostname (e.g., example.com or 8.8.8.8)",
};
pub const PACKET_COUNT: Field = Field {
    label: "packet count",
    retry: "Enter the number of packets to send (e.g., 100, or press Enter to run until terminated)",
};
pub const DURATION: Field = Field {
    label: "duration",
    retry: "Enter the duration of script execution in seconds (e.g., 30)",
};
pub const PACKET_SIZE: Field = Field {
    label: "packet size",
    retry: "Enter the size of each packet in bytes (e.g., 1500)",
};
pub const INTERVAL: Field = Field {
    label: "interval",
    retry: "Enter the interval between packets in seconds (e.g., 1)",
};
pub const PORT: Field = Field {
    label: "port",
    retry: "Enter the destination port between 1 and 65535 (e.g., 9000)",
};
pub const TRANSPORT_TYPE: Field = Field {
    label: "transport type",
    retry: "Enter a valid port type (TCP, UDP, or Both)",
};

/// Strictly positive integer, or `None` for anything else
pub fn parse_positive(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

/// Turns raw answers into typed values, asking again until they are valid
pub struct Validator<'a, P: Prompt> {
    prompt: &'a mut P,
    reporter: &'a Reporter,
}

impl<'a, P: Prompt> Validator<'a, P> {
    pub fn new(prompt: &'a mut P, reporter: &'a Reporter) -> Self {
        Self { prompt, reporter }
    }

    pub fn reporter(&self) -> &Reporter {
        self.reporter
    }

    /// Asks one question, recording the raw answer
    pub fn ask(&mut self, text: &str, hint: Option<&str>) -> Result<String> {
        let raw = self.prompt.prompt_line(text, hint)?;
        self.reporter
            .report(&ProgressEvent::UserInput { raw: raw.clone() });
        Ok(raw)
    }

    fn reprompt(&mut self, field: Field, raw: String) -> Result<String> {
        self.reporter.report(&ProgressEvent::Reprompt {
            field: field.label,
            raw,
        });
        self.ask(field.retry, None)
    }

    fn apply_default<T: ToString>(&self, field: Field, value: T) -> T {
        self.reporter.report(&ProgressEvent::DefaultApplied {
            field: field.label,
            value: value.to_string(),
        });
        value
    }

    pub fn positive_integer(
        &mut self,
        field: Field,
        raw: String,
        default: Option<u64>,
    ) -> Result<u64> {
        self.bounded_integer(field, raw, default, u64::MAX)
    }

    /// Like `positive_integer`, also rejecting values above `max`
    pub fn bounded_integer(
        &mut self,
        field: Field,
        mut raw: String,
        default: Option<u64>,
        max: u64,
    ) -> Result<u64> {
        loop {
            if raw.trim().is_empty() {
                if let Some(default) = default {
                    return Ok(self.apply_default(field, default));
                }
            }
            match parse_positive(&raw) {
                Some(n) if n <= max => return Ok(n),
                _ => raw = self.reprompt(field, raw)?,
            }
        }
    }

    /// Positive integer, or `None` once the operator leaves the answer empty.
    /// Empty stays a valid answer on every re-prompt.
    pub fn optional_positive(&mut self, field: Field, mut raw: String) -> Result<Option<u64>> {
        loop {
            if raw.trim().is_empty() {
                return Ok(None);
            }
            match parse_positive(&raw) {
                Some(n) => return Ok(Some(n)),
                None => raw = self.reprompt(field, raw)?,
            }
        }
    }

    pub fn transport_type(&mut self, mut raw: String) -> Result<TransportType> {
        loop {
            if raw.trim().is_empty() {
                return Ok(self.apply_default(TRANSPORT_TYPE, TransportType::default()));
            }
            match TransportType::from_name(&raw) {
                Some(transport) => return Ok(transport),
                None => raw = self.reprompt(TRANSPORT_TYPE, raw)?,
            }
        }
    }

    pub fn non_empty(&mut self, field: Field, mut raw: String) -> Result<String> {
        loop {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
            raw = self.reprompt(field, raw)?;
        }
    }

    /// Decides how the run ends from the already validated count and
    /// duration. Neither being given means an unbounded run, which is logged.
    pub fn resolve_termination(&self, count: Option<u64>, duration: Option<u64>) -> Termination {
        match (count, duration) {
            (Some(count), _) => Termination::Count(count),
            (None, Some(secs)) => Termination::TimeBounded(Duration::from_secs(secs)),
            (None, None) => {
                self.reporter.report(&ProgressEvent::DefaultApplied {
                    field: "packet count or duration",
                    value: String::from("unbounded, running until interrupted"),
                });
                let notice = ProgressEvent::Notice(String::from("Running until terminated."));
                self.reporter.report(&notice);
                if !self.reporter.verbose() {
                    self.reporter.display_line(&notice.message());
                }
                Termination::Unbounded
            }
        }
    }
}
