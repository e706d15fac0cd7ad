use std::time::Duration;

use crate::{
    config::{
        DEFAULT_INTERVAL_SECS, DEFAULT_PACKET_SIZE, DEFAULT_PORT, MAX_PACKET_SIZE, MAX_PORT,
    },
    error::Result,
    monitor::{ProgressEvent, Reporter},
    prompt::Prompt,
    state::{PacketCount, Termination, TrafficSpec},
    validate::{
        Validator, DESTINATION, DURATION, INTERVAL, PACKET_COUNT, PACKET_SIZE, PORT,
    },
};

fn is_yes(raw: &str) -> bool {
    let raw = raw.trim();
    raw.eq_ignore_ascii_case("y") || raw.eq_ignore_ascii_case("yes")
}

/// Walks the operator through every question of a run
pub fn collect<P: Prompt>(prompt: &mut P, reporter: &Reporter) -> Result<TrafficSpec> {
    let mut v = Validator::new(prompt, reporter);

    let raw = v.ask(
        "Enter the destination IP or hostname",
        Some("(e.g., example.com or 8.8.8.8)"),
    )?;
    let destination = v.non_empty(DESTINATION, raw)?;

    let raw = v.ask(
        "Enter the number of packets to send",
        Some("(press Enter to run until terminated)"),
    )?;
    let (count, duration) = match v.optional_positive(PACKET_COUNT, raw)? {
        Some(count) => (Some(count), None),
        None => {
            let answer = v.ask(
                "Do you want to specify the duration of script execution? (y/n)",
                Some("(press Enter to run until terminated)"),
            )?;
            if is_yes(&answer) {
                let raw = v.ask(
                    "Enter the duration of script execution in seconds",
                    Some("(e.g., 30)"),
                )?;
                (None, Some(v.positive_integer(DURATION, raw, None)?))
            } else {
                (None, None)
            }
        }
    };
    let (packet_count, duration_limit) = match v.resolve_termination(count, duration) {
        Termination::Count(count) => (PacketCount::Finite(count), None),
        Termination::TimeBounded(limit) => (PacketCount::Unbounded, Some(limit)),
        Termination::Unbounded => (PacketCount::Unbounded, None),
    };

    let raw = v.ask(
        "Enter the size of each packet in bytes",
        Some("(press Enter to run Default MSS Packet Size 1460)"),
    )?;
    let packet_size =
        v.bounded_integer(PACKET_SIZE, raw, Some(DEFAULT_PACKET_SIZE), MAX_PACKET_SIZE)?;

    let raw = v.ask(
        "Enter the interval between packets in seconds",
        Some("(press Enter to run default interval of 1 second)"),
    )?;
    let interval = v.positive_integer(INTERVAL, raw, Some(DEFAULT_INTERVAL_SECS))?;

    let raw = v.ask(
        "Enter the destination port",
        Some("(press Enter to run default port 443)"),
    )?;
    let port = v.bounded_integer(PORT, raw, Some(DEFAULT_PORT), MAX_PORT)?;

    let raw = v.ask(
        "Enter the type of port (TCP, UDP, or Both)",
        Some("(press Enter to run default which is both)"),
    )?;
    let transport_type = v.transport_type(raw)?;

    let raw = v.ask(
        "Do you want to see a live verbose view of the execution? (y/n)",
        Some("(press Enter to run default which is with live view showing timestamps)"),
    )?;
    let verbose = if raw.trim().is_empty() {
        v.reporter().report(&ProgressEvent::DefaultApplied {
            field: "verbose view",
            value: String::from("y"),
        });
        true
    } else {
        is_yes(&raw)
    };

    Ok(TrafficSpec {
        destination,
        packet_count,
        packet_size: packet_size as usize,
        interval: Duration::from_secs(interval),
        port: port as u16,
        transport_type,
        duration_limit,
        verbose,
    })
}
