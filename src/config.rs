use std::{
    env, io,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;

/// Log file written to the current working directory unless overridden
pub const LOG_FILE_NAME: &str = "traffic_generator_wizard.log";

/// Default MSS sized payload
pub const DEFAULT_PACKET_SIZE: u64 = 1460;
/// Upper bound on the payload buffer allocated per packet
pub const MAX_PACKET_SIZE: u64 = 16 * 1024 * 1024;
pub const DEFAULT_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_PORT: u64 = 443;
pub const MAX_PORT: u64 = u16::MAX as u64;

fn parse_duration(arg: &str) -> Result<Duration, String> {
    let secs: u64 = arg.parse().map_err(|e| format!("{e}"))?;
    if secs == 0 {
        return Err(String::from("timeout must be at least one second"));
    }
    Ok(Duration::from_secs(secs))
}

/// Interactive TCP/UDP traffic generator.
///
/// Every traffic parameter is asked for interactively; the options below only
/// adjust where the run is logged and how packets leave the host.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Log file the run is appended to
    #[arg(short, long, default_value_t = String::from(LOG_FILE_NAME))]
    pub log_file: String,

    /// Per-packet send timeout in seconds
    #[arg(short = 't', long, value_parser = parse_duration, default_value = "1")]
    pub send_timeout: Duration,

    /// Don't actually send packets
    #[arg(short, long)]
    pub dryrun: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: String::from(LOG_FILE_NAME),
            send_timeout: Duration::from_secs(1),
            dryrun: false,
        }
    }
}

impl Config {
    /// Absolute path of the log file, relative names resolved against the cwd
    pub fn log_path(&self) -> io::Result<PathBuf> {
        let path = Path::new(&self.log_file);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(env::current_dir()?.join(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_uses_interactive_defaults() {
        let config = Config::try_parse_from(["traffic-wizard"]).unwrap();
        assert_eq!(config.log_file, LOG_FILE_NAME);
        assert_eq!(config.send_timeout, Duration::from_secs(1));
        assert!(!config.dryrun);
    }

    #[test]
    fn rejects_zero_send_timeout() {
        let res = Config::try_parse_from(["traffic-wizard", "--send-timeout", "0"]);
        assert!(res.is_err());
    }

    #[test]
    fn resolves_relative_log_file_against_cwd() {
        let config = Config::default();
        let path = config.log_path().unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with(LOG_FILE_NAME));
    }

    #[test]
    fn keeps_absolute_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("run.log");
        let config = Config {
            log_file: file.display().to_string(),
            ..Config::default()
        };
        assert_eq!(config.log_path().unwrap(), file);
    }
}
