use std::{env, process, sync::Arc};

use chrono::Utc;
use clap::Parser;
use log::error;

use config::Config;
use dispatch::Dispatcher;
use error::{Error, Result};
use monitor::{record_prompt_interrupt, ProgressEvent, Reporter};
use net::{DryRunSender, PacketSender, SocketSender};
use prompt::LinePrompt;
use send::Scheduler;
use signal::Interrupt;
use sink::LogFile;

mod config;
mod dispatch;
mod error;
mod monitor;
mod net;
mod prompt;
mod send;
mod signal;
mod sink;
mod state;
mod validate;
mod wizard;

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .format_target(false)
        .init();

    let config = Config::parse();
    if let Err(e) = run(&config) {
        error!("{e}");
        process::exit(1);
    }
}

fn run(config: &Config) -> Result<()> {
    let log_path = config.log_path()?;
    let log_file = Arc::new(LogFile::open(&log_path)?);

    let interrupt = {
        let log_file = Arc::clone(&log_file);
        Interrupt::install(move || record_prompt_interrupt(log_file.as_ref(), Utc::now()))?
    };

    println!("\nWelcome to the Traffic Generator Wizard!");

    let spec = {
        let reporter = Reporter::new(log_file.clone(), false);
        let mut prompt = LinePrompt::stdio();
        match wizard::collect(&mut prompt, &reporter) {
            Ok(spec) => spec,
            Err(Error::EndOfInput) => {
                reporter.report(&ProgressEvent::PromptClosed);
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    };

    interrupt.arm();
    let reporter = Reporter::new(log_file.clone(), spec.verbose);

    if spec.verbose {
        reporter.display_line(
            "\nLive verbose view enabled. Press Ctrl+C to stop traffic generation.",
        );
        if let Ok(exe) = env::current_exe() {
            reporter.display_line(&format!("Executable Location: {}", exe.display()));
        }
        reporter.display_line(&format!("Log File Path: {}", log_file.path().display()));
    }

    let sender: Box<dyn PacketSender> = if config.dryrun {
        reporter.report(&ProgressEvent::Notice(String::from(
            "Dry run, no packets will leave this host",
        )));
        Box::new(DryRunSender)
    } else {
        Box::new(SocketSender)
    };
    let dispatcher = Dispatcher::new(sender, &spec, config.send_timeout);

    Scheduler::new(&spec, &dispatcher, &reporter, &interrupt).run();
    Ok(())
}
