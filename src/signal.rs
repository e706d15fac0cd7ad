use std::{
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use log::debug;

use crate::{
    error::Result,
    send::{Pause, Pacer},
};

/// Sending half of an operator interrupt
pub struct Trigger {
    tx: Sender<()>,
    armed: Arc<AtomicBool>,
}

impl Trigger {
    /// Delivers the interrupt to the scheduler. Returns false while still
    /// prompting, when there is no run to unwind yet.
    pub fn fire(&self) -> bool {
        if !self.armed.load(Ordering::SeqCst) {
            return false;
        }
        // the receiver is gone once the run is over; nothing left to stop
        let _ = self.tx.send(());
        true
    }
}

/// Receiving half of an operator interrupt and the wall clock pacer of a run
pub struct Interrupt {
    rx: Receiver<()>,
    armed: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn channel() -> (Self, Trigger) {
        let (tx, rx) = mpsc::channel();
        let armed = Arc::new(AtomicBool::new(false));
        let trigger = Trigger {
            tx,
            armed: Arc::clone(&armed),
        };
        (Self { rx, armed }, trigger)
    }

    /// Routes Ctrl+C to this handle. Before `arm` is called an interrupt runs
    /// `on_prompt_cancel` and exits the process with status 0.
    pub fn install<F>(on_prompt_cancel: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (interrupt, trigger) = Self::channel();
        ctrlc::set_handler(move || {
            if !trigger.fire() {
                on_prompt_cancel();
                process::exit(0);
            }
        })?;
        Ok(interrupt)
    }

    /// Switches interrupts from ending the prompt phase to ending the run
    pub fn arm(&self) {
        debug!("Interrupts now stop the emission loop");
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl Pacer for Interrupt {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn pause(&self, duration: Duration) -> Pause {
        match self.rx.recv_timeout(duration) {
            Ok(()) => Pause::Interrupted,
            Err(RecvTimeoutError::Timeout) => Pause::Elapsed,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(duration);
                Pause::Elapsed
            }
        }
    }

    fn interrupted(&self) -> bool {
        self.rx.try_recv().is_ok()
    }
}
