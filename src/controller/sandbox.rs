//! Controller sandbox
//!
//! In timed mode the controller lives on a dedicated worker thread. Each tick
//! the game loop sends one job and waits for its result until the tick
//! deadline. A worker that misses the deadline is abandoned, never killed; its
//! late result is discarded by tick index and its late handle writes are
//! ignored because the handles were already closed.
//!
//! In untimed mode the controller runs inline on the simulation thread.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::controller::handle::{CommandSink, ShipCommands, ShipHandle};
use crate::controller::snapshot::WorldSnapshot;
use crate::controller::Controller;
use crate::error::SimError;
use crate::game::state::ShipId;

/// How one controller evaluation ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    /// Deadline passed; partial commands were applied
    TimedOut,
    /// Error or panic absorbed in tolerant mode; partial commands were applied
    Faulted(String),
}

/// Result of one evaluation
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub outcome: Outcome,
    /// Wall time from dispatch to result, or to the deadline on timeout
    pub elapsed: Duration,
    /// Commands per owned ship that still exists
    pub commands: Vec<(ShipId, ShipCommands)>,
}

struct Job {
    tick: u64,
    snapshot: Arc<WorldSnapshot>,
    handles: Vec<ShipHandle>,
}

struct JobResult {
    tick: u64,
    failure: Option<String>,
}

struct Worker {
    jobs: Sender<Job>,
    results: Receiver<JobResult>,
    /// Tick of a job still running past its deadline
    in_flight: Option<u64>,
    thread: Option<JoinHandle<()>>,
}

enum Mode {
    Inline(Box<dyn Controller>),
    Threaded(Worker),
}

/// Runs one controller for a fixed, disjoint set of ships
pub struct Sandbox {
    name: String,
    ships: Vec<ShipId>,
    mode: Mode,
    timeout: Duration,
    tolerant: bool,
}

impl Sandbox {
    /// `deadline` is one tick period; ignored in untimed mode
    pub fn new(
        controller: Box<dyn Controller>,
        ships: Vec<ShipId>,
        config: &SandboxConfig,
        deadline: Duration,
    ) -> Result<Self, SimError> {
        let name = controller.name().to_string();

        let mode = if config.controller_timeout {
            Mode::Threaded(Worker::spawn(&name, controller)?)
        } else {
            Mode::Inline(controller)
        };

        Ok(Self {
            name,
            ships,
            mode,
            timeout: deadline,
            tolerant: config.controller_timeout && config.ignore_exceptions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ships(&self) -> &[ShipId] {
        &self.ships
    }

    pub fn is_threaded(&self) -> bool {
        matches!(self.mode, Mode::Threaded(_))
    }

    /// Evaluate the controller for `tick`.
    ///
    /// Returns an error only for fatal faults: any fault in untimed mode, or a
    /// fault in timed mode when faults are not tolerated.
    pub fn evaluate(&mut self, tick: u64, snapshot: Arc<WorldSnapshot>) -> Result<Evaluation, SimError> {
        let (mut handles, sinks): (Vec<ShipHandle>, Vec<CommandSink>) = self
            .ships
            .iter()
            .filter_map(|id| snapshot.ship(*id))
            .map(|view| ShipHandle::open(view.clone()))
            .unzip();

        let start = Instant::now();
        let outcome = match &mut self.mode {
            Mode::Inline(controller) => match controller.actions(&mut handles, &snapshot) {
                Ok(()) => Outcome::Completed,
                Err(e) => Outcome::Faulted(format!("{:#}", e)),
            },
            Mode::Threaded(worker) => worker.run(tick, snapshot, handles, start + self.timeout),
        };
        let elapsed = start.elapsed();

        let commands = sinks.iter().map(|s| (s.ship_id(), s.close())).collect();

        let absorbed = match &outcome {
            Outcome::Completed => None,
            Outcome::TimedOut => Some(SimError::ControllerTimeout {
                controller: self.name.clone(),
                frame: tick,
            }),
            Outcome::Faulted(message) => Some(SimError::ControllerFault {
                controller: self.name.clone(),
                frame: tick,
                message: message.clone(),
            }),
        };
        if let Some(err) = absorbed {
            if !(err.is_recoverable() || self.tolerant) {
                return Err(err);
            }
            debug!("Absorbed: {}", err);
        }

        Ok(Evaluation {
            outcome,
            elapsed,
            commands,
        })
    }
}

impl Worker {
    fn spawn(name: &str, mut controller: Box<dyn Controller>) -> Result<Self, SimError> {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (result_tx, result_rx) = unbounded::<JobResult>();

        let thread = std::thread::Builder::new()
            .name(format!("controller-{}", name))
            .spawn(move || {
                for mut job in job_rx {
                    let result = catch_unwind(AssertUnwindSafe(|| controller.actions(&mut job.handles, &job.snapshot)));
                    let failure = match result {
                        Ok(Ok(())) => None,
                        Ok(Err(e)) => Some(format!("{:#}", e)),
                        Err(panic) => Some(panic_message(panic)),
                    };
                    if result_tx.send(JobResult { tick: job.tick, failure }).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| SimError::config(format!("failed to spawn controller worker: {}", e)))?;

        Ok(Self {
            jobs: job_tx,
            results: result_rx,
            in_flight: None,
            thread: Some(thread),
        })
    }

    fn run(&mut self, tick: u64, snapshot: Arc<WorldSnapshot>, handles: Vec<ShipHandle>, deadline: Instant) -> Outcome {
        // A job abandoned on an earlier tick still owns the controller
        while let Some(stale) = self.in_flight {
            match self.results.recv_deadline(deadline) {
                Ok(result) if result.tick == stale => self.in_flight = None,
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => return Outcome::TimedOut,
                Err(RecvTimeoutError::Disconnected) => return Outcome::Faulted("controller worker exited".into()),
            }
        }

        if self.jobs.send(Job { tick, snapshot, handles }).is_err() {
            return Outcome::Faulted("controller worker exited".into());
        }
        self.in_flight = Some(tick);

        loop {
            match self.results.recv_deadline(deadline) {
                Ok(result) if result.tick == tick => {
                    self.in_flight = None;
                    return match result.failure {
                        None => Outcome::Completed,
                        Some(message) => Outcome::Faulted(message),
                    };
                }
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => return Outcome::TimedOut,
                Err(RecvTimeoutError::Disconnected) => return Outcome::Faulted("controller worker exited".into()),
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop; a busy worker is detached
        if let Some(thread) = self.thread.take() {
            if self.in_flight.is_none() {
                let (tx, _) = unbounded();
                drop(std::mem::replace(&mut self.jobs, tx));
                if thread.join().is_err() {
                    warn!("Controller worker panicked during shutdown");
                }
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}
