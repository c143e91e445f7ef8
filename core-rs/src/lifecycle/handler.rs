//! Lifecycle state machine around a bundle driver
//!
//! Sequences the four driver primitives behind a per-instance lock with
//! failure capture and elapsed-time accounting:
//!
//! ```text
//! UNPREPARED --prepare(ok)--> PREPARED --start(ok)--> RUNNING --stop(ok)--> STOPPED
//!      ^                          |
//!      +-------- cleanup ---------+
//! ```
//!
//! A failed transition leaves the observable phase unchanged; the failure
//! marker distinguishes "tried and failed" from "never attempted".

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::errors::Result;
use crate::lifecycle::driver::BundleDriver;

/// Observable lifecycle phase, advanced only by successful primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Unprepared,
    Prepared,
    Running,
    Stopped,
}

impl LifecyclePhase {
    /// Get the phase name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Unprepared => "unprepared",
            LifecyclePhase::Prepared => "prepared",
            LifecyclePhase::Running => "running",
            LifecyclePhase::Stopped => "stopped",
        }
    }
}

/// Wall-clock time spent in the most recent transition of each kind
///
/// Recording one primitive's elapsed time zeroes the other three fields,
/// so stale readings from earlier, unrelated transitions never linger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    pub preparation: Duration,
    pub cleanup: Duration,
    pub startup: Duration,
    pub stopping: Duration,
}

impl Timings {
    fn record(&mut self, primitive: Primitive, elapsed: Duration) {
        *self = Timings::default();
        match primitive {
            Primitive::Prepare => self.preparation = elapsed,
            Primitive::Clean => self.cleanup = elapsed,
            Primitive::Start => self.startup = elapsed,
            Primitive::Stop => self.stopping = elapsed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Primitive {
    Prepare,
    Clean,
    Start,
    Stop,
}

impl Primitive {
    fn name(&self) -> &'static str {
        match self {
            Primitive::Prepare => "prepare",
            Primitive::Clean => "clean",
            Primitive::Start => "start",
            Primitive::Stop => "stop",
        }
    }
}

struct HandlerState {
    driver: Box<dyn BundleDriver>,
    phase: LifecyclePhase,
    timings: Timings,
    last_failure: Option<String>,
}

/// Per-instance lifecycle coordinator
///
/// One handler per bundle instance. The four public operations acquire
/// the instance lock for their full duration, so concurrent callers on
/// one instance serialize strictly while different instances run their
/// lifecycles fully concurrently.
///
/// # Example
///
/// ```rust,ignore
/// let handler = LifecycleHandler::new(Box::new(JettyBundle::new(config)));
/// handler.start()?;   // cleanup, prepare, then launch
/// handler.stop()?;
/// ```
pub struct LifecycleHandler {
    state: Mutex<HandlerState>,
}

impl LifecycleHandler {
    /// Wrap a bundle driver in a fresh, unprepared handler
    pub fn new(driver: Box<dyn BundleDriver>) -> Self {
        LifecycleHandler {
            state: Mutex::new(HandlerState {
                driver,
                phase: LifecyclePhase::Unprepared,
                timings: Timings::default(),
                last_failure: None,
            }),
        }
    }

    /// Clean, then prepare the bundle
    ///
    /// Cleanup runs first to guarantee a pristine target state. A cleanup
    /// failure propagates without attempting `do_prepare`. A failed
    /// prepare is not terminal: the next `prepare()` call cleans and
    /// retries.
    pub fn prepare(&self) -> Result<()> {
        let mut state = self.lock();
        Self::run_primitive(&mut state, Primitive::Clean)?;
        Self::run_primitive(&mut state, Primitive::Prepare)
    }

    /// Restore the pristine target state
    pub fn cleanup(&self) -> Result<()> {
        let mut state = self.lock();
        Self::run_primitive(&mut state, Primitive::Clean)
    }

    /// Prepare, then start the bundle
    ///
    /// Safe to call on an unprepared instance; the full prepare sequence
    /// (cleanup, prepare) runs before `do_start`, all under one lock
    /// acquisition.
    pub fn start(&self) -> Result<()> {
        let mut state = self.lock();
        Self::run_primitive(&mut state, Primitive::Clean)?;
        Self::run_primitive(&mut state, Primitive::Prepare)?;
        Self::run_primitive(&mut state, Primitive::Start)
    }

    /// Stop the bundle
    ///
    /// Calls `do_stop` directly, with no implicit prepare or cleanup.
    pub fn stop(&self) -> Result<()> {
        let mut state = self.lock();
        Self::run_primitive(&mut state, Primitive::Stop)
    }

    /// Current observable phase
    pub fn phase(&self) -> LifecyclePhase {
        self.lock().phase
    }

    /// Timing snapshot for the most recent transition of each kind
    pub fn timings(&self) -> Timings {
        self.lock().timings
    }

    /// Description of the most recently failed primitive, if any
    ///
    /// Cleared at the start of every new primitive attempt.
    pub fn last_failure(&self) -> Option<String> {
        self.lock().last_failure.clone()
    }

    /// Whether the underlying process reports itself alive
    pub fn is_running(&self) -> bool {
        self.lock().driver.is_running()
    }

    fn lock(&self) -> MutexGuard<'_, HandlerState> {
        self.state.lock().unwrap()
    }

    /// Run one driver primitive under the already-held instance lock
    ///
    /// Protocol, identical for all four primitives: clear the failure
    /// marker, run the extension point, record elapsed wall-clock time
    /// (zeroing the other three timing fields), store a failure
    /// description on error, then return the primitive's error unchanged.
    /// Timing is recorded even when the primitive fails.
    fn run_primitive(state: &mut HandlerState, primitive: Primitive) -> Result<()> {
        state.last_failure = None;

        let began = Instant::now();
        let outcome = match primitive {
            Primitive::Prepare => state.driver.do_prepare(),
            Primitive::Clean => state.driver.do_clean(),
            Primitive::Start => state.driver.do_start(),
            Primitive::Stop => state.driver.do_stop(),
        };
        let elapsed = began.elapsed();

        state.timings.record(primitive, elapsed);

        match outcome {
            Ok(()) => {
                state.phase = match primitive {
                    Primitive::Prepare => LifecyclePhase::Prepared,
                    Primitive::Clean => LifecyclePhase::Unprepared,
                    Primitive::Start => LifecyclePhase::Running,
                    Primitive::Stop => LifecyclePhase::Stopped,
                };
                debug!(
                    primitive = primitive.name(),
                    phase = state.phase.as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Lifecycle primitive completed"
                );
                Ok(())
            }
            Err(e) => {
                state.last_failure = Some(e.to_string());
                warn!(
                    primitive = primitive.name(),
                    phase = state.phase.as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Lifecycle primitive failed"
                );
                Err(e)
            }
        }
    }
}
