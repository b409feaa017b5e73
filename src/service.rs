// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! The periodic loop driver and the inbound entry points of a control station.
//!
//! A [`ControlService`] owns one controller and, while a simulation is running, one worker
//! thread that closes the loop against a fresh [`ProcessModel`]:
//!
//! ```text
//! loop {
//!     if cancelled { break }
//!     pv     = model.simulate(last_output, disturbance)
//!     output = controller.compute(pv)
//!     publish(output, pv, setpoint)
//!     wait(cycle_time) unless cancelled
//! }
//! ```
//!
//! Cancellation is cooperative. The flag is checked once per iteration and wakes the worker
//! out of its inter-cycle wait, so an iteration that is in flight when
//! [`ControlService::stop_simulation`] returns still completes and publishes, but a stopped
//! worker never sits out the rest of a long cycle.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::{ConfigError, ControlConfig};
use crate::model::ProcessModel;
use crate::pid::PidController;
use crate::publish::{Publisher, Sample};

/// Lower bound on the worker's wait so a zero cycle time does not spin.
const MIN_CYCLE_TIME: Duration = Duration::from_millis(1);

/// Errors raised by [`ControlService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The worker thread could not be spawned
    #[error("failed to spawn control loop worker: {0}")]
    Spawn(#[from] io::Error),
}

struct LoopState {
    controller: PidController<f64>,
    // Output fed back into the plant on the next simulated cycle
    last_output: f64,
}

struct Shared<P> {
    state: Mutex<LoopState>,
    publisher: P,
}

struct Worker {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn is_active(&self) -> bool {
        !self.cancel.load(Ordering::Acquire) && !self.handle.is_finished()
    }

    fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
        self.handle.thread().unpark();
    }
}

/// A single-loop control station: one controller, at most one running simulation.
pub struct ControlService<P> {
    shared: Arc<Shared<P>>,
    worker: Mutex<Option<Worker>>,
}

impl<P> ControlService<P>
where
    P: Publisher<f64> + Send + Sync + 'static,
{
    /// Creates a station with a zeroed controller. No simulation is started.
    pub fn new(config: ControlConfig<f64>, publisher: P) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(LoopState {
                    controller: PidController::new(config),
                    last_output: 0.0,
                }),
                publisher,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Returns the configuration snapshot in use.
    pub fn config(&self) -> ControlConfig<f64> {
        *self.shared.state.lock().controller.config()
    }

    /// Returns the output currently being produced.
    pub fn output(&self) -> f64 {
        self.shared.state.lock().controller.output()
    }

    /// Returns the publisher results are sent to.
    pub fn publisher(&self) -> &P {
        &self.shared.publisher
    }

    /// Returns `true` while a simulation is running and has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.worker.lock().as_ref().is_some_and(Worker::is_active)
    }

    /// Installs a new configuration snapshot. The running loop picks it up on its next
    /// iteration; the filter memory is kept.
    pub fn set_parameters(&self, config: ControlConfig<f64>) {
        self.shared.state.lock().controller.update_parameters(config);
        tracing::info!(
            kp = config.kp(),
            ti = config.ti(),
            td = config.td(),
            setpoint = config.setpoint(),
            auto_mode = config.auto_mode(),
            "control parameters updated"
        );
        self.shared.publisher.parameters_updated(&config);
    }

    /// Switches between automatic and manual mode.
    pub fn change_mode(&self, auto_mode: bool) {
        self.shared.state.lock().controller.change_mode(auto_mode);
        tracing::info!(auto_mode, "mode changed");
    }

    /// Replaces the output used in manual mode.
    pub fn change_manual_output(&self, manual_output: f64) -> Result<(), ConfigError> {
        self.shared
            .state
            .lock()
            .controller
            .change_manual_output(manual_output)
    }

    /// Zeroes the filter memory and the output fed back into the simulated plant.
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        state.controller.reset();
        state.last_output = 0.0;
        tracing::info!("controller reset");
    }

    /// Feeds a real measurement straight into the controller, bypassing the process model.
    /// The result is published and returned.
    pub fn send_process_variable(&self, process_variable: f64) -> Sample<f64> {
        let sample = {
            let mut state = self.shared.state.lock();
            let output = state.controller.compute(process_variable);
            Sample::new(state.controller.config(), output, process_variable)
        };
        self.shared.publisher.publish(&sample);
        sample
    }

    /// Starts the simulated loop on a background thread.
    ///
    /// Does nothing if a simulation is already running. If a previous simulation was asked to
    /// stop but its worker is still finishing an iteration, waits for that worker to exit first
    /// so that at most one loop drives the controller.
    pub fn start_simulation(&self) -> Result<(), ServiceError> {
        let mut slot = self.worker.lock();

        if let Some(worker) = slot.take() {
            if worker.is_active() {
                tracing::debug!("simulation already running, start request ignored");
                *slot = Some(worker);
                return Ok(());
            }
            if worker.handle.join().is_err() {
                tracing::warn!("previous control loop worker panicked");
            }
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new().name("control-loop".into()).spawn({
            let shared = Arc::clone(&self.shared);
            let cancel = Arc::clone(&cancel);
            move || run_simulation(shared, cancel)
        })?;

        tracing::info!(cycle_time_ms = self.config().cycle_time_ms(), "simulation started");
        *slot = Some(Worker { cancel, handle });
        Ok(())
    }

    /// Asks the running simulation to stop and returns without waiting for it.
    pub fn stop_simulation(&self) {
        if let Some(worker) = self.worker.lock().as_ref() {
            worker.cancel();
            tracing::info!("simulation stop requested");
        }
    }
}

impl<P> Drop for ControlService<P> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().as_ref() {
            worker.cancel();
        }
    }
}

fn run_simulation<P: Publisher<f64>>(shared: Arc<Shared<P>>, cancel: Arc<AtomicBool>) {
    let mut model = ProcessModel::new();

    while !cancel.load(Ordering::Acquire) {
        let (sample, cycle_time) = {
            let mut state = shared.state.lock();
            let config = *state.controller.config();

            let simulated = model.simulate(&config, state.last_output, config.disturbance());
            let process_variable = config.unscale(simulated);
            let output = state.controller.compute(process_variable);
            state.last_output = output;

            (
                Sample::new(&config, output, process_variable),
                config.cycle_time(),
            )
        };

        tracing::trace!(
            iteration = model.iteration(),
            output = sample.output,
            process_variable = sample.process_variable,
            "control cycle"
        );
        shared.publisher.publish(&sample);

        wait_cycle(&cancel, cycle_time.max(MIN_CYCLE_TIME));
    }

    tracing::debug!(iterations = model.iteration(), "control loop worker exiting");
}

/// Parks until `period` has elapsed or the loop is cancelled. Spurious wakeups park again for
/// the remainder of the period.
fn wait_cycle(cancel: &AtomicBool, period: Duration) {
    let deadline = Instant::now() + period;
    while !cancel.load(Ordering::Acquire) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::park_timeout(remaining);
    }
}
