// Velocity-form PID controller with auto/manual bumpless transfer
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

use core::fmt::Debug;

use num_traits::Float;

use crate::config::{Action, ConfigError, ControlConfig};
use crate::scale::clamp_unit;

/// Second differences of the control output below this magnitude are treated as noise and
/// contribute no derivative action.
const DERIVATIVE_DEADBAND: f64 = 1e-10;

/// The memory of a velocity-form PID filter.
///
/// The context holds everything the control law needs from previous cycles:
/// - the previous error e(k-1)
/// - the two previous control samples c(k-1) and c(k-2) for the derivative term
/// - the last accepted output m(k-1)
/// - the output currently being produced, which in manual mode is the operator's value
/// - the mode observed on the previous call, used only to detect a manual→auto edge
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PidContext<F> {
    last_error: F,
    control_1: F,
    control_2: F,
    last_output: F,
    current_output: F,
    auto_mode_seen: bool,
}

impl<F: Float> PidContext<F> {
    /// Creates a zeroed context that treats `auto_mode` as the mode already in effect, so the
    /// first computation does not count as a mode change.
    pub fn new(auto_mode: bool) -> Self {
        Self {
            last_error: F::zero(),
            control_1: F::zero(),
            control_2: F::zero(),
            last_output: F::zero(),
            current_output: F::zero(),
            auto_mode_seen: auto_mode,
        }
    }

    /// Returns the output currently being produced.
    pub fn output(&self) -> F {
        self.current_output
    }

    /// Returns the last output accepted from the control law.
    pub fn last_output(&self) -> F {
        self.last_output
    }

    /// Returns the error recorded on the last automatic computation.
    pub fn error(&self) -> F {
        self.last_error
    }

    /// Returns the two previous control samples, newest first.
    pub fn control_history(&self) -> (F, F) {
        (self.control_1, self.control_2)
    }

    /// Returns the mode observed by the last computation.
    pub fn auto_mode_seen(&self) -> bool {
        self.auto_mode_seen
    }

    /// Zeroes the filter memory. The mode cache is kept so that a reset does not masquerade as
    /// a mode change.
    #[must_use]
    pub fn cleared(self) -> Self {
        Self::new(self.auto_mode_seen)
    }

    /// Prepares the context for a switch into automatic mode: forget the error and control
    /// history and continue from the output already being produced.
    fn bumpless(mut self) -> Self {
        self.last_error = F::zero();
        self.control_1 = F::zero();
        self.control_2 = F::zero();
        self.last_output = self.current_output;
        self
    }
}

/// A functional implementation of a velocity-form PID controller.
///
/// The controller owns an immutable configuration snapshot and nothing else. Its `compute`
/// method is pure: the filter memory is passed in and returned with each call.
#[derive(Copy, Clone, Debug)]
pub struct FuncPidController<F> {
    config: ControlConfig<F>,
}

/// A stateful implementation of a velocity-form PID controller.
///
/// Wraps a [`FuncPidController`] and keeps the [`PidContext`] inline, so callers only pass the
/// process variable.
#[derive(Copy, Clone, Debug)]
pub struct PidController<F> {
    ctx: PidContext<F>,
    controller: FuncPidController<F>,
}

impl<F: Float + Debug> FuncPidController<F> {
    /// Creates a controller around a configuration snapshot.
    pub fn new(config: ControlConfig<F>) -> Self {
        FuncPidController { config }
    }

    /// Returns the configuration snapshot in use.
    pub fn config(&self) -> &ControlConfig<F> {
        &self.config
    }

    /// Replaces the configuration snapshot as a whole.
    pub fn set_config(&mut self, config: ControlConfig<F>) {
        self.config = config;
    }

    /// Computes the controller output for one cycle.
    ///
    /// In automatic mode the output comes from the velocity-form law
    ///
    /// ```text
    /// m(k) = Kp·(e(k) − e(k-1)) + e(k)/Ti + Td·(c(k) − 2·c(k-1) + c(k-2)) + m(k-1)
    /// ```
    ///
    /// limited to at most 1. A NaN, infinite or negative result is dropped in favor of m(k-1).
    /// In manual mode the output is the configured manual output clamped to `[0, 1]`.
    ///
    /// # Arguments
    /// - `ctx`: The filter memory from the previous cycle.
    /// - `process_variable`: The measurement, in engineering units.
    ///
    /// # Returns
    /// The output as a fraction of the span, and the updated filter memory.
    pub fn compute(&self, mut ctx: PidContext<F>, process_variable: F) -> (F, PidContext<F>) {
        let config = &self.config;

        if !config.auto_mode() {
            ctx.auto_mode_seen = false;
            ctx.current_output = clamp_unit(config.manual_output());
            return (ctx.current_output, ctx);
        }

        if !ctx.auto_mode_seen {
            tracing::debug!(output = ?ctx.current_output, "bumpless transfer to automatic mode");
            ctx.auto_mode_seen = true;
            ctx = ctx.bumpless();
        }

        let error = self.error(process_variable);
        if !error.is_finite() {
            tracing::warn!(?process_variable, "non-finite measurement, holding output");
            return (ctx.current_output, ctx);
        }

        let raw = self.velocity_law(&ctx, error);
        let output = if raw.is_finite() && raw >= F::zero() {
            raw.min(F::one())
        } else {
            tracing::trace!(?raw, "discarding control law result");
            ctx.last_output
        };

        ctx.last_error = error;
        ctx.control_2 = ctx.control_1;
        ctx.control_1 = ctx.current_output;
        ctx.last_output = output;
        ctx.current_output = output;
        (output, ctx)
    }

    fn error(&self, process_variable: F) -> F {
        let config = &self.config;
        let error = config.scale(config.setpoint()) - config.scale(process_variable);
        match config.action() {
            Action::Direct => error,
            Action::Reverse => -error,
        }
    }

    fn velocity_law(&self, ctx: &PidContext<F>, error: F) -> F {
        let config = &self.config;

        let proportional = config.kp() * (error - ctx.last_error);

        let integral = if config.ti() > F::zero() {
            error / config.ti()
        } else {
            F::zero()
        };

        let deadband = F::from(DERIVATIVE_DEADBAND).unwrap_or_else(F::epsilon);
        let two = F::one() + F::one();
        let second_difference = ctx.current_output - two * ctx.control_1 + ctx.control_2;
        let derivative = if second_difference.abs() > deadband {
            config.td() * second_difference
        } else {
            F::zero()
        };

        proportional + integral + derivative + ctx.last_output
    }
}

impl<F: Float + Debug> PidController<F> {
    /// Creates a controller with zeroed memory. The configured mode counts as already in
    /// effect.
    pub fn new(config: ControlConfig<F>) -> Self {
        Self {
            ctx: PidContext::new(config.auto_mode()),
            controller: FuncPidController::new(config),
        }
    }

    /// Returns the configuration snapshot in use.
    pub fn config(&self) -> &ControlConfig<F> {
        self.controller.config()
    }

    /// Returns the filter memory.
    pub fn context(&self) -> &PidContext<F> {
        &self.ctx
    }

    /// Returns the output currently being produced.
    pub fn output(&self) -> F {
        self.ctx.output()
    }

    /// Computes the controller output for one cycle. See [`FuncPidController::compute`].
    pub fn compute(&mut self, process_variable: F) -> F {
        let (output, ctx) = self.controller.compute(self.ctx, process_variable);
        self.ctx = ctx;
        output
    }

    /// Replaces the configuration snapshot. The filter memory is untouched; a mode change
    /// carried by the new snapshot is picked up by the next [`Self::compute`].
    pub fn update_parameters(&mut self, config: ControlConfig<F>) {
        self.controller.set_config(config);
    }

    /// Switches between automatic and manual mode.
    pub fn change_mode(&mut self, auto_mode: bool) {
        let config = self.config().with_auto_mode(auto_mode);
        self.controller.set_config(config);
    }

    /// Replaces the output used in manual mode.
    ///
    /// # Returns
    /// - `Ok(())` if the output was set.
    /// - `Err(ConfigError::NonFinite)` if `manual_output` is NaN or infinite.
    pub fn change_manual_output(&mut self, manual_output: F) -> Result<(), ConfigError> {
        let config = self.config().with_manual_output(manual_output)?;
        self.controller.set_config(config);
        Ok(())
    }

    /// Zeroes the filter memory.
    pub fn reset(&mut self) {
        self.ctx = self.ctx.cleared();
    }
}
