// Immutable configuration snapshots and their validating builder
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

use core::time::Duration;

use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::scale;

/// Errors raised while building or deriving a [`ControlConfig`].
///
/// Only values that can never produce a meaningful output are rejected. Degenerate but finite
/// settings such as a zero span, a zero integral time or a zero cycle time are accepted; the
/// controller and the process model fall back to safe behavior for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum ConfigError {
    /// A floating point field is NaN or infinite
    #[cfg_attr(feature = "std", error("`{field}` must be finite"))]
    NonFinite {
        /// Name of the offending field
        field: &'static str,
    },

    /// A time constant is negative
    #[cfg_attr(feature = "std", error("`{field}` must not be negative"))]
    Negative {
        /// Name of the offending field
        field: &'static str,
    },

    /// The output span is inverted
    #[cfg_attr(feature = "std", error("output_min must not exceed output_max"))]
    InvalidOutputLimits,
}

/// Direction of the control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Action {
    /// Output rises when the measurement falls below the setpoint
    #[default]
    Direct,
    /// Output rises when the measurement climbs above the setpoint
    Reverse,
}

/// An immutable snapshot of tuning, mode, scaling and plant parameters.
///
/// A snapshot is never edited in place. To change anything, derive a new one with
/// [`ControlConfig::to_builder`] (or one of the `with_*` helpers) and hand the whole value to
/// the controller.
///
/// Units:
/// - `ti` and `td` are per-cycle constants, expressed in controller cycles. They enter the
///   control law as written and are not rescaled when `cycle_time_ms` changes.
/// - `cycle_time_ms`, `tau` and `dead_time_ms` are milliseconds.
/// - `setpoint` is in engineering units; `manual_output` is a fraction of the output span.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        rename_all = "camelCase",
        try_from = "ControlConfigBuilder<F>",
        bound(deserialize = "F: Float + Deserialize<'de>")
    )
)]
pub struct ControlConfig<F> {
    kp: F,
    ti: F,
    td: F,
    output_min: F,
    output_max: F,
    auto_mode: bool,
    action: Action,
    setpoint: F,
    manual_output: F,
    cycle_time_ms: u32,
    tau: F,
    disturbance: F,
    dead_time_ms: u32,
}

impl<F: Float> Default for ControlConfig<F> {
    fn default() -> Self {
        ControlConfigBuilder::default().unchecked()
    }
}

impl<F: Float> ControlConfig<F> {
    /// Returns a builder pre-populated with the default configuration.
    pub fn builder() -> ControlConfigBuilder<F> {
        ControlConfigBuilder::default()
    }

    /// Returns a builder pre-populated with this snapshot's values.
    pub fn to_builder(&self) -> ControlConfigBuilder<F> {
        ControlConfigBuilder {
            kp: self.kp,
            ti: self.ti,
            td: self.td,
            output_min: self.output_min,
            output_max: self.output_max,
            auto_mode: self.auto_mode,
            action: self.action,
            setpoint: self.setpoint,
            manual_output: self.manual_output,
            cycle_time_ms: self.cycle_time_ms,
            tau: self.tau,
            disturbance: self.disturbance,
            dead_time_ms: self.dead_time_ms,
        }
    }

    /// Returns a copy of this snapshot with the mode flag replaced.
    #[must_use]
    pub fn with_auto_mode(mut self, auto_mode: bool) -> Self {
        self.auto_mode = auto_mode;
        self
    }

    /// Returns a copy of this snapshot with the manual output replaced.
    pub fn with_manual_output(self, manual_output: F) -> Result<Self, ConfigError> {
        if !manual_output.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "manual_output",
            });
        }
        Ok(Self {
            manual_output,
            ..self
        })
    }

    /// Returns the proportional gain. The simulated plant uses the same value as its gain.
    pub fn kp(&self) -> F {
        self.kp
    }

    /// Returns the integral time in cycles. Non-positive values disable integral action.
    pub fn ti(&self) -> F {
        self.ti
    }

    /// Returns the derivative time in cycles.
    pub fn td(&self) -> F {
        self.td
    }

    /// Returns the engineering value that represents 0 % output.
    pub fn output_min(&self) -> F {
        self.output_min
    }

    /// Returns the engineering value that represents 100 % output.
    pub fn output_max(&self) -> F {
        self.output_max
    }

    /// Returns `true` in automatic mode, `false` in manual mode.
    pub fn auto_mode(&self) -> bool {
        self.auto_mode
    }

    /// Returns the direction of the control action.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Returns the setpoint, in engineering units.
    pub fn setpoint(&self) -> F {
        self.setpoint
    }

    /// Returns the output used in manual mode, as a fraction of the span.
    pub fn manual_output(&self) -> F {
        self.manual_output
    }

    /// Returns the loop cadence in milliseconds.
    pub fn cycle_time_ms(&self) -> u32 {
        self.cycle_time_ms
    }

    /// Returns the loop cadence.
    pub fn cycle_time(&self) -> Duration {
        Duration::from_millis(u64::from(self.cycle_time_ms))
    }

    /// Returns the plant time constant in milliseconds.
    pub fn tau(&self) -> F {
        self.tau
    }

    /// Returns the disturbance added to the plant input.
    pub fn disturbance(&self) -> F {
        self.disturbance
    }

    /// Returns the plant dead time in milliseconds.
    pub fn dead_time_ms(&self) -> u32 {
        self.dead_time_ms
    }

    /// Returns the dead time as a whole number of cycles, or zero when the cycle time is zero.
    pub fn dead_time_cycles(&self) -> usize {
        match self.dead_time_ms.checked_div(self.cycle_time_ms) {
            Some(cycles) => cycles as usize,
            None => 0,
        }
    }

    /// Converts an engineering value into a fraction of the span, clamped to `[0, 1]`.
    pub fn scale(&self, value: F) -> F {
        scale::to_fraction(value, self.output_max)
    }

    /// Converts a fraction back into engineering units, the inverse of [`Self::scale`].
    pub fn unscale(&self, fraction: F) -> F {
        scale::from_fraction(fraction, self.output_max)
    }

    /// Maps a controller output onto `[output_min, output_max]` for display.
    pub fn output_in_span(&self, output: F) -> F {
        scale::into_span(output, self.output_min, self.output_max)
    }
}

/// Builder for [`ControlConfig`]. Every field starts from the default configuration and
/// [`ControlConfigBuilder::build`] validates the result.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        default,
        rename_all = "camelCase",
        bound(deserialize = "F: Float + Deserialize<'de>")
    )
)]
pub struct ControlConfigBuilder<F> {
    kp: F,
    ti: F,
    td: F,
    output_min: F,
    output_max: F,
    auto_mode: bool,
    action: Action,
    setpoint: F,
    manual_output: F,
    cycle_time_ms: u32,
    tau: F,
    disturbance: F,
    dead_time_ms: u32,
}

const DEFAULT_OUTPUT_MAX: f64 = 100.0;
const DEFAULT_CYCLE_TIME_MS: u32 = 100;
const DEFAULT_TAU_MS: f64 = 1000.0;

impl<F: Float> Default for ControlConfigBuilder<F> {
    fn default() -> Self {
        Self {
            kp: F::one(),
            ti: F::zero(),
            td: F::zero(),
            output_min: F::zero(),
            output_max: F::from(DEFAULT_OUTPUT_MAX).unwrap_or_else(F::one),
            auto_mode: true,
            action: Action::Direct,
            setpoint: F::zero(),
            manual_output: F::zero(),
            cycle_time_ms: DEFAULT_CYCLE_TIME_MS,
            tau: F::from(DEFAULT_TAU_MS).unwrap_or_else(F::one),
            disturbance: F::zero(),
            dead_time_ms: 0,
        }
    }
}

impl<F: Float> ControlConfigBuilder<F> {
    /// Sets the proportional gain.
    pub fn kp(mut self, kp: F) -> Self {
        self.kp = kp;
        self
    }

    /// Sets the integral time, in cycles.
    pub fn ti(mut self, ti: F) -> Self {
        self.ti = ti;
        self
    }

    /// Sets the derivative time, in cycles.
    pub fn td(mut self, td: F) -> Self {
        self.td = td;
        self
    }

    /// Sets the engineering values representing 0 % and 100 % output.
    pub fn output_limits(mut self, output_min: F, output_max: F) -> Self {
        self.output_min = output_min;
        self.output_max = output_max;
        self
    }

    /// Selects automatic (`true`) or manual (`false`) mode.
    pub fn auto_mode(mut self, auto_mode: bool) -> Self {
        self.auto_mode = auto_mode;
        self
    }

    /// Sets the direction of the control action.
    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    /// Sets the setpoint, in engineering units.
    pub fn setpoint(mut self, setpoint: F) -> Self {
        self.setpoint = setpoint;
        self
    }

    /// Sets the manual-mode output, as a fraction of the span.
    pub fn manual_output(mut self, manual_output: F) -> Self {
        self.manual_output = manual_output;
        self
    }

    /// Sets the loop cadence in milliseconds.
    pub fn cycle_time_ms(mut self, cycle_time_ms: u32) -> Self {
        self.cycle_time_ms = cycle_time_ms;
        self
    }

    /// Sets the plant time constant in milliseconds.
    pub fn tau(mut self, tau: F) -> Self {
        self.tau = tau;
        self
    }

    /// Sets the disturbance added to the plant input.
    pub fn disturbance(mut self, disturbance: F) -> Self {
        self.disturbance = disturbance;
        self
    }

    /// Sets the plant dead time in milliseconds.
    pub fn dead_time_ms(mut self, dead_time_ms: u32) -> Self {
        self.dead_time_ms = dead_time_ms;
        self
    }

    /// Validates the collected values and produces a configuration snapshot.
    pub fn build(self) -> Result<ControlConfig<F>, ConfigError> {
        let finite = [
            ("kp", self.kp),
            ("ti", self.ti),
            ("td", self.td),
            ("output_min", self.output_min),
            ("output_max", self.output_max),
            ("setpoint", self.setpoint),
            ("manual_output", self.manual_output),
            ("tau", self.tau),
            ("disturbance", self.disturbance),
        ];
        if let Some(&(field, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite { field });
        }

        let time_constants = [("ti", self.ti), ("td", self.td), ("tau", self.tau)];
        if let Some(&(field, _)) = time_constants.iter().find(|(_, v)| *v < F::zero()) {
            return Err(ConfigError::Negative { field });
        }

        if self.output_min > self.output_max {
            return Err(ConfigError::InvalidOutputLimits);
        }

        Ok(self.unchecked())
    }

    fn unchecked(self) -> ControlConfig<F> {
        ControlConfig {
            kp: self.kp,
            ti: self.ti,
            td: self.td,
            output_min: self.output_min,
            output_max: self.output_max,
            auto_mode: self.auto_mode,
            action: self.action,
            setpoint: self.setpoint,
            manual_output: self.manual_output,
            cycle_time_ms: self.cycle_time_ms,
            tau: self.tau,
            disturbance: self.disturbance,
            dead_time_ms: self.dead_time_ms,
        }
    }
}

impl<F: Float> TryFrom<ControlConfigBuilder<F>> for ControlConfig<F> {
    type Error = ConfigError;

    fn try_from(builder: ControlConfigBuilder<F>) -> Result<Self, Self::Error> {
        builder.build()
    }
}
