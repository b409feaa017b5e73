// First-order lag plus dead time process model
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

use alloc::collections::VecDeque;

use num_traits::Float;

use crate::config::ControlConfig;

/// A first-order-lag-plus-dead-time plant, discretized at the loop's cycle time.
///
/// Each call to [`ProcessModel::simulate`] advances the plant by one cycle:
///
/// ```text
/// b = exp(−T/τ),  a = 1 − b
/// y(k) = Kp·a·(u(k − d) + w) + b·y(k−1)
/// ```
///
/// where `T` is the cycle time, `τ` the plant time constant, `d` the dead time in whole cycles
/// and `w` the disturbance. Until `d` cycles have elapsed only the disturbance reaches the
/// sensor.
///
/// The model keeps only as much input history as the current dead time needs. If the dead time
/// is raised mid-run, inputs that were already discarded count as not having arrived yet.
#[derive(Clone, Debug)]
pub struct ProcessModel<F> {
    iteration: usize,
    history: VecDeque<F>,
    // Iteration index of `history[0]`
    history_start: usize,
    last_value: F,
}

impl<F: Float> Default for ProcessModel<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> ProcessModel<F> {
    /// Creates a plant at rest.
    pub fn new() -> Self {
        Self {
            iteration: 0,
            history: VecDeque::new(),
            history_start: 0,
            last_value: F::zero(),
        }
    }

    /// Returns the number of cycles simulated so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Returns the most recent simulated value.
    pub fn last_value(&self) -> F {
        self.last_value
    }

    /// Advances the plant by one cycle.
    ///
    /// # Arguments
    /// - `config`: The configuration snapshot for this cycle.
    /// - `controller_output`: The controller output produced on the previous cycle.
    /// - `disturbance`: The disturbance added to the plant input.
    ///
    /// # Returns
    /// The new process value, as a fraction of the span.
    pub fn simulate(&mut self, config: &ControlConfig<F>, controller_output: F, disturbance: F) -> F {
        let pole = lag_pole(config);
        let gain = F::one() - pole;

        self.history.push_back(controller_output);

        let delay = config.dead_time_cycles();
        let considered_input = match self
            .iteration
            .checked_sub(delay)
            .and_then(|index| self.delayed_input(index))
        {
            Some(input) => input + disturbance,
            None => disturbance,
        };

        self.last_value = config.kp() * gain * considered_input + pole * self.last_value;

        self.iteration += 1;
        self.discard_before(self.iteration.saturating_sub(delay));
        self.last_value
    }

    fn delayed_input(&self, index: usize) -> Option<F> {
        let offset = index.checked_sub(self.history_start)?;
        self.history.get(offset).copied()
    }

    fn discard_before(&mut self, index: usize) {
        while self.history_start < index && self.history.pop_front().is_some() {
            self.history_start += 1;
        }
    }
}

/// Returns the discrete pole `exp(−T/τ)` of the lag.
///
/// A zero cycle time freezes the plant (pole 1) and a zero time constant removes the lag
/// (pole 0).
pub fn lag_pole<F: Float>(config: &ControlConfig<F>) -> F {
    if config.cycle_time_ms() == 0 {
        return F::one();
    }
    if config.tau() <= F::zero() {
        return F::zero();
    }
    let cycle_time = F::from(config.cycle_time_ms()).unwrap_or_else(F::one);
    (-cycle_time / config.tau()).exp()
}
