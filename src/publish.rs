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

use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ControlConfig;

/// One published controller result.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Sample<F> {
    /// Controller output as a fraction of the span
    pub output: F,
    /// Controller output mapped onto `[output_min, output_max]`
    pub scaled_output: F,
    /// Measurement the output was computed from, in engineering units
    pub process_variable: F,
    /// Setpoint in effect, in engineering units
    pub setpoint: F,
}

impl<F: Float> Sample<F> {
    /// Assembles a sample from the snapshot that produced `output`.
    pub fn new(config: &ControlConfig<F>, output: F, process_variable: F) -> Self {
        Self {
            output,
            scaled_output: config.output_in_span(output),
            process_variable,
            setpoint: config.setpoint(),
        }
    }
}

/// Outbound seam towards whatever transport streams results to clients.
///
/// Any `Fn(&Sample<F>)` closure is a publisher that ignores parameter updates.
pub trait Publisher<F> {
    /// Called after every computation.
    fn publish(&self, sample: &Sample<F>);

    /// Called after a new configuration snapshot has been installed.
    fn parameters_updated(&self, _config: &ControlConfig<F>) {}
}

impl<F, T> Publisher<F> for T
where
    T: Fn(&Sample<F>),
{
    fn publish(&self, sample: &Sample<F>) {
        self(sample)
    }
}
