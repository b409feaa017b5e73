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

//! Conversions between engineering units and fractions of the output span.
//!
//! The controller works on fractions in `[0, 1]`. Setpoints and measurements arrive in
//! engineering units and are divided by the span maximum; a zero maximum collapses every
//! value to zero instead of dividing by it.

use num_traits::Float;

/// Clamps `value` into `[0, 1]`.
///
/// NaN is passed through unchanged so callers can detect it.
#[inline]
pub fn clamp_unit<F: Float>(value: F) -> F {
    if value.is_nan() {
        return value;
    }
    value.max(F::zero()).min(F::one())
}

/// Converts an engineering value into a fraction of `span_max`, clamped to `[0, 1]`.
///
/// Returns zero whenever `span_max` is zero.
#[inline]
pub fn to_fraction<F: Float>(value: F, span_max: F) -> F {
    if span_max == F::zero() {
        return F::zero();
    }
    clamp_unit(value / span_max)
}

/// Inverse of [`to_fraction`] for values inside the span: `fraction * span_max`.
#[inline]
pub fn from_fraction<F: Float>(fraction: F, span_max: F) -> F {
    fraction * span_max
}

/// Maps a fraction onto `[span_min, span_max]` for display.
#[inline]
pub fn into_span<F: Float>(fraction: F, span_min: F, span_max: F) -> F {
    span_min + fraction * (span_max - span_min)
}
