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

#![warn(missing_docs)]

//! # Bumpless PID
//!
//! This library provides a digital single-loop PID controller with auto/manual switching and
//! bumpless transfer, together with a first-order-lag-plus-dead-time plant to close the loop
//! against when no real sensor is attached.
//!
//! ## Features
//!
//! - Velocity-form control law: every cycle adds an increment to the previous output.
//!   - Output bounded to at most 100 % of the span.
//!   - NaN, infinite or negative results are never propagated; the last good output is held.
//!
//! - Automatic/manual modes with **bumpless transfer**: switching back to automatic continues
//!   from the output already being produced.
//!
//! - Immutable configuration snapshots that are replaced as a whole, never edited in place.
//!
//! - A discrete plant simulator with a dead-time replay buffer.
//!
//! - With the `std` feature (default), a [`service::ControlService`] that drives
//!   simulate → compute → publish on a background thread at the configured cycle time.
//!
//! ## Usage
//!
//! ### Functional PID Controller
//!
//! The functional controller holds only its configuration; the filter memory is passed in
//! and returned explicitly, so `compute` is pure.
//!
//! ```rust
//! use bumpless_pid::config::ControlConfig;
//! use bumpless_pid::pid::{FuncPidController, PidContext};
//!
//! let config = ControlConfig::builder()
//!     .kp(1.0)
//!     .output_limits(0.0, 100.0)
//!     .setpoint(50.0)
//!     .build()
//!     .expect("Invalid control config");
//! let pid = FuncPidController::new(config);
//! let ctx = PidContext::<f64>::new(config.auto_mode());
//!
//! let (output, ctx) = pid.compute(ctx, 0.0);
//! assert_eq!(output, 0.5);
//! assert_eq!(ctx.error(), 0.5);
//! ```
//!
//! ### Stateful PID Controller
//!
//! The stateful controller keeps the filter memory inline and must be `mut`.
//!
//! ```rust
//! use bumpless_pid::config::ControlConfig;
//! use bumpless_pid::pid::PidController;
//!
//! let config = ControlConfig::<f64>::builder()
//!     .kp(2.0)
//!     .ti(10.0)
//!     .setpoint(40.0)
//!     .auto_mode(false)
//!     .manual_output(0.3)
//!     .build()
//!     .expect("Invalid control config");
//! let mut pid = PidController::new(config);
//!
//! // Manual mode outputs the operator's value
//! assert_eq!(pid.compute(35.0), 0.3);
//!
//! // Back to automatic: the controller starts from 0.3 rather than jumping
//! pid.change_mode(true);
//! let output = pid.compute(40.0);
//! assert!((output - 0.3).abs() < 1e-12);
//! ```
//!
//! ### Closing the loop against the process model
//!
//! ```rust
//! use bumpless_pid::config::ControlConfig;
//! use bumpless_pid::model::ProcessModel;
//! use bumpless_pid::pid::PidController;
//!
//! let config = ControlConfig::<f64>::builder()
//!     .kp(1.0)
//!     .ti(5.0)
//!     .setpoint(50.0)
//!     .cycle_time_ms(100)
//!     .tau(500.0)
//!     .dead_time_ms(200)
//!     .build()
//!     .expect("Invalid control config");
//!
//! let mut pid = PidController::new(config);
//! let mut plant = ProcessModel::new();
//! let mut output = 0.0;
//!
//! for _ in 0..500 {
//!     let pv = config.unscale(plant.simulate(&config, output, config.disturbance()));
//!     output = pid.compute(pv);
//! }
//! assert!((config.unscale(plant.last_value()) - 50.0).abs() < 1.0);
//! ```
//!
//! ## Configuration conventions
//!
//! `ti` and `td` are per-cycle constants counted in controller cycles; they are used in the
//! control law as written and are not rescaled by the cycle time. `cycle_time_ms`, `tau` and
//! `dead_time_ms` share the millisecond unit.
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

/// Configuration snapshots and their builder.
pub mod config;

/// The velocity-form PID controller with bumpless transfer.
pub mod pid;

/// The first-order-lag-plus-dead-time process model.
pub mod model;

/// Published results and the outbound publisher seam.
pub mod publish;

/// Conversions between engineering units and fractions of the span.
pub mod scale;

#[cfg(feature = "std")]
pub mod service;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
